use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;

use paygate_cache::Cache;
use paygate_common::error::Result;
use paygate_common::model::{LedgerStatus, Withdraw};
use paygate_common::pagination::{Paged, Pagination};
use paygate_common::requests::{CreateWithdrawRequest, StatsBucket, StatsQuery, StatsScope};
use paygate_events::EventBus;
use paygate_ledger::{
    LedgerRepository, NewCard, NewSaldo, NewUser, Repositories, Store,
};
use paygate_services::{Services, TokenSigner};

const CARD: &str = "4000000000000001";

/// Wraps the real withdraw repository with switchable failure points, so the
/// compensation paths can be driven from the outside.
struct FlakyWithdrawRepo {
    inner: Arc<dyn LedgerRepository<Withdraw>>,
    fail_create: AtomicBool,
    fail_finalise: AtomicBool,
}

impl FlakyWithdrawRepo {
    fn new(inner: Arc<dyn LedgerRepository<Withdraw>>) -> Self {
        Self {
            inner,
            fail_create: AtomicBool::new(false),
            fail_finalise: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl LedgerRepository<Withdraw> for FlakyWithdrawRepo {
    async fn create(&self, draft: Withdraw) -> Result<Withdraw> {
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(paygate_common::ServiceError::internal(
                "repository",
                "injected insert failure",
            ));
        }
        self.inner.create(draft).await
    }

    async fn update(&self, row: Withdraw) -> Result<Withdraw> {
        self.inner.update(row).await
    }

    async fn update_status(&self, id: u64, status: LedgerStatus) -> Result<Withdraw> {
        if status == LedgerStatus::Success && self.fail_finalise.load(Ordering::SeqCst) {
            return Err(paygate_common::ServiceError::internal(
                "repository",
                "injected finalise failure",
            ));
        }
        self.inner.update_status(id, status).await
    }

    async fn find_by_id(&self, id: u64) -> Result<Withdraw> {
        self.inner.find_by_id(id).await
    }
    async fn find_all(&self, filter: &Pagination) -> Result<Paged<Withdraw>> {
        self.inner.find_all(filter).await
    }
    async fn find_by_card(&self, card: &str, filter: &Pagination) -> Result<Paged<Withdraw>> {
        self.inner.find_by_card(card, filter).await
    }
    async fn find_active(&self, filter: &Pagination) -> Result<Paged<Withdraw>> {
        self.inner.find_active(filter).await
    }
    async fn find_trashed(&self, filter: &Pagination) -> Result<Paged<Withdraw>> {
        self.inner.find_trashed(filter).await
    }
    async fn trash(&self, id: u64) -> Result<Withdraw> {
        self.inner.trash(id).await
    }
    async fn restore(&self, id: u64) -> Result<Withdraw> {
        self.inner.restore(id).await
    }
    async fn delete_permanent(&self, id: u64) -> Result<()> {
        self.inner.delete_permanent(id).await
    }
    async fn restore_all(&self) -> Result<u64> {
        self.inner.restore_all().await
    }
    async fn delete_all_permanent(&self) -> Result<u64> {
        self.inner.delete_all_permanent().await
    }
    async fn aggregate(&self, query: &StatsQuery) -> Result<Vec<StatsBucket>> {
        self.inner.aggregate(query).await
    }
    async fn total_amount(&self, scope: &StatsScope) -> Result<i64> {
        self.inner.total_amount(scope).await
    }
}

struct Harness {
    _dir: tempfile::TempDir,
    services: Services,
    repos: Repositories,
    flaky: Arc<FlakyWithdrawRepo>,
    events: tokio::sync::mpsc::Receiver<paygate_events::EventEnvelope>,
}

async fn harness(initial_balance: i64) -> Harness {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = Store::open(dir.path()).expect("store");
    let base = Repositories::from_store(store.clone());
    let flaky = Arc::new(FlakyWithdrawRepo::new(base.withdraws.clone()));

    let repos = Repositories {
        cards: base.cards.clone(),
        saldos: base.saldos.clone(),
        users: base.users.clone(),
        withdraws: flaky.clone(),
        topups: base.topups.clone(),
        transactions: base.transactions.clone(),
        transfers: base.transfers.clone(),
    };

    let user = repos
        .users
        .create(NewUser {
            firstname: "Ada".into(),
            lastname: "Lovelace".into(),
            email: "ada@example.com".into(),
            password_hash: "x".into(),
        })
        .await
        .unwrap();
    repos
        .cards
        .create(NewCard {
            user_id: user.id,
            card_number: CARD.to_string(),
            card_type: "debit".into(),
            card_provider: "visa".into(),
            expire_date: chrono::NaiveDate::from_ymd_opt(2031, 1, 1).unwrap(),
            cvv: "123".into(),
        })
        .await
        .unwrap();
    repos
        .saldos
        .create(NewSaldo {
            card_number: CARD.to_string(),
            total_balance: initial_balance,
        })
        .await
        .unwrap();

    let (bus, rx) = EventBus::new(64);
    let keep = Repositories {
        cards: repos.cards.clone(),
        saldos: repos.saldos.clone(),
        users: repos.users.clone(),
        withdraws: repos.withdraws.clone(),
        topups: repos.topups.clone(),
        transactions: repos.transactions.clone(),
        transfers: repos.transfers.clone(),
    };
    let services = Services::build(repos, Cache::in_memory(), bus, TokenSigner::generate());

    Harness {
        _dir: dir,
        services,
        repos: keep,
        flaky,
        events: rx,
    }
}

fn create_request(amount: i64) -> CreateWithdrawRequest {
    CreateWithdrawRequest {
        card_number: CARD.to_string(),
        withdraw_amount: amount,
        withdraw_time: Utc::now().format("%Y-%m-%d %H:%M:%S").to_string(),
    }
}

#[tokio::test]
async fn test_happy_withdraw_debits_and_finalises() {
    let mut h = harness(1000).await;
    let row = h.services.withdraw_command.create(create_request(300)).await.unwrap();

    assert_eq!(row.withdraw_amount, 300);
    assert_eq!(row.status, LedgerStatus::Success);

    let saldo = h.repos.saldos.find_by_card_number(CARD).await.unwrap();
    assert_eq!(saldo.total_balance, 700);
    assert_eq!(saldo.withdraw_amount, Some(300));

    let stored = h.repos.withdraws.find_by_id(row.id).await.unwrap();
    assert_eq!(stored.status, LedgerStatus::Success);

    let envelope = h.events.try_recv().expect("notification enqueued");
    assert_eq!(envelope.topic, "email-service-topic-withdraw-create");
    assert_eq!(envelope.key, row.id.to_string());
    assert_eq!(envelope.email, "ada@example.com");
}

#[tokio::test]
async fn test_insufficient_balance_leaves_no_trace() {
    let mut h = harness(100).await;
    let err = h.services.withdraw_command.create(create_request(300)).await.unwrap_err();
    assert_eq!(err.reason(), "InsufficientBalance");
    assert_eq!(err.code().http_status(), 409);

    let saldo = h.repos.saldos.find_by_card_number(CARD).await.unwrap();
    assert_eq!(saldo.total_balance, 100);
    let rows = h
        .repos
        .withdraws
        .find_all(&Pagination::default())
        .await
        .unwrap();
    assert_eq!(rows.total, 0);
    assert!(h.events.try_recv().is_err());
}

#[tokio::test]
async fn test_exactly_equal_balance_drains_to_zero() {
    let h = harness(300).await;
    h.services.withdraw_command.create(create_request(300)).await.unwrap();
    let saldo = h.repos.saldos.find_by_card_number(CARD).await.unwrap();
    assert_eq!(saldo.total_balance, 0);
}

#[tokio::test]
async fn test_unknown_card_maps_to_card_not_found() {
    let h = harness(1000).await;
    let req = CreateWithdrawRequest {
        card_number: "9999999999999999".to_string(),
        withdraw_amount: 100,
        withdraw_time: Utc::now().format("%Y-%m-%d %H:%M:%S").to_string(),
    };
    let err = h.services.withdraw_command.create(req).await.unwrap_err();
    assert_eq!(err.reason(), "CardNotFound");
    assert_eq!(err.code().http_status(), 404);
}

#[tokio::test]
async fn test_trashed_card_is_treated_as_missing() {
    let h = harness(1000).await;
    let card = h.repos.cards.find_by_card_number(CARD).await.unwrap();
    h.repos.cards.trash(card.id).await.unwrap();

    let err = h.services.withdraw_command.create(create_request(100)).await.unwrap_err();
    assert_eq!(err.reason(), "CardNotFound");
}

#[tokio::test]
async fn test_zero_and_negative_amounts_rejected_in_validation() {
    let h = harness(1000).await;
    for amount in [0, -50] {
        let err = h
            .services
            .withdraw_command
            .create(create_request(amount))
            .await
            .unwrap_err();
        assert_eq!(err.reason(), "ValidationFailed");
    }
}

#[tokio::test]
async fn test_unparseable_time_maps_to_invalid_parse_time() {
    let h = harness(1000).await;
    let req = CreateWithdrawRequest {
        card_number: CARD.to_string(),
        withdraw_amount: 100,
        withdraw_time: "not-a-time".to_string(),
    };
    let err = h.services.withdraw_command.create(req).await.unwrap_err();
    assert_eq!(err.reason(), "InvalidParseTime");
}

#[tokio::test]
async fn test_ledger_insert_failure_rolls_the_debit_back() {
    let mut h = harness(500).await;
    h.flaky.fail_create.store(true, Ordering::SeqCst);

    let err = h.services.withdraw_command.create(create_request(200)).await.unwrap_err();
    assert_eq!(err.reason(), "CreateWithdrawFailed");
    assert_eq!(err.code().http_status(), 500);

    let saldo = h.repos.saldos.find_by_card_number(CARD).await.unwrap();
    assert_eq!(saldo.total_balance, 500, "debit must be compensated");
    assert!(h.events.try_recv().is_err());
}

#[tokio::test]
async fn test_finalise_failure_marks_the_row_failed() {
    let h = harness(500).await;
    h.flaky.fail_finalise.store(true, Ordering::SeqCst);

    let err = h.services.withdraw_command.create(create_request(200)).await.unwrap_err();
    assert_eq!(err.reason(), "UpdateWithdrawStatusFailed");

    let rows = h
        .repos
        .withdraws
        .find_all(&Pagination::default())
        .await
        .unwrap();
    assert_eq!(rows.total, 1);
    assert_eq!(rows.items[0].status, LedgerStatus::Failed);
}

#[tokio::test]
async fn test_update_applies_the_amount_delta() {
    let h = harness(1000).await;
    let row = h.services.withdraw_command.create(create_request(300)).await.unwrap();
    // 1000 - 300 = 700

    let updated = h
        .services
        .withdraw_command
        .update(paygate_common::requests::UpdateWithdrawRequest {
            id: row.id,
            card_number: CARD.to_string(),
            withdraw_amount: 500,
            withdraw_time: Utc::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        })
        .await
        .unwrap();
    assert_eq!(updated.withdraw_amount, 500);

    let saldo = h.repos.saldos.find_by_card_number(CARD).await.unwrap();
    assert_eq!(saldo.total_balance, 500, "delta of 200 debited");
}

#[tokio::test]
async fn test_update_delta_exceeding_balance_is_rejected() {
    let h = harness(400).await;
    let row = h.services.withdraw_command.create(create_request(300)).await.unwrap();
    // balance now 100; raising to 500 needs another 200

    let err = h
        .services
        .withdraw_command
        .update(paygate_common::requests::UpdateWithdrawRequest {
            id: row.id,
            card_number: CARD.to_string(),
            withdraw_amount: 500,
            withdraw_time: Utc::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        })
        .await
        .unwrap_err();
    assert_eq!(err.reason(), "InsufficientBalance");

    let saldo = h.repos.saldos.find_by_card_number(CARD).await.unwrap();
    assert_eq!(saldo.total_balance, 100);
}
