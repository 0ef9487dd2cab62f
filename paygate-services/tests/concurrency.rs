use std::sync::Arc;

use chrono::Utc;

use paygate_cache::Cache;
use paygate_common::model::LedgerStatus;
use paygate_common::pagination::Pagination;
use paygate_common::requests::CreateWithdrawRequest;
use paygate_events::EventBus;
use paygate_ledger::{NewCard, NewSaldo, NewUser, Repositories};
use paygate_services::{Services, TokenSigner};

const CARD: &str = "4000000000000021";

async fn setup(initial_balance: i64) -> (tempfile::TempDir, Arc<Services>, Repositories) {
    let dir = tempfile::tempdir().expect("tempdir");
    let repos = Repositories::open(dir.path()).expect("repositories");

    let user = repos
        .users
        .create(NewUser {
            firstname: "Grace".into(),
            lastname: "Hopper".into(),
            email: "grace@example.com".into(),
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

    let keep = Repositories {
        cards: repos.cards.clone(),
        saldos: repos.saldos.clone(),
        users: repos.users.clone(),
        withdraws: repos.withdraws.clone(),
        topups: repos.topups.clone(),
        transactions: repos.transactions.clone(),
        transfers: repos.transfers.clone(),
    };
    let (bus, mut rx) = EventBus::new(1024);
    // Drain notifications so the bounded queue never pushes back.
    tokio::spawn(async move { while rx.recv().await.is_some() {} });
    let services = Arc::new(Services::build(
        repos,
        Cache::in_memory(),
        bus,
        TokenSigner::generate(),
    ));
    (dir, services, keep)
}

fn request(amount: i64) -> CreateWithdrawRequest {
    CreateWithdrawRequest {
        card_number: CARD.to_string(),
        withdraw_amount: amount,
        withdraw_time: Utc::now().format("%Y-%m-%d %H:%M:%S").to_string(),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_concurrent_withdraws_within_balance_all_succeed() {
    let (_dir, services, repos) = setup(1000).await;

    let mut handles = Vec::new();
    for _ in 0..10 {
        let services = services.clone();
        handles.push(tokio::spawn(async move {
            services.withdraw_command.create(request(100)).await
        }));
    }
    for handle in handles {
        handle.await.unwrap().expect("all withdraws fit the balance");
    }

    let saldo = repos.saldos.find_by_card_number(CARD).await.unwrap();
    assert_eq!(saldo.total_balance, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_concurrent_withdraws_never_overdraw() {
    let initial = 500;
    let (_dir, services, repos) = setup(initial).await;

    let mut handles = Vec::new();
    for _ in 0..10 {
        let services = services.clone();
        handles.push(tokio::spawn(async move {
            services.withdraw_command.create(request(100)).await
        }));
    }

    let mut succeeded = 0;
    let mut failed = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => succeeded += 1,
            Err(e) => {
                assert_eq!(e.reason(), "InsufficientBalance");
                failed += 1;
            }
        }
    }
    assert_eq!(succeeded, 5, "exactly the balance worth of withdraws");
    assert_eq!(failed, 5);

    let saldo = repos.saldos.find_by_card_number(CARD).await.unwrap();
    assert_eq!(saldo.total_balance, 0);

    // One success ledger row per successful command.
    let rows = repos
        .withdraws
        .find_all(&Pagination::new(Some(1), Some(100), None))
        .await
        .unwrap();
    let success_rows = rows
        .items
        .iter()
        .filter(|w| w.status == LedgerStatus::Success)
        .count();
    assert_eq!(success_rows, 5);
    let total: i64 = rows
        .items
        .iter()
        .filter(|w| w.status == LedgerStatus::Success)
        .map(|w| w.withdraw_amount)
        .sum();
    assert!(total <= initial);
}
