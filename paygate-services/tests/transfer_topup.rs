use chrono::Utc;

use paygate_cache::Cache;
use paygate_common::model::LedgerStatus;
use paygate_common::requests::{
    CreateTopupRequest, CreateTransactionRequest, CreateTransferRequest, UpdateTransferRequest,
};
use paygate_events::EventBus;
use paygate_ledger::{NewCard, NewSaldo, NewUser, Repositories};
use paygate_services::{Services, TokenSigner};

const SENDER: &str = "4000000000000031";
const RECEIVER: &str = "4000000000000032";

async fn setup(sender_balance: i64, receiver_balance: i64) -> (tempfile::TempDir, Services, Repositories) {
    let dir = tempfile::tempdir().expect("tempdir");
    let repos = Repositories::open(dir.path()).expect("repositories");

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
    for card in [SENDER, RECEIVER] {
        repos
            .cards
            .create(NewCard {
                user_id: user.id,
                card_number: card.to_string(),
                card_type: "debit".into(),
                card_provider: "visa".into(),
                expire_date: chrono::NaiveDate::from_ymd_opt(2031, 1, 1).unwrap(),
                cvv: "123".into(),
            })
            .await
            .unwrap();
    }
    repos
        .saldos
        .create(NewSaldo {
            card_number: SENDER.to_string(),
            total_balance: sender_balance,
        })
        .await
        .unwrap();
    repos
        .saldos
        .create(NewSaldo {
            card_number: RECEIVER.to_string(),
            total_balance: receiver_balance,
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
    let (bus, mut rx) = EventBus::new(64);
    tokio::spawn(async move { while rx.recv().await.is_some() {} });
    let services = Services::build(repos, Cache::in_memory(), bus, TokenSigner::generate());
    (dir, services, keep)
}

#[tokio::test]
async fn test_transfer_moves_money_between_saldos() {
    let (_dir, services, repos) = setup(1000, 50).await;

    let row = services
        .transfer_command
        .create(CreateTransferRequest {
            transfer_from: SENDER.to_string(),
            transfer_to: RECEIVER.to_string(),
            transfer_amount: 400,
        })
        .await
        .unwrap();
    assert_eq!(row.status, LedgerStatus::Success);

    let sender = repos.saldos.find_by_card_number(SENDER).await.unwrap();
    let receiver = repos.saldos.find_by_card_number(RECEIVER).await.unwrap();
    assert_eq!(sender.total_balance, 600);
    assert_eq!(receiver.total_balance, 450);
}

#[tokio::test]
async fn test_transfer_insufficient_funds_touches_nothing() {
    let (_dir, services, repos) = setup(100, 50).await;

    let err = services
        .transfer_command
        .create(CreateTransferRequest {
            transfer_from: SENDER.to_string(),
            transfer_to: RECEIVER.to_string(),
            transfer_amount: 400,
        })
        .await
        .unwrap_err();
    assert_eq!(err.reason(), "InsufficientBalance");

    assert_eq!(
        repos.saldos.find_by_card_number(SENDER).await.unwrap().total_balance,
        100
    );
    assert_eq!(
        repos.saldos.find_by_card_number(RECEIVER).await.unwrap().total_balance,
        50
    );
}

#[tokio::test]
async fn test_transfer_to_self_is_rejected() {
    let (_dir, services, _repos) = setup(1000, 0).await;
    let err = services
        .transfer_command
        .create(CreateTransferRequest {
            transfer_from: SENDER.to_string(),
            transfer_to: SENDER.to_string(),
            transfer_amount: 10,
        })
        .await
        .unwrap_err();
    assert_eq!(err.reason(), "ValidationFailed");
}

#[tokio::test]
async fn test_transfer_update_shifts_the_delta() {
    let (_dir, services, repos) = setup(1000, 0).await;
    let row = services
        .transfer_command
        .create(CreateTransferRequest {
            transfer_from: SENDER.to_string(),
            transfer_to: RECEIVER.to_string(),
            transfer_amount: 300,
        })
        .await
        .unwrap();
    // sender 700, receiver 300

    services
        .transfer_command
        .update(UpdateTransferRequest {
            id: row.id,
            transfer_from: SENDER.to_string(),
            transfer_to: RECEIVER.to_string(),
            transfer_amount: 200,
        })
        .await
        .unwrap();

    assert_eq!(
        repos.saldos.find_by_card_number(SENDER).await.unwrap().total_balance,
        800
    );
    assert_eq!(
        repos.saldos.find_by_card_number(RECEIVER).await.unwrap().total_balance,
        200
    );
}

#[tokio::test]
async fn test_topup_credits_the_balance() {
    let (_dir, services, repos) = setup(100, 0).await;

    let row = services
        .topup_command
        .create(CreateTopupRequest {
            card_number: SENDER.to_string(),
            topup_amount: 900,
            topup_method: "bank_transfer".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(row.status, LedgerStatus::Success);
    assert!(!row.topup_no.is_empty());

    assert_eq!(
        repos.saldos.find_by_card_number(SENDER).await.unwrap().total_balance,
        1000
    );
}

#[tokio::test]
async fn test_topup_with_unknown_method_is_rejected() {
    let (_dir, services, _repos) = setup(100, 0).await;
    let err = services
        .topup_command
        .create(CreateTopupRequest {
            card_number: SENDER.to_string(),
            topup_amount: 900,
            topup_method: "carrier_pigeon".to_string(),
        })
        .await
        .unwrap_err();
    assert_eq!(err.reason(), "ValidationFailed");
}

#[tokio::test]
async fn test_transaction_debits_toward_merchant() {
    let (_dir, services, repos) = setup(500, 0).await;

    let row = services
        .transaction_command
        .create(CreateTransactionRequest {
            card_number: SENDER.to_string(),
            amount: 200,
            payment_method: "credit_card".to_string(),
            merchant_id: 11,
            transaction_time: Utc::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        })
        .await
        .unwrap();
    assert_eq!(row.status, LedgerStatus::Success);
    assert_eq!(row.merchant_id, 11);

    assert_eq!(
        repos.saldos.find_by_card_number(SENDER).await.unwrap().total_balance,
        300
    );
}
