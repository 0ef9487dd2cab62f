use chrono::Utc;

use paygate_cache::Cache;
use paygate_common::pagination::Pagination;
use paygate_common::requests::{
    CardStatsKind, CardStatsQuery, CreateWithdrawRequest, StatsGrain,
};
use paygate_events::EventBus;
use paygate_ledger::{NewCard, NewSaldo, NewUser, Repositories};
use paygate_services::{Services, TokenSigner};

const CARD: &str = "4000000000000041";

async fn setup(balance: i64) -> (tempfile::TempDir, Services) {
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
            total_balance: balance,
        })
        .await
        .unwrap();

    let (bus, mut rx) = EventBus::new(64);
    tokio::spawn(async move { while rx.recv().await.is_some() {} });
    let services = Services::build(repos, Cache::in_memory(), bus, TokenSigner::generate());
    (dir, services)
}

fn withdraw(amount: i64) -> CreateWithdrawRequest {
    CreateWithdrawRequest {
        card_number: CARD.to_string(),
        withdraw_amount: amount,
        withdraw_time: Utc::now().format("%Y-%m-%d %H:%M:%S").to_string(),
    }
}

#[tokio::test]
async fn test_repeated_reads_agree_when_nothing_changed() {
    let (_dir, services) = setup(1000).await;
    services.withdraw_command.create(withdraw(100)).await.unwrap();

    let first = services
        .withdraw_query
        .find_all(Pagination::default())
        .await
        .unwrap();
    let second = services
        .withdraw_query
        .find_all(Pagination::default())
        .await
        .unwrap();
    assert_eq!(first.total, second.total);
    assert_eq!(first.items, second.items);
}

#[tokio::test]
async fn test_commands_invalidate_cached_reads() {
    let (_dir, services) = setup(1000).await;
    services.withdraw_command.create(withdraw(100)).await.unwrap();

    // Prime the caches.
    let list = services
        .withdraw_query
        .find_all(Pagination::default())
        .await
        .unwrap();
    assert_eq!(list.total, 1);
    let saldo = services
        .saldo_query
        .find_by_card_number(CARD.to_string())
        .await
        .unwrap();
    assert_eq!(saldo.total_balance, 900);

    // A second command must not leave pre-command snapshots visible.
    services.withdraw_command.create(withdraw(200)).await.unwrap();

    let list = services
        .withdraw_query
        .find_all(Pagination::default())
        .await
        .unwrap();
    assert_eq!(list.total, 2);
    let saldo = services
        .saldo_query
        .find_by_card_number(CARD.to_string())
        .await
        .unwrap();
    assert_eq!(saldo.total_balance, 700);
}

#[tokio::test]
async fn test_card_stats_withdraw_series_reflects_commands() {
    let (_dir, services) = setup(1000).await;
    services.withdraw_command.create(withdraw(250)).await.unwrap();

    let year = chrono::Datelike::year(&Utc::now());
    let series = services
        .card_stats
        .get_stats(CardStatsQuery {
            kind: CardStatsKind::Withdraw,
            grain: StatsGrain::Year,
            year,
            card_number: Some(CARD.to_string()),
        })
        .await
        .unwrap();
    let total: i64 = series.iter().map(|b| b.total_amount).sum();
    assert_eq!(total, 250);
}

#[tokio::test]
async fn test_dashboard_totals() {
    let (_dir, services) = setup(1000).await;
    services.withdraw_command.create(withdraw(250)).await.unwrap();

    let dashboard = services.card_stats.dashboard(Some(CARD.to_string())).await.unwrap();
    assert_eq!(dashboard.total_balance, 750);
    assert_eq!(dashboard.total_withdraw, 250);
    assert_eq!(dashboard.total_topup, 0);
}
