use chrono::{TimeZone, Utc};

use paygate_common::model::{LedgerStatus, Withdraw};
use paygate_common::pagination::Pagination;
use paygate_common::requests::{StatsDimension, StatsGrain, StatsQuery, StatsScope};
use paygate_ledger::{CardChanges, NewCard, NewSaldo, Repositories};

fn open_repos() -> (tempfile::TempDir, Repositories) {
    let dir = tempfile::tempdir().expect("tempdir");
    let repos = Repositories::open(dir.path()).expect("open repositories");
    (dir, repos)
}

fn new_card(number: &str, user_id: u64) -> NewCard {
    NewCard {
        user_id,
        card_number: number.to_string(),
        card_type: "debit".to_string(),
        card_provider: "visa".to_string(),
        expire_date: chrono::NaiveDate::from_ymd_opt(2030, 1, 1).unwrap(),
        cvv: "123".to_string(),
    }
}

fn withdraw_draft(card: &str, amount: i64, year: i32, month: u32) -> Withdraw {
    let time = Utc.with_ymd_and_hms(year, month, 10, 9, 0, 0).unwrap();
    Withdraw {
        id: 0,
        card_number: card.to_string(),
        withdraw_amount: amount,
        withdraw_time: time,
        status: LedgerStatus::Pending,
        created_at: time,
        updated_at: time,
        deleted_at: None,
    }
}

#[tokio::test]
async fn test_card_unique_number_conflict() {
    let (_dir, repos) = open_repos();
    repos.cards.create(new_card("4000000000000001", 1)).await.unwrap();
    let err = repos
        .cards
        .create(new_card("4000000000000001", 2))
        .await
        .unwrap_err();
    assert_eq!(err.reason(), "UniqueViolation");
}

#[tokio::test]
async fn test_card_trash_restore_is_identity() {
    let (_dir, repos) = open_repos();
    let card = repos.cards.create(new_card("4000000000000002", 1)).await.unwrap();

    let trashed = repos.cards.trash(card.id).await.unwrap();
    assert!(trashed.deleted_at.is_some());

    let restored = repos.cards.restore(card.id).await.unwrap();
    assert!(restored.deleted_at.is_none());
    assert_eq!(restored.card_number, card.card_number);
    assert_eq!(restored.card_type, card.card_type);
    assert_eq!(restored.user_id, card.user_id);
    assert_eq!(restored.created_at, card.created_at);
}

#[tokio::test]
async fn test_card_permanent_delete_then_lookup_is_not_found() {
    let (_dir, repos) = open_repos();
    let card = repos.cards.create(new_card("4000000000000003", 1)).await.unwrap();
    repos.cards.delete_permanent(card.id).await.unwrap();

    let err = repos.cards.find_by_id(card.id).await.unwrap_err();
    assert_eq!(err.reason(), "CardNotFound");
    // The freed card number may be taken again.
    repos.cards.create(new_card("4000000000000003", 2)).await.unwrap();
}

#[tokio::test]
async fn test_card_update_edits_fields_in_place() {
    let (_dir, repos) = open_repos();
    let card = repos.cards.create(new_card("4000000000000010", 1)).await.unwrap();
    let updated = repos
        .cards
        .update(
            card.id,
            CardChanges {
                card_type: "credit".to_string(),
                card_provider: "mastercard".to_string(),
                expire_date: chrono::NaiveDate::from_ymd_opt(2031, 6, 1).unwrap(),
                cvv: "999".to_string(),
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.card_type, "credit");
    assert_eq!(updated.card_number, card.card_number);
}

#[tokio::test]
async fn test_active_and_trashed_partitions() {
    let (_dir, repos) = open_repos();
    let a = repos.cards.create(new_card("4000000000000004", 1)).await.unwrap();
    let _b = repos.cards.create(new_card("4000000000000005", 1)).await.unwrap();
    repos.cards.trash(a.id).await.unwrap();

    let filter = Pagination::default();
    let active = repos.cards.find_active(&filter).await.unwrap();
    let trashed = repos.cards.find_trashed(&filter).await.unwrap();
    let all = repos.cards.find_all(&filter).await.unwrap();
    assert_eq!(active.total, 1);
    assert_eq!(trashed.total, 1);
    assert_eq!(all.total, 2);
}

#[tokio::test]
async fn test_pagination_concatenation_matches_unpaged_set() {
    let (_dir, repos) = open_repos();
    for i in 0..25 {
        let draft = withdraw_draft("4000000000000006", 100 + i, 2024, 1);
        repos.withdraws.create(draft).await.unwrap();
    }

    let mut seen = Vec::new();
    for page in 1..=3 {
        let filter = Pagination::new(Some(page), Some(10), None);
        let result = repos.withdraws.find_all(&filter).await.unwrap();
        assert_eq!(result.total, 25);
        let expected = if page == 3 { 5 } else { 10 };
        assert_eq!(result.items.len(), expected);
        seen.extend(result.items.into_iter().map(|w| w.id));
    }
    let unpaged = repos
        .withdraws
        .find_all(&Pagination::new(Some(1), Some(100), None))
        .await
        .unwrap();
    let mut all_ids: Vec<u64> = unpaged.items.iter().map(|w| w.id).collect();
    let mut seen_sorted = seen.clone();
    seen_sorted.sort_unstable();
    all_ids.sort_unstable();
    assert_eq!(seen_sorted, all_ids);
    assert_eq!(seen.len(), 25);
}

#[tokio::test]
async fn test_status_transition_rules_enforced() {
    let (_dir, repos) = open_repos();
    let row = repos
        .withdraws
        .create(withdraw_draft("4000000000000007", 300, 2024, 2))
        .await
        .unwrap();
    assert_eq!(row.status, LedgerStatus::Pending);

    let ok = repos
        .withdraws
        .update_status(row.id, LedgerStatus::Success)
        .await
        .unwrap();
    assert_eq!(ok.status, LedgerStatus::Success);

    let err = repos
        .withdraws
        .update_status(row.id, LedgerStatus::Failed)
        .await
        .unwrap_err();
    assert_eq!(err.reason(), "RepositoryFailed");
}

#[tokio::test]
async fn test_monthly_aggregate_returns_dense_twelve_months() {
    let (_dir, repos) = open_repos();
    for month in [3, 7, 11] {
        let row = repos
            .withdraws
            .create(withdraw_draft("4000000000000008", 250, 2024, month))
            .await
            .unwrap();
        repos
            .withdraws
            .update_status(row.id, LedgerStatus::Success)
            .await
            .unwrap();
    }
    // Another card's rows must not leak into the by-card series.
    let other = repos
        .withdraws
        .create(withdraw_draft("4000000000000009", 999, 2024, 3))
        .await
        .unwrap();
    repos
        .withdraws
        .update_status(other.id, LedgerStatus::Success)
        .await
        .unwrap();

    let query = StatsQuery {
        dimension: StatsDimension::Amount,
        grain: StatsGrain::Month,
        scope: StatsScope::ByCard("4000000000000008".to_string()),
        year: 2024,
        month: None,
    };
    let series = repos.withdraws.aggregate(&query).await.unwrap();
    assert_eq!(series.len(), 12);
    for (idx, bucket) in series.iter().enumerate() {
        let month = idx + 1;
        if [3, 7, 11].contains(&month) {
            assert_eq!(bucket.total_amount, 250, "month {month}");
        } else {
            assert_eq!(bucket.total_amount, 0, "month {month}");
        }
    }
}

#[tokio::test]
async fn test_status_dimension_filters_rows() {
    let (_dir, repos) = open_repos();
    let ok = repos
        .withdraws
        .create(withdraw_draft("4000000000000011", 100, 2024, 5))
        .await
        .unwrap();
    repos
        .withdraws
        .update_status(ok.id, LedgerStatus::Success)
        .await
        .unwrap();
    let bad = repos
        .withdraws
        .create(withdraw_draft("4000000000000011", 70, 2024, 5))
        .await
        .unwrap();
    repos
        .withdraws
        .update_status(bad.id, LedgerStatus::Failed)
        .await
        .unwrap();

    let mut query = StatsQuery {
        dimension: StatsDimension::StatusSuccess,
        grain: StatsGrain::Month,
        scope: StatsScope::Global,
        year: 2024,
        month: None,
    };
    let success = repos.withdraws.aggregate(&query).await.unwrap();
    assert_eq!(success[4].count, 1);
    assert_eq!(success[4].total_amount, 100);

    query.dimension = StatsDimension::StatusFailed;
    let failed = repos.withdraws.aggregate(&query).await.unwrap();
    assert_eq!(failed[4].count, 1);
    assert_eq!(failed[4].total_amount, 70);
}

#[tokio::test]
async fn test_saldo_balance_lifecycle() {
    let (_dir, repos) = open_repos();
    let saldo = repos
        .saldos
        .create(NewSaldo {
            card_number: "4000000000000012".to_string(),
            total_balance: 1000,
        })
        .await
        .unwrap();
    assert_eq!(saldo.total_balance, 1000);

    let dup = repos
        .saldos
        .create(NewSaldo {
            card_number: "4000000000000012".to_string(),
            total_balance: 5,
        })
        .await
        .unwrap_err();
    assert_eq!(dup.reason(), "UniqueViolation");

    let after = repos
        .saldos
        .update_balance("4000000000000012", 700, Some((300, Utc::now())))
        .await
        .unwrap();
    assert_eq!(after.total_balance, 700);
    assert_eq!(after.withdraw_amount, Some(300));

    let found = repos
        .saldos
        .find_by_card_number("4000000000000012")
        .await
        .unwrap();
    assert_eq!(found.total_balance, 700);
}

#[tokio::test]
async fn test_trashed_saldo_is_invisible_to_balance_lookups() {
    let (_dir, repos) = open_repos();
    let saldo = repos
        .saldos
        .create(NewSaldo {
            card_number: "4000000000000013".to_string(),
            total_balance: 100,
        })
        .await
        .unwrap();
    repos.saldos.trash(saldo.id).await.unwrap();

    let err = repos
        .saldos
        .find_by_card_number("4000000000000013")
        .await
        .unwrap_err();
    assert_eq!(err.reason(), "SaldoNotFound");
}

#[tokio::test]
async fn test_delete_all_permanent_only_touches_trashed_rows() {
    let (_dir, repos) = open_repos();
    let keep = repos
        .withdraws
        .create(withdraw_draft("4000000000000014", 10, 2024, 1))
        .await
        .unwrap();
    let drop1 = repos
        .withdraws
        .create(withdraw_draft("4000000000000014", 20, 2024, 1))
        .await
        .unwrap();
    repos.withdraws.trash(drop1.id).await.unwrap();

    let removed = repos.withdraws.delete_all_permanent().await.unwrap();
    assert_eq!(removed, 1);
    assert!(repos.withdraws.find_by_id(keep.id).await.is_ok());
    assert_eq!(
        repos.withdraws.find_by_id(drop1.id).await.unwrap_err().reason(),
        "WithdrawNotFound"
    );
}
