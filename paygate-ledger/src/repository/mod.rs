use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;

use paygate_common::error::{Entity, Result};
use paygate_common::model::{Card, LedgerStatus, Saldo, User};
use paygate_common::pagination::{Paged, Pagination};
use paygate_common::requests::{StatsBucket, StatsQuery, StatsScope};

pub mod card;
pub mod ledger_rows;
pub mod saldo;
pub mod user;

pub use card::RedbCardRepository;
pub use ledger_rows::RedbLedgerRepository;
pub use saldo::RedbSaldoRepository;
pub use user::RedbUserRepository;

#[derive(Debug, Clone)]
pub struct NewCard {
    pub user_id: u64,
    pub card_number: String,
    pub card_type: String,
    pub card_provider: String,
    pub expire_date: NaiveDate,
    pub cvv: String,
}

#[derive(Debug, Clone)]
pub struct CardChanges {
    pub card_type: String,
    pub card_provider: String,
    pub expire_date: NaiveDate,
    pub cvv: String,
}

#[derive(Debug, Clone)]
pub struct NewSaldo {
    pub card_number: String,
    pub total_balance: i64,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub firstname: String,
    pub lastname: String,
    pub email: String,
    pub password_hash: String,
}

#[async_trait]
pub trait CardRepository: Send + Sync {
    async fn create(&self, new: NewCard) -> Result<Card>;
    async fn update(&self, id: u64, changes: CardChanges) -> Result<Card>;
    async fn find_by_id(&self, id: u64) -> Result<Card>;
    async fn find_by_card_number(&self, card_number: &str) -> Result<Card>;
    async fn find_by_user(&self, user_id: u64, filter: &Pagination) -> Result<Paged<Card>>;
    async fn find_all(&self, filter: &Pagination) -> Result<Paged<Card>>;
    async fn find_active(&self, filter: &Pagination) -> Result<Paged<Card>>;
    async fn find_trashed(&self, filter: &Pagination) -> Result<Paged<Card>>;
    async fn trash(&self, id: u64) -> Result<Card>;
    async fn restore(&self, id: u64) -> Result<Card>;
    async fn delete_permanent(&self, id: u64) -> Result<()>;
    async fn restore_all(&self) -> Result<u64>;
    async fn delete_all_permanent(&self) -> Result<u64>;
}

#[async_trait]
pub trait SaldoRepository: Send + Sync {
    async fn create(&self, new: NewSaldo) -> Result<Saldo>;
    async fn update(&self, id: u64, card_number: String, total_balance: i64) -> Result<Saldo>;
    /// The pipeline's balance write. `withdraw_mark` stamps the projection's
    /// last-withdraw fields when the mutation came from a withdraw.
    async fn update_balance(
        &self,
        card_number: &str,
        total_balance: i64,
        withdraw_mark: Option<(i64, DateTime<Utc>)>,
    ) -> Result<Saldo>;
    async fn find_by_id(&self, id: u64) -> Result<Saldo>;
    async fn find_by_card_number(&self, card_number: &str) -> Result<Saldo>;
    async fn find_all(&self, filter: &Pagination) -> Result<Paged<Saldo>>;
    async fn find_active(&self, filter: &Pagination) -> Result<Paged<Saldo>>;
    async fn find_trashed(&self, filter: &Pagination) -> Result<Paged<Saldo>>;
    async fn trash(&self, id: u64) -> Result<Saldo>;
    async fn restore(&self, id: u64) -> Result<Saldo>;
    async fn delete_permanent(&self, id: u64) -> Result<()>;
    async fn restore_all(&self) -> Result<u64>;
    async fn delete_all_permanent(&self) -> Result<u64>;
    /// Balance series grouped by the projection's creation period.
    async fn balance_series(
        &self,
        grain: paygate_common::requests::StatsGrain,
        year: i32,
        card_number: Option<&str>,
    ) -> Result<Vec<StatsBucket>>;
    async fn total_balance(&self, card_number: Option<&str>) -> Result<i64>;
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, new: NewUser) -> Result<User>;
    async fn find_by_id(&self, id: u64) -> Result<User>;
    async fn find_by_email(&self, email: &str) -> Result<User>;
}

/// Row shape shared by the four monetary ledger entities. One generic
/// repository serves them all; the trait carries the per-entity accessors
/// the generic code needs.
pub trait LedgerRow:
    Serialize + DeserializeOwned + Clone + Send + Sync + 'static
{
    const DOMAIN: &'static str;

    fn entity() -> Entity;
    fn id(&self) -> u64;
    fn set_id(&mut self, id: u64);
    fn amount(&self) -> i64;
    fn occurred_at(&self) -> DateTime<Utc>;
    fn status(&self) -> LedgerStatus;
    fn set_status(&mut self, status: LedgerStatus);
    fn deleted_at(&self) -> Option<DateTime<Utc>>;
    fn set_deleted_at(&mut self, at: Option<DateTime<Utc>>);
    fn stamp_created(&mut self, now: DateTime<Utc>);
    fn stamp_updated(&mut self, now: DateTime<Utc>);
    fn matches_card(&self, card_number: &str) -> bool;
    fn matches_scope(&self, scope: &StatsScope) -> bool;
    /// Case-insensitive free-text match over the entity's searchable columns.
    fn matches_search(&self, needle: &str) -> bool;
}

#[async_trait]
pub trait LedgerRepository<T: LedgerRow>: Send + Sync {
    /// Appends a row. The caller provides the draft (status `pending`);
    /// id and timestamps are assigned here.
    async fn create(&self, draft: T) -> Result<T>;
    /// Rewrites an existing row in place, refreshing `updated_at`.
    async fn update(&self, row: T) -> Result<T>;
    async fn update_status(&self, id: u64, status: LedgerStatus) -> Result<T>;
    async fn find_by_id(&self, id: u64) -> Result<T>;
    async fn find_all(&self, filter: &Pagination) -> Result<Paged<T>>;
    async fn find_by_card(&self, card_number: &str, filter: &Pagination) -> Result<Paged<T>>;
    async fn find_active(&self, filter: &Pagination) -> Result<Paged<T>>;
    async fn find_trashed(&self, filter: &Pagination) -> Result<Paged<T>>;
    async fn trash(&self, id: u64) -> Result<T>;
    async fn restore(&self, id: u64) -> Result<T>;
    async fn delete_permanent(&self, id: u64) -> Result<()>;
    async fn restore_all(&self) -> Result<u64>;
    async fn delete_all_permanent(&self) -> Result<u64>;
    /// Dense aggregation series for the parametric stats service.
    async fn aggregate(&self, query: &StatsQuery) -> Result<Vec<StatsBucket>>;
    /// Sum of success amounts under the scope. Dashboard input.
    async fn total_amount(&self, scope: &StatsScope) -> Result<i64>;
}
