use std::marker::PhantomData;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redb::TableDefinition;

use paygate_common::error::{Entity, Result, ServiceError};
use paygate_common::model::{LedgerStatus, Topup, Transaction, Transfer, Withdraw};
use paygate_common::pagination::{Paged, Pagination};
use paygate_common::requests::{StatsBucket, StatsDimension, StatsQuery, StatsScope};

use crate::aggregate::dense_series;
use crate::store::Store;

use super::{LedgerRepository, LedgerRow};

impl LedgerRow for Withdraw {
    const DOMAIN: &'static str = "withdraw";

    fn entity() -> Entity {
        Entity::Withdraw
    }
    fn id(&self) -> u64 {
        self.id
    }
    fn set_id(&mut self, id: u64) {
        self.id = id;
    }
    fn amount(&self) -> i64 {
        self.withdraw_amount
    }
    fn occurred_at(&self) -> DateTime<Utc> {
        self.withdraw_time
    }
    fn status(&self) -> LedgerStatus {
        self.status
    }
    fn set_status(&mut self, status: LedgerStatus) {
        self.status = status;
    }
    fn deleted_at(&self) -> Option<DateTime<Utc>> {
        self.deleted_at
    }
    fn set_deleted_at(&mut self, at: Option<DateTime<Utc>>) {
        self.deleted_at = at;
    }
    fn stamp_created(&mut self, now: DateTime<Utc>) {
        self.created_at = now;
        self.updated_at = now;
    }
    fn stamp_updated(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }
    fn matches_card(&self, card_number: &str) -> bool {
        self.card_number == card_number
    }
    fn matches_scope(&self, scope: &StatsScope) -> bool {
        match scope.card_number() {
            Some(card) => self.card_number == card,
            None => true,
        }
    }
    fn matches_search(&self, needle: &str) -> bool {
        self.card_number.to_lowercase().contains(needle)
            || self.status.as_str().contains(needle)
    }
}

impl LedgerRow for Topup {
    const DOMAIN: &'static str = "topup";

    fn entity() -> Entity {
        Entity::Topup
    }
    fn id(&self) -> u64 {
        self.id
    }
    fn set_id(&mut self, id: u64) {
        self.id = id;
    }
    fn amount(&self) -> i64 {
        self.topup_amount
    }
    fn occurred_at(&self) -> DateTime<Utc> {
        self.topup_time
    }
    fn status(&self) -> LedgerStatus {
        self.status
    }
    fn set_status(&mut self, status: LedgerStatus) {
        self.status = status;
    }
    fn deleted_at(&self) -> Option<DateTime<Utc>> {
        self.deleted_at
    }
    fn set_deleted_at(&mut self, at: Option<DateTime<Utc>>) {
        self.deleted_at = at;
    }
    fn stamp_created(&mut self, now: DateTime<Utc>) {
        self.created_at = now;
        self.updated_at = now;
    }
    fn stamp_updated(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }
    fn matches_card(&self, card_number: &str) -> bool {
        self.card_number == card_number
    }
    fn matches_scope(&self, scope: &StatsScope) -> bool {
        match scope.card_number() {
            Some(card) => self.card_number == card,
            None => true,
        }
    }
    fn matches_search(&self, needle: &str) -> bool {
        self.card_number.to_lowercase().contains(needle)
            || self.topup_no.to_lowercase().contains(needle)
            || self.topup_method.to_lowercase().contains(needle)
            || self.status.as_str().contains(needle)
    }
}

impl LedgerRow for Transaction {
    const DOMAIN: &'static str = "transaction";

    fn entity() -> Entity {
        Entity::Transaction
    }
    fn id(&self) -> u64 {
        self.id
    }
    fn set_id(&mut self, id: u64) {
        self.id = id;
    }
    fn amount(&self) -> i64 {
        self.amount
    }
    fn occurred_at(&self) -> DateTime<Utc> {
        self.transaction_time
    }
    fn status(&self) -> LedgerStatus {
        self.status
    }
    fn set_status(&mut self, status: LedgerStatus) {
        self.status = status;
    }
    fn deleted_at(&self) -> Option<DateTime<Utc>> {
        self.deleted_at
    }
    fn set_deleted_at(&mut self, at: Option<DateTime<Utc>>) {
        self.deleted_at = at;
    }
    fn stamp_created(&mut self, now: DateTime<Utc>) {
        self.created_at = now;
        self.updated_at = now;
    }
    fn stamp_updated(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }
    fn matches_card(&self, card_number: &str) -> bool {
        self.card_number == card_number
    }
    fn matches_scope(&self, scope: &StatsScope) -> bool {
        match scope.card_number() {
            Some(card) => self.card_number == card,
            None => true,
        }
    }
    fn matches_search(&self, needle: &str) -> bool {
        self.card_number.to_lowercase().contains(needle)
            || self.payment_method.to_lowercase().contains(needle)
            || self.status.as_str().contains(needle)
    }
}

impl LedgerRow for Transfer {
    const DOMAIN: &'static str = "transfer";

    fn entity() -> Entity {
        Entity::Transfer
    }
    fn id(&self) -> u64 {
        self.id
    }
    fn set_id(&mut self, id: u64) {
        self.id = id;
    }
    fn amount(&self) -> i64 {
        self.transfer_amount
    }
    fn occurred_at(&self) -> DateTime<Utc> {
        self.transfer_time
    }
    fn status(&self) -> LedgerStatus {
        self.status
    }
    fn set_status(&mut self, status: LedgerStatus) {
        self.status = status;
    }
    fn deleted_at(&self) -> Option<DateTime<Utc>> {
        self.deleted_at
    }
    fn set_deleted_at(&mut self, at: Option<DateTime<Utc>>) {
        self.deleted_at = at;
    }
    fn stamp_created(&mut self, now: DateTime<Utc>) {
        self.created_at = now;
        self.updated_at = now;
    }
    fn stamp_updated(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }
    fn matches_card(&self, card_number: &str) -> bool {
        self.transfer_from == card_number || self.transfer_to == card_number
    }
    fn matches_scope(&self, scope: &StatsScope) -> bool {
        match scope {
            StatsScope::Global => true,
            StatsScope::ByCard(card) => self.matches_card(card),
            StatsScope::BySender(card) => self.transfer_from == *card,
            StatsScope::ByReceiver(card) => self.transfer_to == *card,
        }
    }
    fn matches_search(&self, needle: &str) -> bool {
        self.transfer_from.to_lowercase().contains(needle)
            || self.transfer_to.to_lowercase().contains(needle)
            || self.status.as_str().contains(needle)
    }
}

/// redb-backed implementation shared by all four monetary entities.
pub struct RedbLedgerRepository<T: LedgerRow> {
    store: Store,
    table: TableDefinition<'static, u64, &'static [u8]>,
    _marker: PhantomData<T>,
}

impl<T: LedgerRow> RedbLedgerRepository<T> {
    pub fn new(store: Store, table: TableDefinition<'static, u64, &'static [u8]>) -> Self {
        Self {
            store,
            table,
            _marker: PhantomData,
        }
    }

    fn load(&self, id: u64) -> Result<T> {
        self.store
            .get::<T>(self.table, id)?
            .ok_or_else(|| ServiceError::not_found(T::entity()))
    }

    fn page(rows: Vec<T>, filter: &Pagination) -> Paged<T> {
        let needle = filter.search.to_lowercase();
        let filtered: Vec<T> = rows
            .into_iter()
            .filter(|row| needle.is_empty() || row.matches_search(&needle))
            .collect();
        let total = filtered.len() as i64;
        let items = filtered
            .into_iter()
            .skip(filter.offset())
            .take(filter.limit())
            .collect();
        Paged::new(items, total, filter)
    }
}

#[async_trait]
impl<T: LedgerRow> LedgerRepository<T> for RedbLedgerRepository<T> {
    async fn create(&self, mut draft: T) -> Result<T> {
        let id = self.store.next_id(T::DOMAIN)?;
        draft.set_id(id);
        draft.stamp_created(Utc::now());
        self.store.put(self.table, id, &draft)?;
        Ok(draft)
    }

    async fn update(&self, mut row: T) -> Result<T> {
        let existing = self.load(row.id())?;
        if existing.deleted_at().is_some() {
            return Err(ServiceError::not_found(T::entity()));
        }
        row.stamp_updated(Utc::now());
        self.store.put(self.table, row.id(), &row)?;
        Ok(row)
    }

    async fn update_status(&self, id: u64, status: LedgerStatus) -> Result<T> {
        let mut row = self.load(id)?;
        if !row.status().can_transition_to(status) {
            return Err(ServiceError::internal(
                "repository",
                format!(
                    "illegal status transition {} -> {} on {} {id}",
                    row.status().as_str(),
                    status.as_str(),
                    T::DOMAIN
                ),
            ));
        }
        row.set_status(status);
        row.stamp_updated(Utc::now());
        self.store.put(self.table, id, &row)?;
        Ok(row)
    }

    async fn find_by_id(&self, id: u64) -> Result<T> {
        self.load(id)
    }

    async fn find_all(&self, filter: &Pagination) -> Result<Paged<T>> {
        Ok(Self::page(self.store.scan(self.table)?, filter))
    }

    async fn find_by_card(&self, card_number: &str, filter: &Pagination) -> Result<Paged<T>> {
        let rows: Vec<T> = self
            .store
            .scan::<T>(self.table)?
            .into_iter()
            .filter(|row| row.matches_card(card_number))
            .collect();
        Ok(Self::page(rows, filter))
    }

    async fn find_active(&self, filter: &Pagination) -> Result<Paged<T>> {
        let rows: Vec<T> = self
            .store
            .scan::<T>(self.table)?
            .into_iter()
            .filter(|row| row.deleted_at().is_none())
            .collect();
        Ok(Self::page(rows, filter))
    }

    async fn find_trashed(&self, filter: &Pagination) -> Result<Paged<T>> {
        let rows: Vec<T> = self
            .store
            .scan::<T>(self.table)?
            .into_iter()
            .filter(|row| row.deleted_at().is_some())
            .collect();
        Ok(Self::page(rows, filter))
    }

    async fn trash(&self, id: u64) -> Result<T> {
        let mut row = self.load(id)?;
        row.set_deleted_at(Some(Utc::now()));
        row.stamp_updated(Utc::now());
        self.store.put(self.table, id, &row)?;
        Ok(row)
    }

    async fn restore(&self, id: u64) -> Result<T> {
        let mut row = self.load(id)?;
        row.set_deleted_at(None);
        row.stamp_updated(Utc::now());
        self.store.put(self.table, id, &row)?;
        Ok(row)
    }

    async fn delete_permanent(&self, id: u64) -> Result<()> {
        if !self.store.remove(self.table, id)? {
            return Err(ServiceError::not_found(T::entity()));
        }
        Ok(())
    }

    async fn restore_all(&self) -> Result<u64> {
        let mut restored = 0;
        for row in self.store.scan::<T>(self.table)? {
            if row.deleted_at().is_some() {
                let mut row = row;
                row.set_deleted_at(None);
                row.stamp_updated(Utc::now());
                self.store.put(self.table, row.id(), &row)?;
                restored += 1;
            }
        }
        Ok(restored)
    }

    async fn delete_all_permanent(&self) -> Result<u64> {
        let mut removed = 0;
        for row in self.store.scan::<T>(self.table)? {
            if row.deleted_at().is_some() {
                self.store.remove(self.table, row.id())?;
                removed += 1;
            }
        }
        Ok(removed)
    }

    async fn aggregate(&self, query: &StatsQuery) -> Result<Vec<StatsBucket>> {
        let rows = self
            .store
            .scan::<T>(self.table)?
            .into_iter()
            .filter(|row| row.deleted_at().is_none())
            .filter(|row| row.matches_scope(&query.scope))
            .filter(|row| match query.dimension {
                StatsDimension::Amount => true,
                StatsDimension::StatusSuccess => row.status() == LedgerStatus::Success,
                StatsDimension::StatusFailed => row.status() == LedgerStatus::Failed,
            })
            .filter(|row| match query.month {
                Some(month) => {
                    use chrono::Datelike;
                    row.occurred_at().month() == month
                }
                None => true,
            })
            .map(|row| (row.occurred_at(), row.amount()));
        Ok(dense_series(query.grain, query.year, rows))
    }

    async fn total_amount(&self, scope: &StatsScope) -> Result<i64> {
        Ok(self
            .store
            .scan::<T>(self.table)?
            .into_iter()
            .filter(|row| row.deleted_at().is_none())
            .filter(|row| row.status() == LedgerStatus::Success)
            .filter(|row| row.matches_scope(scope))
            .map(|row| row.amount())
            .sum())
    }
}
