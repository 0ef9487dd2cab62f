use async_trait::async_trait;
use chrono::{DateTime, Utc};

use paygate_common::error::{Entity, Result, ServiceError};
use paygate_common::model::Saldo;
use paygate_common::pagination::{Paged, Pagination};
use paygate_common::requests::{StatsBucket, StatsGrain};

use crate::aggregate::dense_series;
use crate::store::{Store, SALDOS, SALDO_CARDS};

use super::{NewSaldo, SaldoRepository};

pub struct RedbSaldoRepository {
    store: Store,
}

impl RedbSaldoRepository {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    fn load(&self, id: u64) -> Result<Saldo> {
        self.store
            .get::<Saldo>(SALDOS, id)?
            .ok_or_else(|| ServiceError::not_found(Entity::Saldo))
    }

    fn page(rows: Vec<Saldo>, filter: &Pagination) -> Paged<Saldo> {
        let needle = filter.search.to_lowercase();
        let filtered: Vec<Saldo> = rows
            .into_iter()
            .filter(|saldo| needle.is_empty() || saldo.card_number.to_lowercase().contains(&needle))
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
impl SaldoRepository for RedbSaldoRepository {
    async fn create(&self, new: NewSaldo) -> Result<Saldo> {
        let now = Utc::now();
        let id = self.store.next_id("saldos")?;
        let saldo = Saldo {
            id,
            card_number: new.card_number,
            total_balance: new.total_balance,
            withdraw_amount: None,
            withdraw_time: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        self.store
            .put_indexed(SALDOS, id, &saldo, SALDO_CARDS, &saldo.card_number)?;
        Ok(saldo)
    }

    async fn update(&self, id: u64, card_number: String, total_balance: i64) -> Result<Saldo> {
        let mut saldo = self.load(id)?;
        if saldo.deleted_at.is_some() {
            return Err(ServiceError::not_found(Entity::Saldo));
        }
        if saldo.card_number != card_number {
            // Re-key the unique per-card index.
            self.store.index_put(SALDO_CARDS, &card_number, id)?;
            self.store.index_remove(SALDO_CARDS, &saldo.card_number)?;
            saldo.card_number = card_number;
        }
        saldo.total_balance = total_balance;
        saldo.updated_at = Utc::now();
        self.store.put(SALDOS, id, &saldo)?;
        Ok(saldo)
    }

    async fn update_balance(
        &self,
        card_number: &str,
        total_balance: i64,
        withdraw_mark: Option<(i64, DateTime<Utc>)>,
    ) -> Result<Saldo> {
        let id = self
            .store
            .index_get(SALDO_CARDS, card_number)?
            .ok_or_else(|| ServiceError::not_found(Entity::Saldo))?;
        let mut saldo = self.load(id)?;
        if saldo.deleted_at.is_some() {
            return Err(ServiceError::not_found(Entity::Saldo));
        }
        saldo.total_balance = total_balance;
        if let Some((amount, time)) = withdraw_mark {
            saldo.withdraw_amount = Some(amount);
            saldo.withdraw_time = Some(time);
        }
        saldo.updated_at = Utc::now();
        self.store.put(SALDOS, id, &saldo)?;
        Ok(saldo)
    }

    async fn find_by_id(&self, id: u64) -> Result<Saldo> {
        self.load(id)
    }

    async fn find_by_card_number(&self, card_number: &str) -> Result<Saldo> {
        let id = self
            .store
            .index_get(SALDO_CARDS, card_number)?
            .ok_or_else(|| ServiceError::not_found(Entity::Saldo))?;
        let saldo = self.load(id)?;
        if saldo.deleted_at.is_some() {
            return Err(ServiceError::not_found(Entity::Saldo));
        }
        Ok(saldo)
    }

    async fn find_all(&self, filter: &Pagination) -> Result<Paged<Saldo>> {
        Ok(Self::page(self.store.scan(SALDOS)?, filter))
    }

    async fn find_active(&self, filter: &Pagination) -> Result<Paged<Saldo>> {
        let rows: Vec<Saldo> = self
            .store
            .scan::<Saldo>(SALDOS)?
            .into_iter()
            .filter(|saldo| saldo.deleted_at.is_none())
            .collect();
        Ok(Self::page(rows, filter))
    }

    async fn find_trashed(&self, filter: &Pagination) -> Result<Paged<Saldo>> {
        let rows: Vec<Saldo> = self
            .store
            .scan::<Saldo>(SALDOS)?
            .into_iter()
            .filter(|saldo| saldo.deleted_at.is_some())
            .collect();
        Ok(Self::page(rows, filter))
    }

    async fn trash(&self, id: u64) -> Result<Saldo> {
        let mut saldo = self.load(id)?;
        saldo.deleted_at = Some(Utc::now());
        saldo.updated_at = Utc::now();
        self.store.put(SALDOS, id, &saldo)?;
        Ok(saldo)
    }

    async fn restore(&self, id: u64) -> Result<Saldo> {
        let mut saldo = self.load(id)?;
        saldo.deleted_at = None;
        saldo.updated_at = Utc::now();
        self.store.put(SALDOS, id, &saldo)?;
        Ok(saldo)
    }

    async fn delete_permanent(&self, id: u64) -> Result<()> {
        let saldo = self.load(id)?;
        self.store
            .remove_indexed(SALDOS, id, SALDO_CARDS, &saldo.card_number)?;
        Ok(())
    }

    async fn restore_all(&self) -> Result<u64> {
        let mut restored = 0;
        for mut saldo in self.store.scan::<Saldo>(SALDOS)? {
            if saldo.deleted_at.is_some() {
                saldo.deleted_at = None;
                saldo.updated_at = Utc::now();
                self.store.put(SALDOS, saldo.id, &saldo)?;
                restored += 1;
            }
        }
        Ok(restored)
    }

    async fn delete_all_permanent(&self) -> Result<u64> {
        let mut removed = 0;
        for saldo in self.store.scan::<Saldo>(SALDOS)? {
            if saldo.deleted_at.is_some() {
                self.store
                    .remove_indexed(SALDOS, saldo.id, SALDO_CARDS, &saldo.card_number)?;
                removed += 1;
            }
        }
        Ok(removed)
    }

    async fn balance_series(
        &self,
        grain: StatsGrain,
        year: i32,
        card_number: Option<&str>,
    ) -> Result<Vec<StatsBucket>> {
        let rows = self
            .store
            .scan::<Saldo>(SALDOS)?
            .into_iter()
            .filter(|saldo| saldo.deleted_at.is_none())
            .filter(|saldo| card_number.map_or(true, |card| saldo.card_number == card))
            .map(|saldo| (saldo.created_at, saldo.total_balance));
        Ok(dense_series(grain, year, rows))
    }

    async fn total_balance(&self, card_number: Option<&str>) -> Result<i64> {
        Ok(self
            .store
            .scan::<Saldo>(SALDOS)?
            .into_iter()
            .filter(|saldo| saldo.deleted_at.is_none())
            .filter(|saldo| card_number.map_or(true, |card| saldo.card_number == card))
            .map(|saldo| saldo.total_balance)
            .sum())
    }
}
