pub mod aggregate;
pub mod repository;
pub mod store;

use std::sync::Arc;

use paygate_common::error::Result;
use paygate_common::model::{Topup, Transaction, Transfer, Withdraw};

pub use repository::{
    CardChanges, CardRepository, LedgerRepository, LedgerRow, NewCard, NewSaldo, NewUser,
    RedbCardRepository, RedbLedgerRepository, RedbSaldoRepository, RedbUserRepository,
    SaldoRepository, UserRepository,
};
pub use store::Store;

/// Every repository of one service process, built over a single store.
pub struct Repositories {
    pub cards: Arc<dyn CardRepository>,
    pub saldos: Arc<dyn SaldoRepository>,
    pub users: Arc<dyn UserRepository>,
    pub withdraws: Arc<dyn LedgerRepository<Withdraw>>,
    pub topups: Arc<dyn LedgerRepository<Topup>>,
    pub transactions: Arc<dyn LedgerRepository<Transaction>>,
    pub transfers: Arc<dyn LedgerRepository<Transfer>>,
}

impl Repositories {
    pub fn open(data_dir: &std::path::Path) -> Result<Self> {
        let store = Store::open(data_dir)?;
        Ok(Self::from_store(store))
    }

    pub fn from_store(store: Store) -> Self {
        Self {
            cards: Arc::new(RedbCardRepository::new(store.clone())),
            saldos: Arc::new(RedbSaldoRepository::new(store.clone())),
            users: Arc::new(RedbUserRepository::new(store.clone())),
            withdraws: Arc::new(RedbLedgerRepository::new(store.clone(), store::WITHDRAWS)),
            topups: Arc::new(RedbLedgerRepository::new(store.clone(), store::TOPUPS)),
            transactions: Arc::new(RedbLedgerRepository::new(
                store.clone(),
                store::TRANSACTIONS,
            )),
            transfers: Arc::new(RedbLedgerRepository::new(store, store::TRANSFERS)),
        }
    }
}
