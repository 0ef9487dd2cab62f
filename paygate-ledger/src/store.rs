use std::fmt;
use std::path::Path;
use std::sync::Arc;

use redb::{Database, ReadableTable, TableDefinition};
use serde::de::DeserializeOwned;
use serde::Serialize;

use paygate_common::error::{Result, ServiceError};

pub const CARDS: TableDefinition<u64, &[u8]> = TableDefinition::new("cards");
pub const CARD_NUMBERS: TableDefinition<&str, u64> = TableDefinition::new("card_numbers");
pub const SALDOS: TableDefinition<u64, &[u8]> = TableDefinition::new("saldos");
pub const SALDO_CARDS: TableDefinition<&str, u64> = TableDefinition::new("saldo_cards");
pub const WITHDRAWS: TableDefinition<u64, &[u8]> = TableDefinition::new("withdraws");
pub const TOPUPS: TableDefinition<u64, &[u8]> = TableDefinition::new("topups");
pub const TRANSACTIONS: TableDefinition<u64, &[u8]> = TableDefinition::new("transactions");
pub const TRANSFERS: TableDefinition<u64, &[u8]> = TableDefinition::new("transfers");
pub const USERS: TableDefinition<u64, &[u8]> = TableDefinition::new("users");
pub const USER_EMAILS: TableDefinition<&str, u64> = TableDefinition::new("user_emails");
const SEQUENCES: TableDefinition<&str, u64> = TableDefinition::new("sequences");

fn storage_err(e: impl fmt::Display) -> ServiceError {
    ServiceError::internal("repository", e)
}

/// Embedded transactional store backing every repository. Rows are JSON
/// payloads keyed by id; unique lookups go through secondary index tables.
#[derive(Clone)]
pub struct Store {
    db: Arc<Database>,
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store").field("db", &"Redb").finish()
    }
}

impl Store {
    pub fn open(data_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(data_dir).map_err(storage_err)?;
        let path = data_dir.join("paygate.redb");
        let db = Database::create(path).map_err(storage_err)?;

        // Create every table up front so later read transactions never see
        // a missing table.
        let txn = db.begin_write().map_err(storage_err)?;
        {
            txn.open_table(CARDS).map_err(storage_err)?;
            txn.open_table(CARD_NUMBERS).map_err(storage_err)?;
            txn.open_table(SALDOS).map_err(storage_err)?;
            txn.open_table(SALDO_CARDS).map_err(storage_err)?;
            txn.open_table(WITHDRAWS).map_err(storage_err)?;
            txn.open_table(TOPUPS).map_err(storage_err)?;
            txn.open_table(TRANSACTIONS).map_err(storage_err)?;
            txn.open_table(TRANSFERS).map_err(storage_err)?;
            txn.open_table(USERS).map_err(storage_err)?;
            txn.open_table(USER_EMAILS).map_err(storage_err)?;
            txn.open_table(SEQUENCES).map_err(storage_err)?;
        }
        txn.commit().map_err(storage_err)?;

        Ok(Self { db: Arc::new(db) })
    }

    pub fn next_id(&self, sequence: &str) -> Result<u64> {
        let txn = self.db.begin_write().map_err(storage_err)?;
        let next = {
            let mut table = txn.open_table(SEQUENCES).map_err(storage_err)?;
            let current = table
                .get(sequence)
                .map_err(storage_err)?
                .map(|v| v.value())
                .unwrap_or(0);
            let next = current + 1;
            table.insert(sequence, next).map_err(storage_err)?;
            next
        };
        txn.commit().map_err(storage_err)?;
        Ok(next)
    }

    pub fn put<T: Serialize>(
        &self,
        def: TableDefinition<u64, &'static [u8]>,
        id: u64,
        row: &T,
    ) -> Result<()> {
        let payload = serde_json::to_vec(row).map_err(storage_err)?;
        let txn = self.db.begin_write().map_err(storage_err)?;
        {
            let mut table = txn.open_table(def).map_err(storage_err)?;
            table.insert(id, payload.as_slice()).map_err(storage_err)?;
        }
        txn.commit().map_err(storage_err)?;
        Ok(())
    }

    /// Inserts a row and its unique index entry in one transaction.
    /// Fails with `UniqueViolation` when the index key is already taken.
    pub fn put_indexed<T: Serialize>(
        &self,
        def: TableDefinition<u64, &'static [u8]>,
        id: u64,
        row: &T,
        index: TableDefinition<&'static str, u64>,
        key: &str,
    ) -> Result<()> {
        let payload = serde_json::to_vec(row).map_err(storage_err)?;
        let txn = self.db.begin_write().map_err(storage_err)?;
        {
            let mut index_table = txn.open_table(index).map_err(storage_err)?;
            if let Some(existing) = index_table.get(key).map_err(storage_err)? {
                if existing.value() != id {
                    return Err(ServiceError::unique_violation(key.to_string()));
                }
            }
            index_table.insert(key, id).map_err(storage_err)?;
            let mut table = txn.open_table(def).map_err(storage_err)?;
            table.insert(id, payload.as_slice()).map_err(storage_err)?;
        }
        txn.commit().map_err(storage_err)?;
        Ok(())
    }

    pub fn get<T: DeserializeOwned>(
        &self,
        def: TableDefinition<u64, &'static [u8]>,
        id: u64,
    ) -> Result<Option<T>> {
        let txn = self.db.begin_read().map_err(storage_err)?;
        let table = txn.open_table(def).map_err(storage_err)?;
        let result = match table.get(id).map_err(storage_err)? {
            Some(guard) => {
                let row = serde_json::from_slice(guard.value()).map_err(storage_err)?;
                Ok(Some(row))
            }
            None => Ok(None),
        };
        result
    }

    pub fn remove(&self, def: TableDefinition<u64, &'static [u8]>, id: u64) -> Result<bool> {
        let txn = self.db.begin_write().map_err(storage_err)?;
        let removed = {
            let mut table = txn.open_table(def).map_err(storage_err)?;
            let result = table.remove(id).map_err(storage_err)?.is_some();
            result
        };
        txn.commit().map_err(storage_err)?;
        Ok(removed)
    }

    /// Removes a row together with its unique index entry.
    pub fn remove_indexed(
        &self,
        def: TableDefinition<u64, &'static [u8]>,
        id: u64,
        index: TableDefinition<&'static str, u64>,
        key: &str,
    ) -> Result<bool> {
        let txn = self.db.begin_write().map_err(storage_err)?;
        let removed = {
            let mut index_table = txn.open_table(index).map_err(storage_err)?;
            index_table.remove(key).map_err(storage_err)?;
            let mut table = txn.open_table(def).map_err(storage_err)?;
            let result = table.remove(id).map_err(storage_err)?.is_some();
            result
        };
        txn.commit().map_err(storage_err)?;
        Ok(removed)
    }

    pub fn index_get(&self, index: TableDefinition<&'static str, u64>, key: &str) -> Result<Option<u64>> {
        let txn = self.db.begin_read().map_err(storage_err)?;
        let table = txn.open_table(index).map_err(storage_err)?;
        let result = table.get(key).map_err(storage_err)?.map(|v| v.value());
        Ok(result)
    }

    pub fn index_put(
        &self,
        index: TableDefinition<&'static str, u64>,
        key: &str,
        id: u64,
    ) -> Result<()> {
        let txn = self.db.begin_write().map_err(storage_err)?;
        {
            let mut table = txn.open_table(index).map_err(storage_err)?;
            if let Some(existing) = table.get(key).map_err(storage_err)? {
                if existing.value() != id {
                    return Err(ServiceError::unique_violation(key.to_string()));
                }
            }
            table.insert(key, id).map_err(storage_err)?;
        }
        txn.commit().map_err(storage_err)?;
        Ok(())
    }

    pub fn index_remove(&self, index: TableDefinition<&'static str, u64>, key: &str) -> Result<()> {
        let txn = self.db.begin_write().map_err(storage_err)?;
        {
            let mut table = txn.open_table(index).map_err(storage_err)?;
            table.remove(key).map_err(storage_err)?;
        }
        txn.commit().map_err(storage_err)?;
        Ok(())
    }

    /// Full scan in id order. List filters and aggregations are computed
    /// over this; the dataset per table is the service's own bounded world.
    pub fn scan<T: DeserializeOwned>(&self, def: TableDefinition<u64, &'static [u8]>) -> Result<Vec<T>> {
        let txn = self.db.begin_read().map_err(storage_err)?;
        let table = txn.open_table(def).map_err(storage_err)?;
        let mut rows = Vec::new();
        for entry in table.iter().map_err(storage_err)? {
            let (_, value) = entry.map_err(storage_err)?;
            rows.push(serde_json::from_slice(value.value()).map_err(storage_err)?);
        }
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Row {
        name: String,
    }

    fn temp_store() -> (tempfile::TempDir, Store) {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = Store::open(dir.path()).expect("open store");
        (dir, store)
    }

    #[test]
    fn test_sequences_are_monotonic() {
        let (_dir, store) = temp_store();
        assert_eq!(store.next_id("cards").unwrap(), 1);
        assert_eq!(store.next_id("cards").unwrap(), 2);
        assert_eq!(store.next_id("withdraws").unwrap(), 1);
    }

    #[test]
    fn test_put_get_remove_round_trip() {
        let (_dir, store) = temp_store();
        let row = Row { name: "a".into() };
        store.put(CARDS, 1, &row).unwrap();
        assert_eq!(store.get::<Row>(CARDS, 1).unwrap(), Some(row));
        assert!(store.remove(CARDS, 1).unwrap());
        assert_eq!(store.get::<Row>(CARDS, 1).unwrap(), None);
    }

    #[test]
    fn test_unique_index_rejects_second_writer() {
        let (_dir, store) = temp_store();
        let row = Row { name: "a".into() };
        store
            .put_indexed(CARDS, 1, &row, CARD_NUMBERS, "4000000000000001")
            .unwrap();
        let err = store
            .put_indexed(CARDS, 2, &row, CARD_NUMBERS, "4000000000000001")
            .unwrap_err();
        assert_eq!(err.reason(), "UniqueViolation");
        // same id may rewrite its own row
        store
            .put_indexed(CARDS, 1, &row, CARD_NUMBERS, "4000000000000001")
            .unwrap();
    }
}
