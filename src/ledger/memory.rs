//! In-memory ledger store.
//!
//! Keeps the same contract as the PostgreSQL store (unique keys, ordering,
//! per-schema lifecycle) without a database, for tests and dry runs.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;

use super::store::{LedgerStore, MigrationRecord};
use crate::error::AppError;

/// Ledger store held in process memory.
///
/// Clones share the same underlying data.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLedgerStore {
    stores: Arc<Mutex<BTreeMap<String, Vec<MigrationRecord>>>>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, BTreeMap<String, Vec<MigrationRecord>>>, AppError> {
        self.stores
            .lock()
            .map_err(|_| AppError::Ledger("in-memory ledger lock poisoned".to_string()))
    }
}

fn sorted(mut records: Vec<MigrationRecord>) -> Vec<MigrationRecord> {
    records.sort_by(|a, b| {
        a.batch
            .cmp(&b.batch)
            .then_with(|| a.migration.cmp(&b.migration))
    });
    records
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn store_exists(&self, schema: &str) -> Result<bool, AppError> {
        Ok(self.lock()?.contains_key(schema))
    }

    async fn create_store(&self, schema: &str) -> Result<(), AppError> {
        self.lock()?.entry(schema.to_string()).or_default();
        Ok(())
    }

    async fn drop_store(&self, schema: &str) -> Result<(), AppError> {
        self.lock()?.remove(schema);
        Ok(())
    }

    async fn insert(&self, schema: &str, key: &str, batch: u32) -> Result<(), AppError> {
        let mut stores = self.lock()?;
        let records = stores.get_mut(schema).ok_or_else(|| {
            AppError::Ledger(format!("ledger store for schema '{}' does not exist", schema))
        })?;

        if records.iter().any(|r| r.migration == key) {
            return Err(AppError::DuplicateRecord {
                schema: schema.to_string(),
                migration: key.to_string(),
            });
        }

        records.push(MigrationRecord {
            migration: key.to_string(),
            batch,
            executed_at: Utc::now(),
        });
        Ok(())
    }

    async fn delete(&self, schema: &str, key: &str) -> Result<(), AppError> {
        if let Some(records) = self.lock()?.get_mut(schema) {
            records.retain(|r| r.migration != key);
        }
        Ok(())
    }

    async fn select_prefix(
        &self,
        schema: &str,
        prefix: &str,
    ) -> Result<Vec<MigrationRecord>, AppError> {
        let stores = self.lock()?;
        let records = stores
            .get(schema)
            .map(|records| {
                records
                    .iter()
                    .filter(|r| r.migration.starts_with(prefix))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        Ok(sorted(records))
    }

    async fn max_batch(&self, schema: &str, prefix: &str) -> Result<Option<u32>, AppError> {
        let stores = self.lock()?;
        Ok(stores.get(schema).and_then(|records| {
            records
                .iter()
                .filter(|r| r.migration.starts_with(prefix))
                .map(|r| r.batch)
                .max()
        }))
    }

    async fn select_all(&self) -> Result<Vec<MigrationRecord>, AppError> {
        let stores = self.lock()?;
        Ok(sorted(stores.values().flatten().cloned().collect()))
    }
}
