//! Persistence seam for ledger records.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::AppError;

/// One applied migration as stored in the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationRecord {
    /// Migration identifier. Stores hand back the namespaced key
    /// (`schema/file`); [`Ledger`](super::Ledger) strips the namespace.
    pub migration: String,
    /// Batch the migration was applied in.
    pub batch: u32,
    /// When the record was inserted.
    pub executed_at: DateTime<Utc>,
}

/// A keyed record store backing the ledger.
///
/// Each schema owns a store that can be created and dropped independently
/// of the registry. Record keys are namespaced (`schema/identifier`) and
/// unique. Every query returns records ordered by batch, then key, both
/// ascending. Queries against a store that does not exist return nothing.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Whether the backing store for `schema` exists.
    async fn store_exists(&self, schema: &str) -> Result<bool, AppError>;

    /// Creates the backing store for `schema`; no-op if it exists.
    async fn create_store(&self, schema: &str) -> Result<(), AppError>;

    /// Drops the backing store for `schema` and every record in it.
    async fn drop_store(&self, schema: &str) -> Result<(), AppError>;

    /// Inserts a record stamped with the current time.
    ///
    /// Fails with [`AppError::DuplicateRecord`] if `key` is already stored.
    async fn insert(&self, schema: &str, key: &str, batch: u32) -> Result<(), AppError>;

    /// Deletes the record with `key`, if any.
    async fn delete(&self, schema: &str, key: &str) -> Result<(), AppError>;

    /// Records of `schema` whose key starts with `prefix`.
    async fn select_prefix(
        &self,
        schema: &str,
        prefix: &str,
    ) -> Result<Vec<MigrationRecord>, AppError>;

    /// Highest batch among records of `schema` whose key starts with `prefix`.
    async fn max_batch(&self, schema: &str, prefix: &str) -> Result<Option<u32>, AppError>;

    /// Every record of every store.
    async fn select_all(&self) -> Result<Vec<MigrationRecord>, AppError>;
}
