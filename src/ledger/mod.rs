//! Migration ledger: which migrations each schema has applied, and when.
//!
//! Records live in a [`LedgerStore`] under namespaced keys
//! (`schema/identifier`), so one physical layout serves every schema. The
//! [`Ledger`] speaks bare identifiers and adds the derived views: ran,
//! pending (files on disk minus ran), batch numbers and the global summary.

mod discovery;
mod memory;
mod store;

pub use discovery::MigrationDiscovery;
pub use memory::InMemoryLedgerStore;
pub use store::{LedgerStore, MigrationRecord};

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::AppError;

/// Per-namespace summary produced by [`Ledger::status_by_prefix`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PrefixStatus {
    pub schema: String,
    pub total: usize,
    pub last_batch: u32,
    /// Key of the record scanned last (batch, then key order).
    pub last_migration: Option<String>,
    pub last_executed: Option<DateTime<Utc>>,
}

/// Applied-migration bookkeeping for every schema.
#[derive(Debug, Clone)]
pub struct Ledger<S> {
    store: S,
    discovery: MigrationDiscovery,
}

fn prefix(schema: &str) -> String {
    format!("{}/", schema)
}

fn key(schema: &str, migration: &str) -> String {
    format!("{}/{}", schema, migration)
}

impl<S: LedgerStore> Ledger<S> {
    pub fn new(store: S, discovery: MigrationDiscovery) -> Self {
        Self { store, discovery }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn discovery(&self) -> &MigrationDiscovery {
        &self.discovery
    }

    pub fn discovery_mut(&mut self) -> &mut MigrationDiscovery {
        &mut self.discovery
    }

    /// Whether the backing store for `schema` exists.
    pub async fn exists(&self, schema: &str) -> Result<bool, AppError> {
        self.store.store_exists(schema).await
    }

    pub async fn create_store(&self, schema: &str) -> Result<(), AppError> {
        self.store.create_store(schema).await
    }

    pub async fn drop_store(&self, schema: &str) -> Result<(), AppError> {
        self.store.drop_store(schema).await
    }

    /// Creates the backing store for `schema` unless it already exists.
    pub async fn ensure_store(&self, schema: &str) -> Result<(), AppError> {
        if !self.exists(schema).await? {
            tracing::info!(schema, "Creating migration ledger");
            self.create_store(schema).await?;
        }
        Ok(())
    }

    /// Records of `schema` with the namespace stripped, batch then
    /// identifier ascending.
    async fn records(&self, schema: &str) -> Result<Vec<MigrationRecord>, AppError> {
        let prefix = prefix(schema);
        let records = self.store.select_prefix(schema, &prefix).await?;
        Ok(records
            .into_iter()
            .map(|mut record| {
                if let Some(bare) = record.migration.strip_prefix(&prefix) {
                    record.migration = bare.to_string();
                }
                record
            })
            .collect())
    }

    /// Applied identifiers of `schema`, batch then identifier ascending.
    pub async fn ran(&self, schema: &str) -> Result<Vec<String>, AppError> {
        Ok(self
            .records(schema)
            .await?
            .into_iter()
            .map(|r| r.migration)
            .collect())
    }

    /// Identifiers found on disk for `schema` that are not in the ledger,
    /// ascending.
    pub async fn pending(&self, schema: &str) -> Result<Vec<String>, AppError> {
        let files = self.discovery.discover(schema).await?;
        let ran: HashSet<String> = self.ran(schema).await?.into_iter().collect();
        Ok(files.into_iter().filter(|f| !ran.contains(f)).collect())
    }

    /// Highest batch recorded for `schema`, or 0.
    pub async fn last_batch(&self, schema: &str) -> Result<u32, AppError> {
        Ok(self
            .store
            .max_batch(schema, &prefix(schema))
            .await?
            .unwrap_or(0))
    }

    /// Batch number the next run of `schema` will use.
    pub async fn next_batch(&self, schema: &str) -> Result<u32, AppError> {
        Ok(self.last_batch(schema).await? + 1)
    }

    /// Records `migration` as applied in `batch`.
    pub async fn record(&self, schema: &str, migration: &str, batch: u32) -> Result<(), AppError> {
        tracing::debug!(schema, migration, batch, "Recording migration");
        match self.store.insert(schema, &key(schema, migration), batch).await {
            Err(AppError::DuplicateRecord { .. }) => Err(AppError::DuplicateRecord {
                schema: schema.to_string(),
                migration: migration.to_string(),
            }),
            other => other,
        }
    }

    /// Removes the record of `migration`.
    pub async fn forget(&self, schema: &str, migration: &str) -> Result<(), AppError> {
        tracing::debug!(schema, migration, "Forgetting migration");
        self.store.delete(schema, &key(schema, migration)).await
    }

    /// Records of the last batch of `schema`, identifier descending.
    pub async fn last_batch_records(&self, schema: &str) -> Result<Vec<MigrationRecord>, AppError> {
        let last = self.last_batch(schema).await?;
        let mut records: Vec<_> = self
            .records(schema)
            .await?
            .into_iter()
            .filter(|r| r.batch == last)
            .collect();
        records.sort_by(|a, b| b.migration.cmp(&a.migration));
        Ok(records)
    }

    /// Every record of `schema`, batch then identifier ascending.
    pub async fn history(&self, schema: &str) -> Result<Vec<MigrationRecord>, AppError> {
        self.records(schema).await
    }

    /// Summarizes all records grouped by their leading namespace segment.
    ///
    /// Records are scanned in batch-then-key order; `last_migration` and
    /// `last_executed` come from the last record scanned for each group,
    /// which is not necessarily the greatest key. Groups keep the order in
    /// which they were first seen.
    pub async fn status_by_prefix(&self) -> Result<Vec<PrefixStatus>, AppError> {
        let mut groups: Vec<PrefixStatus> = Vec::new();
        let mut positions: HashMap<String, usize> = HashMap::new();

        for record in self.store.select_all().await? {
            let namespace = record
                .migration
                .split_once('/')
                .map(|(ns, _)| ns)
                .unwrap_or(&record.migration)
                .to_string();

            let pos = *positions.entry(namespace.clone()).or_insert_with(|| {
                groups.push(PrefixStatus {
                    schema: namespace,
                    total: 0,
                    last_batch: 0,
                    last_migration: None,
                    last_executed: None,
                });
                groups.len() - 1
            });

            let group = &mut groups[pos];
            group.total += 1;
            group.last_batch = group.last_batch.max(record.batch);
            group.last_executed = Some(record.executed_at);
            group.last_migration = Some(record.migration);
        }

        Ok(groups)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn ledger_with_files(files: &[(&str, &str)]) -> (TempDir, Ledger<InMemoryLedgerStore>) {
        let dir = TempDir::new().unwrap();
        for (schema, file) in files {
            let schema_dir = dir.path().join(schema);
            std::fs::create_dir_all(&schema_dir).unwrap();
            std::fs::write(schema_dir.join(file), "-- strata:up\nSELECT 1;\n").unwrap();
        }
        let ledger = Ledger::new(
            InMemoryLedgerStore::new(),
            MigrationDiscovery::new(dir.path(), "sql"),
        );
        (dir, ledger)
    }

    #[tokio::test]
    async fn test_batches_start_at_one() {
        let (_dir, ledger) = ledger_with_files(&[]);
        assert_eq!(ledger.last_batch("public").await.unwrap(), 0);
        assert_eq!(ledger.next_batch("public").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_record_raises_last_batch() {
        let (_dir, ledger) = ledger_with_files(&[]);
        ledger.ensure_store("public").await.unwrap();
        ledger.record("public", "a.sql", 3).await.unwrap();

        let last = ledger.last_batch("public").await.unwrap();
        assert!(last >= 3);
        assert_eq!(ledger.next_batch("public").await.unwrap(), last + 1);
    }

    #[tokio::test]
    async fn test_record_duplicate_reports_bare_identifier() {
        let (_dir, ledger) = ledger_with_files(&[]);
        ledger.ensure_store("public").await.unwrap();
        ledger.record("public", "a.sql", 1).await.unwrap();

        match ledger.record("public", "a.sql", 2).await {
            Err(AppError::DuplicateRecord { schema, migration }) => {
                assert_eq!(schema, "public");
                assert_eq!(migration, "a.sql");
            }
            other => panic!("expected DuplicateRecord, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_pending_is_disk_minus_ran() {
        let (_dir, ledger) = ledger_with_files(&[
            ("public", "0001_users.sql"),
            ("public", "0002_posts.sql"),
            ("public", "0003_tags.sql"),
        ]);
        ledger.ensure_store("public").await.unwrap();
        ledger.record("public", "0002_posts.sql", 1).await.unwrap();

        assert_eq!(ledger.ran("public").await.unwrap(), vec!["0002_posts.sql"]);
        assert_eq!(
            ledger.pending("public").await.unwrap(),
            vec!["0001_users.sql", "0003_tags.sql"]
        );
    }

    #[tokio::test]
    async fn test_schemas_do_not_see_each_other() {
        let (_dir, ledger) = ledger_with_files(&[("public", "a.sql"), ("tenant", "a.sql")]);
        ledger.ensure_store("public").await.unwrap();
        ledger.ensure_store("tenant").await.unwrap();
        ledger.record("public", "a.sql", 1).await.unwrap();

        assert!(ledger.pending("public").await.unwrap().is_empty());
        assert_eq!(ledger.pending("tenant").await.unwrap(), vec!["a.sql"]);
        assert_eq!(ledger.last_batch("tenant").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_last_batch_records_descending() {
        let (_dir, ledger) = ledger_with_files(&[]);
        ledger.ensure_store("s").await.unwrap();
        ledger.record("s", "0001.sql", 1).await.unwrap();
        ledger.record("s", "0002.sql", 2).await.unwrap();
        ledger.record("s", "0003.sql", 2).await.unwrap();

        let last: Vec<_> = ledger
            .last_batch_records("s")
            .await
            .unwrap()
            .into_iter()
            .map(|r| (r.migration, r.batch))
            .collect();
        assert_eq!(
            last,
            vec![("0003.sql".to_string(), 2), ("0002.sql".to_string(), 2)]
        );
    }

    #[tokio::test]
    async fn test_history_and_forget() {
        let (_dir, ledger) = ledger_with_files(&[]);
        ledger.ensure_store("s").await.unwrap();
        ledger.record("s", "b.sql", 1).await.unwrap();
        ledger.record("s", "a.sql", 2).await.unwrap();

        let history: Vec<_> = ledger
            .history("s")
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.migration)
            .collect();
        assert_eq!(history, vec!["b.sql", "a.sql"]);

        ledger.forget("s", "b.sql").await.unwrap();
        assert_eq!(ledger.ran("s").await.unwrap(), vec!["a.sql"]);
    }

    #[tokio::test]
    async fn test_status_by_prefix_uses_scan_order() {
        let (_dir, ledger) = ledger_with_files(&[]);
        ledger.ensure_store("public").await.unwrap();
        ledger.ensure_store("tenant").await.unwrap();
        ledger.record("tenant", "z_late_name.sql", 1).await.unwrap();
        ledger.record("public", "0001.sql", 1).await.unwrap();
        ledger.record("tenant", "a_early_name.sql", 2).await.unwrap();

        let status = ledger.status_by_prefix().await.unwrap();
        assert_eq!(status.len(), 2);

        assert_eq!(status[0].schema, "public");
        assert_eq!(status[0].total, 1);

        let tenant = &status[1];
        assert_eq!(tenant.schema, "tenant");
        assert_eq!(tenant.total, 2);
        assert_eq!(tenant.last_batch, 2);
        assert_eq!(
            tenant.last_migration.as_deref(),
            Some("tenant/a_early_name.sql")
        );
        assert!(tenant.last_executed.is_some());
    }

    #[tokio::test]
    async fn test_drop_store_clears_history() {
        let (_dir, ledger) = ledger_with_files(&[("s", "a.sql")]);
        ledger.ensure_store("s").await.unwrap();
        ledger.record("s", "a.sql", 1).await.unwrap();
        assert!(ledger.exists("s").await.unwrap());

        ledger.drop_store("s").await.unwrap();
        assert!(!ledger.exists("s").await.unwrap());
        assert!(ledger.ran("s").await.unwrap().is_empty());
        assert_eq!(ledger.pending("s").await.unwrap(), vec!["a.sql"]);
    }
}
