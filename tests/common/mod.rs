//! Shared fixtures: a temporary migration tree, an in-memory ledger and an
//! executor double that records every call.

#![allow(dead_code)]

use std::collections::HashSet;
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tempfile::TempDir;

use strata::error::AppError;
use strata::executor::{MigrationApplier, MigrationExecutor, Transaction};
use strata::ledger::{InMemoryLedgerStore, Ledger, MigrationDiscovery};
use strata::registry::SchemaRegistry;
use strata::runner::SchemaMigrationRunner;

/// One apply/revert as seen by the executor, keyed `schema/file`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Apply { migration: String, simulate: bool },
    Revert { migration: String, simulate: bool },
}

impl Call {
    pub fn migration(&self) -> &str {
        match self {
            Call::Apply { migration, .. } | Call::Revert { migration, .. } => migration,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxOutcome {
    Committed,
    RolledBack,
}

#[derive(Default)]
struct State {
    calls: Vec<Call>,
    transactions: Vec<TxOutcome>,
    failing: HashSet<String>,
}

/// Executor double. Clones share state.
#[derive(Clone, Default)]
pub struct RecordingExecutor {
    state: Arc<Mutex<State>>,
}

fn key(path: &Path) -> String {
    let file = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
    let schema = path
        .parent()
        .and_then(|p| p.file_name())
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    format!("{}/{}", schema, file)
}

impl RecordingExecutor {
    /// Makes apply/revert of `schema/file` fail from now on.
    pub fn fail_on(&self, migration: &str) {
        self.state.lock().unwrap().failing.insert(migration.to_string());
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn applied(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, Call::Apply { .. }))
            .map(|c| c.migration().to_string())
            .collect()
    }

    pub fn reverted(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, Call::Revert { .. }))
            .map(|c| c.migration().to_string())
            .collect()
    }

    pub fn transactions(&self) -> Vec<TxOutcome> {
        self.state.lock().unwrap().transactions.clone()
    }

    fn call(&self, call: Call) -> Result<(), AppError> {
        let mut state = self.state.lock().unwrap();
        let migration = call.migration().to_string();
        if state.failing.contains(&migration) {
            return Err(AppError::Execution {
                migration,
                message: "simulated failure".to_string(),
            });
        }
        state.calls.push(call);
        Ok(())
    }
}

#[async_trait]
impl MigrationApplier for RecordingExecutor {
    async fn apply(&self, path: &Path, simulate: bool) -> Result<(), AppError> {
        self.call(Call::Apply {
            migration: key(path),
            simulate,
        })
    }

    async fn revert(&self, path: &Path, simulate: bool) -> Result<(), AppError> {
        self.call(Call::Revert {
            migration: key(path),
            simulate,
        })
    }
}

pub struct RecordingTransaction {
    executor: RecordingExecutor,
}

#[async_trait]
impl MigrationApplier for RecordingTransaction {
    async fn apply(&self, path: &Path, simulate: bool) -> Result<(), AppError> {
        self.executor.apply(path, simulate).await
    }

    async fn revert(&self, path: &Path, simulate: bool) -> Result<(), AppError> {
        self.executor.revert(path, simulate).await
    }
}

#[async_trait]
impl Transaction for RecordingTransaction {
    async fn commit(self) -> Result<(), AppError> {
        self.executor
            .state
            .lock()
            .unwrap()
            .transactions
            .push(TxOutcome::Committed);
        Ok(())
    }

    async fn rollback(self) -> Result<(), AppError> {
        self.executor
            .state
            .lock()
            .unwrap()
            .transactions
            .push(TxOutcome::RolledBack);
        Ok(())
    }
}

#[async_trait]
impl MigrationExecutor for RecordingExecutor {
    type Tx<'a> = RecordingTransaction;

    async fn begin(&self) -> Result<Self::Tx<'_>, AppError> {
        Ok(RecordingTransaction {
            executor: self.clone(),
        })
    }
}

pub type TestRunner = SchemaMigrationRunner<InMemoryLedgerStore, RecordingExecutor>;

/// A migration tree under a temporary root: `<root>/<schema>/<file>`.
pub struct Fixture {
    pub dir: TempDir,
    pub registry: SchemaRegistry,
    pub store: InMemoryLedgerStore,
    pub executor: RecordingExecutor,
}

impl Fixture {
    /// Registers `schemas` (name, dependencies) in order and creates their
    /// directories.
    pub fn new(schemas: &[(&str, &[&str])]) -> Self {
        let dir = TempDir::new().unwrap();
        let mut registry = SchemaRegistry::new();

        for (name, deps) in schemas {
            let deps: Vec<String> = deps.iter().map(|d| d.to_string()).collect();
            registry
                .register(name, dir.path().join(name), &deps)
                .unwrap();
            registry.create_path(name).unwrap();
        }

        Self {
            dir,
            registry,
            store: InMemoryLedgerStore::new(),
            executor: RecordingExecutor::default(),
        }
    }

    /// Writes an empty migration file.
    pub fn migration(&self, schema: &str, file: &str) -> &Self {
        std::fs::write(
            self.dir.path().join(schema).join(file),
            "-- strata:up\nSELECT 1;\n-- strata:down\nSELECT 1;\n",
        )
        .unwrap();
        self
    }

    pub fn ledger(&self) -> Ledger<InMemoryLedgerStore> {
        Ledger::new(
            self.store.clone(),
            MigrationDiscovery::new(self.dir.path(), "sql"),
        )
    }

    pub fn runner(&self) -> TestRunner {
        SchemaMigrationRunner::new(
            Arc::new(self.registry.clone()),
            self.ledger(),
            self.executor.clone(),
        )
    }
}

pub fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
