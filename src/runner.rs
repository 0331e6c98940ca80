//! Dependency-aware migration runner.
//!
//! The runner composes the [`SchemaRegistry`], a [`Ledger`] and a
//! [`MigrationExecutor`]. Every call validates first (schema known, direct
//! dependencies fully migrated) and only then touches the executor, so a
//! validation failure never runs a migration.
//!
//! With transactions enabled each `run`/`rollback` call executes in one
//! transaction. The ledger lives outside that transaction, so a failed call
//! also undoes the ledger changes it made. With transactions disabled a
//! failure keeps whatever prefix was already applied and recorded.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use futures::future::try_join_all;
use serde::Serialize;

use crate::error::AppError;
use crate::executor::{MigrationApplier, MigrationExecutor, Transaction};
use crate::ledger::{Ledger, LedgerStore};
use crate::registry::SchemaRegistry;

/// Pending work of one schema, as reported by
/// [`SchemaMigrationRunner::pending_status`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaStatus {
    pub schema: String,
    pub pending: Vec<String>,
    pub dependencies: Vec<String>,
    /// Every direct dependency has nothing pending.
    pub can_run: bool,
}

/// Identifiers processed for one schema by a multi-schema operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaOutcome {
    pub schema: String,
    pub migrations: Vec<String>,
}

/// One step of a batch, with the ledger change it made.
enum Step {
    Applied(String),
    Reverted { migration: String, batch: u32 },
}

impl Step {
    fn migration(&self) -> &str {
        match self {
            Step::Applied(m) => m,
            Step::Reverted { migration, .. } => migration,
        }
    }
}

#[derive(Clone, Copy)]
enum Mode {
    Apply { batch: u32 },
    Revert,
}

pub struct SchemaMigrationRunner<S, E> {
    registry: Arc<SchemaRegistry>,
    ledger: Ledger<S>,
    executor: E,
    use_transactions: bool,
}

impl<S, E> SchemaMigrationRunner<S, E>
where
    S: LedgerStore,
    E: MigrationExecutor,
{
    /// Creates a runner. Transactions are enabled by default.
    ///
    /// Pending migrations of each registered schema are discovered in its
    /// registered directory, the same one they are applied from.
    pub fn new(registry: Arc<SchemaRegistry>, mut ledger: Ledger<S>, executor: E) -> Self {
        for schema in registry.list() {
            ledger.discovery_mut().bind(&schema.name, &schema.path);
        }

        Self {
            registry,
            ledger,
            executor,
            use_transactions: true,
        }
    }

    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    pub fn ledger(&self) -> &Ledger<S> {
        &self.ledger
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    /// Sets the transaction policy for every subsequent run/rollback.
    pub fn use_transactions(&mut self, enabled: bool) {
        self.use_transactions = enabled;
    }

    pub fn is_using_transactions(&self) -> bool {
        self.use_transactions
    }

    /// Applies `migrations` to `schema` as one batch.
    ///
    /// Returns the identifiers applied, in the order applied (ascending).
    /// Unless simulating, each migration is recorded right after it applies.
    pub async fn run(
        &self,
        schema: &str,
        migrations: Vec<String>,
        simulate: bool,
    ) -> Result<Vec<String>, AppError> {
        self.require_schema(schema)?;

        let migrations = match self.resolve_order(schema, migrations).await {
            Err(AppError::DependencyUnsatisfied { dependency, .. }) => {
                tracing::warn!(schema, dependency = %dependency, "Dependency has pending migrations");
                return Err(AppError::UnsatisfiedDependencies(schema.to_string()));
            }
            result => result?,
        };
        let batch = self.ledger.next_batch(schema).await?;

        tracing::info!(schema, batch, count = migrations.len(), simulate, "Running migrations");

        if !simulate {
            self.ledger.ensure_store(schema).await?;
        }

        self.execute(schema, &migrations, Mode::Apply { batch }, simulate)
            .await
    }

    /// Reverts `migrations` of `schema`, or its last batch when `None`.
    ///
    /// Explicit identifiers are reverted in the order given; the last batch
    /// is reverted identifier descending.
    pub async fn rollback(
        &self,
        schema: &str,
        migrations: Option<Vec<String>>,
        simulate: bool,
    ) -> Result<Vec<String>, AppError> {
        self.require_schema(schema)?;

        let migrations = match migrations {
            Some(migrations) => migrations,
            None => self
                .ledger
                .last_batch_records(schema)
                .await?
                .into_iter()
                .map(|r| r.migration)
                .collect(),
        };

        tracing::info!(schema, count = migrations.len(), simulate, "Rolling back migrations");

        self.execute(schema, &migrations, Mode::Revert, simulate)
            .await
    }

    /// Checks that every direct dependency of `schema` has nothing pending,
    /// then returns `migrations` sorted ascending.
    ///
    /// Only direct dependencies are checked.
    pub async fn resolve_order(
        &self,
        schema: &str,
        mut migrations: Vec<String>,
    ) -> Result<Vec<String>, AppError> {
        if let Some(dependency) = self.blocking_dependency(schema).await? {
            return Err(AppError::DependencyUnsatisfied {
                schema: schema.to_string(),
                dependency,
            });
        }

        migrations.sort();
        Ok(migrations)
    }

    /// Reverts the entire history of `schema`, most recent first.
    pub async fn reset_schema(&self, schema: &str, simulate: bool) -> Result<Vec<String>, AppError> {
        self.require_schema(schema)?;

        let migrations: Vec<String> = self
            .ledger
            .history(schema)
            .await?
            .into_iter()
            .rev()
            .map(|r| r.migration)
            .collect();

        self.rollback(schema, Some(migrations), simulate).await
    }

    /// Applies every pending migration of every schema, dependencies first.
    ///
    /// Schemas with nothing pending are left out of the result. A simulated
    /// run records nothing, so a schema whose dependency still has pending
    /// work is skipped with a warning instead of failing the whole call.
    pub async fn run_all(&self, simulate: bool) -> Result<Vec<SchemaOutcome>, AppError> {
        let mut outcomes = Vec::new();

        for schema in self.registry.topological_order() {
            let pending = self.ledger.pending(&schema).await?;
            if pending.is_empty() {
                tracing::debug!(schema = %schema, "Nothing to migrate");
                continue;
            }
            if simulate {
                if let Some(dependency) = self.blocking_dependency(&schema).await? {
                    tracing::warn!(
                        schema = %schema,
                        dependency = %dependency,
                        "Skipped in pretend mode: dependency has pending migrations"
                    );
                    continue;
                }
            }
            let migrations = self.run(&schema, pending, simulate).await?;
            outcomes.push(SchemaOutcome { schema, migrations });
        }

        Ok(outcomes)
    }

    /// Reverts the last batch of every schema, dependents first.
    ///
    /// Schemas with nothing recorded are left out of the result.
    pub async fn rollback_all(&self, simulate: bool) -> Result<Vec<SchemaOutcome>, AppError> {
        let mut outcomes = Vec::new();

        for schema in self.registry.topological_order().into_iter().rev() {
            let last: Vec<String> = self
                .ledger
                .last_batch_records(&schema)
                .await?
                .into_iter()
                .map(|r| r.migration)
                .collect();
            if last.is_empty() {
                tracing::debug!(schema = %schema, "Nothing to roll back");
                continue;
            }
            let migrations = self.rollback(&schema, Some(last), simulate).await?;
            outcomes.push(SchemaOutcome { schema, migrations });
        }

        Ok(outcomes)
    }

    /// Pending work of every registered schema, in registration order.
    pub async fn pending_status(&self) -> Result<Vec<SchemaStatus>, AppError> {
        let schemas = self.registry.list();
        let pending = try_join_all(schemas.iter().map(|s| self.ledger.pending(&s.name))).await?;

        let by_name: HashMap<&str, &[String]> = schemas
            .iter()
            .zip(&pending)
            .map(|(s, p)| (s.name.as_str(), p.as_slice()))
            .collect();

        let status = schemas
            .iter()
            .zip(&pending)
            .map(|(schema, pending)| SchemaStatus {
                schema: schema.name.clone(),
                pending: pending.clone(),
                dependencies: schema.dependencies.clone(),
                can_run: schema
                    .dependencies
                    .iter()
                    .all(|d| by_name.get(d.as_str()).map_or(true, |p| p.is_empty())),
            })
            .collect();

        Ok(status)
    }

    fn require_schema(&self, schema: &str) -> Result<(), AppError> {
        if self.registry.exists(schema) {
            Ok(())
        } else {
            Err(AppError::SchemaNotFound(schema.to_string()))
        }
    }

    /// First direct dependency of `schema` with pending migrations.
    async fn blocking_dependency(&self, schema: &str) -> Result<Option<String>, AppError> {
        for dependency in self.registry.dependencies_of(schema)? {
            if !self.ledger.pending(dependency).await?.is_empty() {
                return Ok(Some(dependency.clone()));
            }
        }
        Ok(None)
    }

    /// Runs a batch under the configured transaction policy.
    async fn execute(
        &self,
        schema: &str,
        migrations: &[String],
        mode: Mode,
        simulate: bool,
    ) -> Result<Vec<String>, AppError> {
        let mut steps = Vec::with_capacity(migrations.len());

        if simulate && !migrations.is_empty() {
            tracing::warn!(schema, "Pretend mode: nothing is executed or recorded");
        }

        if !self.use_transactions {
            self.execute_steps(&self.executor, schema, migrations, mode, simulate, &mut steps)
                .await?;
            return Ok(steps.iter().map(|s| s.migration().to_string()).collect());
        }

        let txn = self.executor.begin().await?;
        let outcome = match self
            .execute_steps(&txn, schema, migrations, mode, simulate, &mut steps)
            .await
        {
            Ok(()) => txn.commit().await,
            Err(e) => {
                tracing::error!(schema, error = %e, "Migration batch failed, rolling back");
                if let Err(rollback_err) = txn.rollback().await {
                    tracing::error!(schema, error = %rollback_err, "Transaction rollback failed");
                }
                Err(e)
            }
        };

        if let Err(e) = outcome {
            if !simulate {
                self.compensate(schema, &steps).await;
            }
            return Err(e);
        }

        Ok(steps.iter().map(|s| s.migration().to_string()).collect())
    }

    async fn execute_steps<A>(
        &self,
        applier: &A,
        schema: &str,
        migrations: &[String],
        mode: Mode,
        simulate: bool,
        steps: &mut Vec<Step>,
    ) -> Result<(), AppError>
    where
        A: MigrationApplier + ?Sized,
    {
        let dir = self.registry.path(schema)?.to_path_buf();
        let batches = match mode {
            Mode::Revert if !simulate => self.recorded_batches(schema).await?,
            _ => HashMap::new(),
        };

        for migration in migrations {
            let path: PathBuf = dir.join(migration);

            match mode {
                Mode::Apply { batch } => {
                    tracing::info!(schema, migration = %migration, "Migrating");
                    applier.apply(&path, simulate).await?;
                    if !simulate {
                        self.ledger.record(schema, migration, batch).await?;
                    }
                    steps.push(Step::Applied(migration.clone()));
                }
                Mode::Revert => {
                    tracing::info!(schema, migration = %migration, "Rolling back");
                    applier.revert(&path, simulate).await?;
                    if !simulate {
                        self.ledger.forget(schema, migration).await?;
                    }
                    steps.push(Step::Reverted {
                        migration: migration.clone(),
                        batch: batches.get(migration).copied().unwrap_or(0),
                    });
                }
            }
        }

        Ok(())
    }

    async fn recorded_batches(&self, schema: &str) -> Result<HashMap<String, u32>, AppError> {
        Ok(self
            .ledger
            .history(schema)
            .await?
            .into_iter()
            .map(|r| (r.migration, r.batch))
            .collect())
    }

    /// Restores the ledger after a rolled-back transaction.
    ///
    /// A reverted migration with no recorded batch was never in the ledger
    /// and is not re-recorded.
    async fn compensate(&self, schema: &str, steps: &[Step]) {
        for step in steps.iter().rev() {
            let result = match step {
                Step::Applied(migration) => self.ledger.forget(schema, migration).await,
                Step::Reverted { migration, batch } if *batch > 0 => {
                    self.ledger.record(schema, migration, *batch).await
                }
                Step::Reverted { .. } => Ok(()),
            };
            if let Err(e) = result {
                tracing::error!(
                    schema,
                    migration = step.migration(),
                    error = %e,
                    "Failed to restore ledger after rollback"
                );
            }
        }
    }
}
