//! Execution engine abstraction.
//!
//! The runner never talks to a database directly. It applies and reverts
//! migration files through these traits:
//!
//! - [`MigrationApplier`] - runs the up/down section of one migration file
//! - [`Transaction`] - commit/rollback of a transaction scope
//! - [`MigrationExecutor`] - auto-commit applier that can begin transactions

mod script;

pub use script::{statements, Direction, MigrationScript, DOWN_MARKER, UP_MARKER};

use std::path::Path;

use async_trait::async_trait;

use crate::error::AppError;

/// Applies or reverts a single migration file.
#[async_trait]
pub trait MigrationApplier: Send + Sync {
    /// Runs the `up` section of the migration at `path`.
    ///
    /// When `simulate` is set the statements are reported but not executed.
    async fn apply(&self, path: &Path, simulate: bool) -> Result<(), AppError>;

    /// Runs the `down` section of the migration at `path`.
    async fn revert(&self, path: &Path, simulate: bool) -> Result<(), AppError>;
}

/// Transaction lifecycle management.
#[async_trait]
pub trait Transaction: Send + Sync {
    /// Commits the transaction. Consumes it.
    async fn commit(self) -> Result<(), AppError>;

    /// Rolls back the transaction. Consumes it.
    async fn rollback(self) -> Result<(), AppError>;
}

/// An execution engine that can scope work in a transaction.
///
/// The executor itself applies migrations in auto-commit mode; migrations
/// applied through the value returned by [`begin`](MigrationExecutor::begin)
/// become visible only once it is committed.
///
/// ```ignore
/// let txn = executor.begin().await?;
/// txn.apply(Path::new("/srv/migrations/public/0001_users.sql"), false).await?;
/// txn.commit().await?;
/// ```
#[async_trait]
pub trait MigrationExecutor: MigrationApplier {
    /// The transaction type returned by this executor.
    type Tx<'a>: Transaction + MigrationApplier
    where
        Self: 'a;

    /// Begins a new transaction.
    async fn begin(&self) -> Result<Self::Tx<'_>, AppError>;
}
