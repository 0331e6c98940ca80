//! Strata - dependency-aware multi-schema migrations
//!
//! Keeps several independently versioned migration namespaces ("schemas")
//! in one database, each with its own directory and ledger, and runs them
//! in an order that respects declared inter-schema dependencies.

pub mod backends;
pub mod bootstrap;
pub mod cli;
pub mod config;
pub mod context;
pub mod di;
pub mod error;
pub mod executor;
pub mod ledger;
pub mod registry;
pub mod runner;

pub use di::FromRef;
pub use error::AppError;
pub use ledger::Ledger;
pub use registry::SchemaRegistry;
pub use runner::SchemaMigrationRunner;
