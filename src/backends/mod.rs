//! Production backends for the ledger store and the execution engine.

pub mod postgres;

pub use postgres::{PostgresClient, PostgresTransaction};
