//! Application context providing dependency injection root.

use std::sync::Arc;

use crate::backends::PostgresClient;
use crate::bootstrap;
use crate::config::Config;
use crate::di::FromRef;
use crate::error::AppError;
use crate::ledger::{Ledger, MigrationDiscovery};
use crate::registry::SchemaRegistry;
use crate::runner::SchemaMigrationRunner;

/// Production ledger.
pub type AppLedger = Ledger<PostgresClient>;

/// Production runner: PostgreSQL is both the ledger store and the executor.
pub type AppRunner = SchemaMigrationRunner<PostgresClient, PostgresClient>;

/// Root application context.
///
/// Holds the shared dependencies of every command. Each field and each
/// component built from them can be extracted with [`FromRef`].
#[derive(Clone)]
pub struct Context {
    /// Application configuration.
    pub config: Arc<Config>,
    /// Schemas registered from configuration at startup.
    pub registry: Arc<SchemaRegistry>,
    /// PostgreSQL connection pool.
    pub client: PostgresClient,
}

impl Context {
    /// Builds the context from loaded configuration.
    ///
    /// Registers the configured schemas (skipped entries are logged) and
    /// creates the connection pool. No connection is opened yet.
    pub fn from_config(config: Config) -> Result<Self, AppError> {
        let registry = bootstrap::registry_from_config(&config);
        let client = PostgresClient::connect(
            &config.database.uri,
            &config.migrations.table,
            config.database.pool_size,
        )?;

        Ok(Self::new(config, registry, client))
    }

    /// Creates a new context with the given dependencies.
    pub fn new(config: Config, registry: SchemaRegistry, client: PostgresClient) -> Self {
        Self {
            config: Arc::new(config),
            registry: Arc::new(registry),
            client,
        }
    }
}

impl FromRef<Context> for Arc<Config> {
    fn from_ref(ctx: &Context) -> Self {
        ctx.config.clone()
    }
}

impl FromRef<Context> for Arc<SchemaRegistry> {
    fn from_ref(ctx: &Context) -> Self {
        ctx.registry.clone()
    }
}

impl FromRef<Context> for PostgresClient {
    fn from_ref(ctx: &Context) -> Self {
        ctx.client.clone()
    }
}

impl FromRef<Context> for MigrationDiscovery {
    fn from_ref(ctx: &Context) -> Self {
        let mut discovery = MigrationDiscovery::new(
            ctx.config.migrations.root.clone(),
            ctx.config.migrations.extension.clone(),
        );
        for schema in ctx.registry.list() {
            discovery.bind(&schema.name, &schema.path);
        }
        discovery
    }
}

impl FromRef<Context> for AppLedger {
    fn from_ref(ctx: &Context) -> Self {
        Ledger::new(PostgresClient::from_ref(ctx), MigrationDiscovery::from_ref(ctx))
    }
}

impl FromRef<Context> for AppRunner {
    fn from_ref(ctx: &Context) -> Self {
        let mut runner = SchemaMigrationRunner::new(
            Arc::<SchemaRegistry>::from_ref(ctx),
            AppLedger::from_ref(ctx),
            PostgresClient::from_ref(ctx),
        );
        runner.use_transactions(ctx.config.transactions.enabled);
        runner
    }
}
