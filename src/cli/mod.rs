//! CLI module for Strata.
//!
//! Subcommands:
//! - `list`: Show registered schemas
//! - `create`: Register a schema and create its directory
//! - `validate`: Check schema configuration, dependencies and paths
//! - `migrate`: Apply pending migrations
//! - `rollback`: Revert the last batch
//! - `status`: Show pending work and the ledger summary
//! - `reset`: Revert a schema's entire history

mod create;
mod list;
mod migrate;
mod output;
mod reset;
mod rollback;
mod status;
mod validate;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use color_eyre::Result;

use crate::config::{Config, PROJECT_CONFIG_FILE};
use crate::context::Context;

/// Strata - dependency-aware multi-schema migrations
#[derive(Parser)]
#[command(name = "strata")]
#[command(about = "Dependency-aware migration runner for multi-schema PostgreSQL databases")]
#[command(version)]
pub struct App {
    /// Run in verbose mode
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Project config file (defaults to .strata.toml)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// List registered schemas
    List {
        /// Include paths and whether they exist
        #[arg(long)]
        detail: bool,
    },

    /// Register a new schema and create its migration directory
    Create {
        /// Schema name
        name: String,

        /// Absolute migration directory
        path: PathBuf,

        /// Schema that must be migrated first (repeatable)
        #[arg(long = "dependency", short = 'd')]
        dependencies: Vec<String>,
    },

    /// Validate schema configuration and dependencies
    Validate {
        /// Schema to validate; all schemas when omitted
        name: Option<String>,
    },

    /// Run pending migrations
    Migrate {
        /// Schema to migrate
        #[arg(required_unless_present = "all", conflicts_with = "all")]
        schema: Option<String>,

        /// Migrate every schema in dependency order
        #[arg(long)]
        all: bool,

        /// Show the statements without executing or recording them
        #[arg(long)]
        pretend: bool,

        /// Skip the confirmation prompt
        #[arg(long)]
        force: bool,
    },

    /// Roll back the last batch of migrations
    Rollback {
        /// Schema to roll back
        #[arg(required_unless_present = "all", conflicts_with = "all")]
        schema: Option<String>,

        /// Roll back every schema in reverse dependency order
        #[arg(long)]
        all: bool,

        /// Show the statements without executing or recording them
        #[arg(long)]
        pretend: bool,

        /// Skip the confirmation prompt
        #[arg(long)]
        force: bool,
    },

    /// Show migration status
    Status {
        /// Schema to inspect
        schema: Option<String>,

        /// Only show schemas with pending migrations
        #[arg(long)]
        pending: bool,
    },

    /// Roll back every migration of a schema
    Reset {
        /// Schema to reset
        schema: String,

        /// Show the statements without executing or recording them
        #[arg(long)]
        pretend: bool,

        /// Skip the confirmation prompt
        #[arg(long)]
        force: bool,
    },
}

impl App {
    /// Run the CLI application.
    pub async fn run(self) -> Result<()> {
        let ctx = self.context()?;

        match self.command {
            Command::List { detail } => self.run_list(&ctx, detail),
            Command::Create {
                ref name,
                ref path,
                ref dependencies,
            } => self.run_create(&ctx, name, path, dependencies),
            Command::Validate { ref name } => self.run_validate(&ctx, name.as_deref()),
            Command::Migrate {
                ref schema,
                all,
                pretend,
                force,
            } => {
                self.run_migrate(&ctx, schema.as_deref(), all, pretend, force)
                    .await
            }
            Command::Rollback {
                ref schema,
                all,
                pretend,
                force,
            } => {
                self.run_rollback(&ctx, schema.as_deref(), all, pretend, force)
                    .await
            }
            Command::Status {
                ref schema,
                pending,
            } => self.run_status(&ctx, schema.as_deref(), pending).await,
            Command::Reset {
                ref schema,
                pretend,
                force,
            } => self.run_reset(&ctx, schema, pretend, force).await,
        }
    }

    /// Loads configuration and builds the application context.
    fn context(&self) -> Result<Context> {
        let project_file = self
            .config
            .clone()
            .unwrap_or_else(|| PathBuf::from(PROJECT_CONFIG_FILE));
        let config = Config::load_from(&project_file)?;
        tracing::debug!(config = %project_file.display(), "Loaded configuration");

        Ok(Context::from_config(config)?)
    }
}
