//! Migrate command handler.

use color_eyre::{eyre::eyre, Result};

use crate::context::{AppRunner, Context};
use crate::di::FromRef;
use crate::error::AppError;
use crate::runner::{SchemaOutcome, SchemaStatus};

use super::output::{confirm_operation, print_json, print_outcomes, status_table};
use super::App;

impl App {
    /// Run pending migrations for one schema or all of them.
    pub async fn run_migrate(
        &self,
        ctx: &Context,
        schema: Option<&str>,
        all: bool,
        pretend: bool,
        force: bool,
    ) -> Result<()> {
        let runner = AppRunner::from_ref(ctx);

        match (schema, all) {
            (_, true) => self.migrate_all(&runner, pretend, force).await,
            (Some(schema), false) => self.migrate_single(&runner, schema, pretend).await,
            (None, false) => Err(eyre!("Please specify a schema or use --all")),
        }
    }

    async fn migrate_single(&self, runner: &AppRunner, schema: &str, pretend: bool) -> Result<()> {
        if !runner.registry().exists(schema) {
            return Err(AppError::SchemaNotFound(schema.to_string()).into());
        }

        let status: Option<SchemaStatus> = runner
            .pending_status()
            .await?
            .into_iter()
            .find(|s| s.schema == schema && !s.pending.is_empty());

        let Some(status) = status else {
            if self.json {
                return print_json(&Vec::<SchemaOutcome>::new());
            }
            println!("Nothing to migrate.");
            return Ok(());
        };

        if !status.can_run {
            if !self.json {
                eprint!("{}", status_table([&status]));
            }
            return Err(AppError::UnsatisfiedDependencies(schema.to_string()).into());
        }

        if pretend {
            tracing::info!(schema, "Simulating migrations");
        } else {
            tracing::info!(schema, "Running migrations");
        }

        let migrations = runner.run(schema, status.pending, pretend).await?;
        print_outcomes(
            &[SchemaOutcome {
                schema: schema.to_string(),
                migrations,
            }],
            "migrate",
            self.json,
        )
    }

    async fn migrate_all(&self, runner: &AppRunner, pretend: bool, force: bool) -> Result<()> {
        let pending: Vec<SchemaStatus> = runner
            .pending_status()
            .await?
            .into_iter()
            .filter(|s| !s.pending.is_empty())
            .collect();

        if pending.is_empty() {
            if self.json {
                return print_json(&Vec::<SchemaOutcome>::new());
            }
            println!("Nothing to migrate.");
            return Ok(());
        }

        if !self.json {
            print!("{}", status_table(&pending));
        }

        if !force && !pretend {
            let schemas: Vec<String> = pending.iter().map(|s| s.schema.clone()).collect();
            if !confirm_operation("migrate", &schemas)? {
                return Err(eyre!("Migration cancelled"));
            }
        }

        if pretend {
            tracing::info!("Simulating migrations for all schemas");
        } else {
            tracing::info!("Running migrations for all schemas");
        }

        let outcomes = runner.run_all(pretend).await?;
        print_outcomes(&outcomes, "migrate", self.json)
    }
}
