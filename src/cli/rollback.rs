//! Rollback command handler.

use color_eyre::{eyre::eyre, Result};

use crate::context::{AppRunner, Context};
use crate::di::FromRef;
use crate::error::AppError;
use crate::runner::SchemaOutcome;

use super::output::{confirm_operation, print_outcomes};
use super::App;

impl App {
    /// Roll back the last batch of one schema or of every schema.
    pub async fn run_rollback(
        &self,
        ctx: &Context,
        schema: Option<&str>,
        all: bool,
        pretend: bool,
        force: bool,
    ) -> Result<()> {
        let runner = AppRunner::from_ref(ctx);

        let targets: Vec<String> = match (schema, all) {
            (_, true) => runner.registry().names().map(str::to_string).collect(),
            (Some(schema), false) => {
                if !runner.registry().exists(schema) {
                    return Err(AppError::SchemaNotFound(schema.to_string()).into());
                }
                vec![schema.to_string()]
            }
            (None, false) => return Err(eyre!("Please specify a schema or use --all")),
        };

        if !force && !pretend && !confirm_operation("rollback", &targets)? {
            return Err(eyre!("Rollback cancelled"));
        }

        let outcomes = if all {
            tracing::info!(pretend, "Rolling back all schemas");
            runner.rollback_all(pretend).await?
        } else {
            let schema = &targets[0];
            tracing::info!(schema = %schema, pretend, "Rolling back schema");
            let migrations = runner.rollback(schema, None, pretend).await?;
            if migrations.is_empty() {
                Vec::new()
            } else {
                vec![SchemaOutcome {
                    schema: schema.clone(),
                    migrations,
                }]
            }
        };

        print_outcomes(&outcomes, "rollback", self.json)
    }
}
