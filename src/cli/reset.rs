//! Reset command handler.

use color_eyre::{eyre::eyre, Result};

use crate::context::{AppRunner, Context};
use crate::di::FromRef;
use crate::error::AppError;
use crate::runner::SchemaOutcome;

use super::output::{confirm_operation, print_outcomes};
use super::App;

impl App {
    /// Roll back every migration of `schema`.
    ///
    /// Refuses while other schemas depend on it.
    pub async fn run_reset(
        &self,
        ctx: &Context,
        schema: &str,
        pretend: bool,
        force: bool,
    ) -> Result<()> {
        let runner = AppRunner::from_ref(ctx);
        let registry = runner.registry();

        if !registry.exists(schema) {
            return Err(AppError::SchemaNotFound(schema.to_string()).into());
        }

        let dependents = registry.dependents_of(schema);
        if !dependents.is_empty() {
            return Err(eyre!(
                "Cannot reset schema '{}' - it is required by: {}",
                schema,
                dependents.join(", ")
            ));
        }

        if pretend {
            tracing::info!(schema, "Simulating reset");
        } else {
            if !force && !confirm_operation("reset", &[schema.to_string()])? {
                return Err(eyre!("Reset cancelled"));
            }
            tracing::info!(schema, "Resetting schema");
        }

        let migrations = runner.reset_schema(schema, pretend).await?;
        let outcomes = if migrations.is_empty() {
            Vec::new()
        } else {
            vec![SchemaOutcome {
                schema: schema.to_string(),
                migrations,
            }]
        };

        print_outcomes(&outcomes, "reset", self.json)
    }
}
