//! Status command handler.

use color_eyre::Result;
use serde::Serialize;

use crate::context::{AppRunner, Context};
use crate::di::FromRef;
use crate::error::AppError;
use crate::ledger::PrefixStatus;
use crate::runner::SchemaStatus;

use super::output::{print_json, status_table, Table};
use super::App;

#[derive(Serialize)]
struct StatusReport {
    schemas: Vec<SchemaStatus>,
    ledger: Vec<PrefixStatus>,
}

impl App {
    /// Show pending migrations and the ledger summary.
    pub async fn run_status(
        &self,
        ctx: &Context,
        schema: Option<&str>,
        pending_only: bool,
    ) -> Result<()> {
        let runner = AppRunner::from_ref(ctx);

        if let Some(schema) = schema {
            if !runner.registry().exists(schema) {
                return Err(AppError::SchemaNotFound(schema.to_string()).into());
            }
        }

        let schemas: Vec<SchemaStatus> = runner
            .pending_status()
            .await?
            .into_iter()
            .filter(|s| schema.map_or(true, |name| s.schema == name))
            .filter(|s| !pending_only || !s.pending.is_empty())
            .collect();

        let ledger: Vec<PrefixStatus> = runner
            .ledger()
            .status_by_prefix()
            .await?
            .into_iter()
            .filter(|p| schema.map_or(true, |name| p.schema == name))
            .collect();

        if self.json {
            return print_json(&StatusReport { schemas, ledger });
        }

        if schemas.is_empty() {
            println!("No pending migrations.");
        } else {
            print!("{}", status_table(&schemas));
        }

        if schema.is_some() {
            if let Some(status) = schemas.first().filter(|s| !s.pending.is_empty()) {
                println!();
                println!("Pending migrations:");
                let mut table = Table::new(["Migration"]);
                for migration in &status.pending {
                    table.row([migration]);
                }
                print!("{}", table);
            }
        }

        if !ledger.is_empty() {
            println!();
            println!("Ledger:");
            let mut table = Table::new(["Schema", "Applied", "Last batch", "Last migration", "Executed at"]);
            for prefix in &ledger {
                table.row([
                    prefix.schema.clone(),
                    prefix.total.to_string(),
                    prefix.last_batch.to_string(),
                    prefix.last_migration.clone().unwrap_or_default(),
                    prefix
                        .last_executed
                        .map(|t| t.to_rfc3339())
                        .unwrap_or_default(),
                ]);
            }
            print!("{}", table);
        }

        Ok(())
    }
}
