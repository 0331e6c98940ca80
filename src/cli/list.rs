//! List command handler.

use color_eyre::Result;
use serde::Serialize;

use crate::context::Context;

use super::output::{print_json, Table};
use super::App;

#[derive(Serialize)]
struct SchemaEntry<'a> {
    name: &'a str,
    dependencies: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    path_exists: Option<bool>,
}

impl App {
    /// List registered schemas.
    pub fn run_list(&self, ctx: &Context, detail: bool) -> Result<()> {
        let registry = &ctx.registry;

        let entries: Vec<SchemaEntry<'_>> = registry
            .list()
            .iter()
            .map(|schema| SchemaEntry {
                name: &schema.name,
                dependencies: &schema.dependencies,
                path: detail.then(|| schema.path.display().to_string()),
                path_exists: detail.then(|| schema.path.is_dir()),
            })
            .collect();

        if self.json {
            return print_json(&entries);
        }

        if entries.is_empty() {
            println!("No schemas are currently registered.");
            return Ok(());
        }

        let mut table = if detail {
            Table::new(["Schema", "Dependencies", "Path", "Exists"])
        } else {
            Table::new(["Schema", "Dependencies"])
        };

        for entry in &entries {
            let dependencies = if entry.dependencies.is_empty() {
                "-".to_string()
            } else {
                entry.dependencies.join(", ")
            };
            let mut row = vec![entry.name.to_string(), dependencies];
            if let (Some(path), Some(exists)) = (&entry.path, entry.path_exists) {
                row.push(path.clone());
                row.push(if exists { "Yes" } else { "No" }.to_string());
            }
            table.row(row);
        }

        print!("{}", table);
        Ok(())
    }
}
