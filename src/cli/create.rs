//! Create command handler.

use std::path::Path;

use color_eyre::Result;

use crate::context::Context;

use super::output::print_json;
use super::App;

impl App {
    /// Register a schema and create its migration directory.
    ///
    /// The registry lives for this process only; the printed entry has to
    /// be added to the project config to keep the schema registered.
    pub fn run_create(
        &self,
        ctx: &Context,
        name: &str,
        path: &Path,
        dependencies: &[String],
    ) -> Result<()> {
        let mut registry = (*ctx.registry).clone();
        registry.register(name, path, dependencies)?;
        registry.create_path(name)?;

        let schema = registry
            .get(name)
            .ok_or_else(|| color_eyre::eyre::eyre!("Schema '{}' vanished after registration", name))?;

        tracing::info!(schema = name, path = %schema.path.display(), "Created schema");

        if self.json {
            return print_json(schema);
        }

        println!("Schema '{}' created at {}", name, schema.path.display());
        println!();
        println!("Add it to your project config to keep it registered:");
        println!();
        println!("[[schemas]]");
        println!("name = {:?}", schema.name);
        println!("path = {:?}", schema.path.display().to_string());
        if !schema.dependencies.is_empty() {
            println!("dependencies = {:?}", schema.dependencies);
        }
        Ok(())
    }
}
