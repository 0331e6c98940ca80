//! Validate command handler.

use color_eyre::{eyre::eyre, Result};
use serde::Serialize;

use crate::context::Context;
use crate::error::AppError;
use crate::registry::SchemaRegistry;

use super::output::print_json;
use super::App;

#[derive(Debug, Serialize)]
struct Check {
    check: &'static str,
    passed: bool,
    message: String,
}

#[derive(Debug, Serialize)]
struct SchemaReport {
    schema: String,
    valid: bool,
    checks: Vec<Check>,
}

fn check(name: &'static str, result: Result<(), AppError>, ok: &str) -> Check {
    match result {
        Ok(()) => Check {
            check: name,
            passed: true,
            message: ok.to_string(),
        },
        Err(e) => Check {
            check: name,
            passed: false,
            message: e.to_string(),
        },
    }
}

/// Runs every registry check against `name`.
///
/// A missing directory fails the configuration check; the path check only
/// repeats it in a friendlier form.
fn validate_schema(registry: &SchemaRegistry, name: &str) -> SchemaReport {
    let path_check = match registry.path_exists(name) {
        Ok(true) => Check {
            check: "path",
            passed: true,
            message: "Migration path exists and is accessible".to_string(),
        },
        Ok(false) => Check {
            check: "path",
            passed: false,
            message: "Migration path does not exist".to_string(),
        },
        Err(e) => Check {
            check: "path",
            passed: false,
            message: e.to_string(),
        },
    };

    let checks = vec![
        check(
            "configuration",
            registry.validate(name),
            "Basic configuration is valid",
        ),
        check(
            "dependencies",
            registry.validate_dependencies(name),
            "Dependencies are valid",
        ),
        check(
            "circular",
            registry.check_circular(name),
            "No circular dependencies detected",
        ),
        path_check,
    ];

    SchemaReport {
        schema: name.to_string(),
        valid: checks.iter().all(|c| c.passed),
        checks,
    }
}

impl App {
    /// Validate one schema, or every registered schema.
    pub fn run_validate(&self, ctx: &Context, name: Option<&str>) -> Result<()> {
        let registry = &ctx.registry;

        let names: Vec<String> = match name {
            Some(name) => {
                if !registry.exists(name) {
                    return Err(AppError::SchemaNotFound(name.to_string()).into());
                }
                vec![name.to_string()]
            }
            None => registry.names().map(str::to_string).collect(),
        };

        let reports: Vec<SchemaReport> = names
            .iter()
            .map(|n| validate_schema(registry, n))
            .collect();

        if self.json {
            print_json(&reports)?;
        } else if reports.is_empty() {
            println!("No schemas are currently registered.");
        } else {
            for report in &reports {
                println!("Validating schema: {}", report.schema);
                for check in &report.checks {
                    let mark = if check.passed { "✓" } else { "✗" };
                    println!("  {} {}", mark, check.message);
                }
            }
        }

        let failed: Vec<&str> = reports
            .iter()
            .filter(|r| !r.valid)
            .map(|r| r.schema.as_str())
            .collect();

        if failed.is_empty() {
            if !self.json && !reports.is_empty() {
                println!("All schemas validated successfully.");
            }
            Ok(())
        } else {
            Err(eyre!("Validation failed for: {}", failed.join(", ")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_existing_schema_passes_every_check() {
        let dir = TempDir::new().unwrap();
        let mut registry = SchemaRegistry::new();
        registry.register("public", dir.path(), &[]).unwrap();

        let report = validate_schema(&registry, "public");
        assert!(report.valid);
        assert_eq!(report.checks.len(), 4);
    }

    #[test]
    fn test_missing_directory_fails() {
        let dir = TempDir::new().unwrap();
        let mut registry = SchemaRegistry::new();
        registry
            .register("public", dir.path().join("missing"), &[])
            .unwrap();

        let report = validate_schema(&registry, "public");
        assert!(!report.valid);
        let failed: Vec<_> = report
            .checks
            .iter()
            .filter(|c| !c.passed)
            .map(|c| c.check)
            .collect();
        assert_eq!(failed, vec!["configuration", "path"]);
    }
}
