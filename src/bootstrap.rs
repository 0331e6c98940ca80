//! Startup registration of configured schemas.

use crate::config::Config;
use crate::registry::SchemaRegistry;

/// Registers every schema listed in `config`, in order.
///
/// Registration is best-effort: an entry that fails (duplicate name,
/// malformed path, dependency not registered yet) is skipped and described
/// in the returned warnings, and the remaining entries are still attempted.
/// Dependencies must therefore be listed before their dependents.
pub fn register_schemas(registry: &mut SchemaRegistry, config: &Config) -> Vec<String> {
    let mut warnings = Vec::new();

    for schema in &config.schemas {
        let path = config.schema_path(schema);
        if let Err(e) = registry.register(&schema.name, path, &schema.dependencies) {
            warnings.push(format!("Failed to register schema '{}': {}", schema.name, e));
        }
    }

    warnings
}

/// Builds a registry from `config`, logging each skipped entry.
pub fn registry_from_config(config: &Config) -> SchemaRegistry {
    let mut registry = SchemaRegistry::new();
    for warning in register_schemas(&mut registry, config) {
        tracing::warn!("{}", warning);
    }
    tracing::debug!(schemas = registry.len(), "Schema registry initialized");
    registry
}
