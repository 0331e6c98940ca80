//! Application error types.

use thiserror::Error;

/// Application-level errors for Strata.
#[derive(Error, Debug)]
pub enum AppError {
    // Configuration errors
    #[error("Schema '{0}' is not registered.")]
    SchemaNotFound(String),

    #[error("Schema '{0}' is already registered.")]
    SchemaAlreadyRegistered(String),

    #[error("Invalid path '{path}': {reason}")]
    InvalidPath { path: String, reason: &'static str },

    #[error("Schema path '{0}' does not exist.")]
    PathNotFound(String),

    #[error("Failed to create path '{path}': {source}")]
    PathCreation {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Dependency schema '{0}' is not registered.")]
    DependencyNotRegistered(String),

    #[error("Schema '{0}' cannot depend on itself.")]
    SelfDependency(String),

    #[error("Schema '{schema}' does not depend on '{dependency}'.")]
    NotADependency { schema: String, dependency: String },

    // Dependency errors
    #[error("Circular dependency detected: {}", .path.join(" -> "))]
    CircularDependency { path: Vec<String> },

    #[error("Schema '{0}' has unsatisfied dependencies.")]
    UnsatisfiedDependencies(String),

    #[error("Schema '{schema}' depends on '{dependency}' which has pending migrations.")]
    DependencyUnsatisfied { schema: String, dependency: String },

    // Execution errors
    #[error("Migration '{migration}' failed: {message}")]
    Execution { migration: String, message: String },

    // Ledger errors
    #[error("Migration '{migration}' is already recorded for schema '{schema}'")]
    DuplicateRecord { schema: String, migration: String },

    #[error("Ledger error: {0}")]
    Ledger(String),

    // Infrastructure errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] tokio_postgres::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// True for errors caused by invalid input that the caller must fix.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            AppError::SchemaNotFound(_)
                | AppError::SchemaAlreadyRegistered(_)
                | AppError::InvalidPath { .. }
                | AppError::PathNotFound(_)
                | AppError::PathCreation { .. }
                | AppError::DependencyNotRegistered(_)
                | AppError::SelfDependency(_)
                | AppError::NotADependency { .. }
                | AppError::Config(_)
        )
    }

    /// True when a dependency still has pending migrations.
    pub fn is_dependency_unsatisfied(&self) -> bool {
        matches!(
            self,
            AppError::UnsatisfiedDependencies(_) | AppError::DependencyUnsatisfied { .. }
        )
    }

    pub(crate) fn execution(migration: impl Into<String>, message: impl ToString) -> Self {
        AppError::Execution {
            migration: migration.into(),
            message: message.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_circular_dependency_renders_path() {
        let err = AppError::CircularDependency {
            path: vec!["a".into(), "b".into(), "c".into(), "a".into()],
        };
        assert_eq!(
            err.to_string(),
            "Circular dependency detected: a -> b -> c -> a"
        );
    }

    #[test]
    fn test_dependency_unsatisfied_names_both_schemas() {
        let err = AppError::DependencyUnsatisfied {
            schema: "tenant".into(),
            dependency: "public".into(),
        };
        assert_eq!(
            err.to_string(),
            "Schema 'tenant' depends on 'public' which has pending migrations."
        );
        assert!(err.is_dependency_unsatisfied());
        assert!(!err.is_configuration());
    }

    #[test]
    fn test_configuration_classification() {
        assert!(AppError::SchemaNotFound("x".into()).is_configuration());
        assert!(AppError::SelfDependency("x".into()).is_configuration());
        assert!(!AppError::execution("m1.sql", "boom").is_configuration());
    }
}
