//! Schema registry: named migration namespaces and their dependencies.
//!
//! The registry is an explicitly constructed, process-scoped catalog. It is
//! rebuilt from configuration at startup (see [`crate::bootstrap`]) and
//! handed to the runner by reference; nothing here is global.
//!
//! Invariants kept by every mutation:
//! - a schema never depends on itself,
//! - every dependency names a registered schema,
//! - the dependency graph is acyclic (a failed `add_dependency` leaves the
//!   dependency list untouched).

mod graph;
mod path;

pub use graph::{find_cycle, topological_order, DependencyGraph, Edges};
pub use path::{validate_path, DISALLOWED_PATH_CHARS};

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::AppError;

/// A registered schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Schema {
    pub name: String,
    pub path: PathBuf,
    pub dependencies: Vec<String>,
}

/// In-memory catalog of schemas, kept in registration order.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    schemas: Vec<Schema>,
    index: HashMap<String, usize>,
}

impl SchemaRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a schema.
    ///
    /// Fails if the name is taken, the path is malformed, or a dependency
    /// is not registered yet. The directory is not created.
    pub fn register(
        &mut self,
        name: &str,
        path: impl Into<PathBuf>,
        dependencies: &[String],
    ) -> Result<(), AppError> {
        if self.exists(name) {
            return Err(AppError::SchemaAlreadyRegistered(name.to_string()));
        }

        let path = path.into();
        validate_path(&path)?;

        let mut deps: Vec<String> = Vec::with_capacity(dependencies.len());
        for dep in dependencies {
            if dep == name {
                return Err(AppError::SelfDependency(name.to_string()));
            }
            if !self.exists(dep) {
                return Err(AppError::DependencyNotRegistered(dep.clone()));
            }
            if !deps.contains(dep) {
                deps.push(dep.clone());
            }
        }

        tracing::debug!(schema = name, path = %path.display(), ?deps, "Registered schema");

        self.index.insert(name.to_string(), self.schemas.len());
        self.schemas.push(Schema {
            name: name.to_string(),
            path,
            dependencies: deps,
        });
        Ok(())
    }

    /// Whether `name` is registered.
    pub fn exists(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Looks up a schema; `None` when absent.
    pub fn get(&self, name: &str) -> Option<&Schema> {
        self.index.get(name).map(|&i| &self.schemas[i])
    }

    /// All schemas in registration order.
    pub fn list(&self) -> &[Schema] {
        &self.schemas
    }

    /// Registered schema names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.schemas.iter().map(|s| s.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    fn schema(&self, name: &str) -> Result<&Schema, AppError> {
        self.get(name)
            .ok_or_else(|| AppError::SchemaNotFound(name.to_string()))
    }

    fn schema_mut(&mut self, name: &str) -> Result<&mut Schema, AppError> {
        match self.index.get(name) {
            Some(&i) => Ok(&mut self.schemas[i]),
            None => Err(AppError::SchemaNotFound(name.to_string())),
        }
    }

    /// Direct dependencies of `name`.
    pub fn dependencies_of(&self, name: &str) -> Result<&[String], AppError> {
        Ok(&self.schema(name)?.dependencies)
    }

    /// Schemas that list `name` as a direct dependency.
    pub fn dependents_of(&self, name: &str) -> Vec<&str> {
        self.schemas
            .iter()
            .filter(|s| s.dependencies.iter().any(|d| d == name))
            .map(|s| s.name.as_str())
            .collect()
    }

    /// Migration directory of `name`.
    pub fn path(&self, name: &str) -> Result<&Path, AppError> {
        Ok(&self.schema(name)?.path)
    }

    /// Points `name` at a new migration directory after validating its shape.
    pub fn set_path(&mut self, name: &str, path: impl Into<PathBuf>) -> Result<(), AppError> {
        let path = path.into();
        let schema = self.schema_mut(name)?;
        validate_path(&path)?;
        schema.path = path;
        Ok(())
    }

    /// Whether the migration directory of `name` exists.
    pub fn path_exists(&self, name: &str) -> Result<bool, AppError> {
        Ok(self.path(name)?.is_dir())
    }

    /// Creates the migration directory of `name`, including parents.
    ///
    /// Succeeds without doing anything if the directory already exists.
    pub fn create_path(&self, name: &str) -> Result<(), AppError> {
        let path = self.path(name)?;
        if path.is_dir() {
            return Ok(());
        }

        match std::fs::create_dir_all(path) {
            Ok(()) => {
                tracing::info!(schema = name, path = %path.display(), "Created migration directory");
                Ok(())
            }
            // Lost a race with another creator.
            Err(_) if path.is_dir() => Ok(()),
            Err(source) => Err(AppError::PathCreation {
                path: path.display().to_string(),
                source,
            }),
        }
    }

    /// Checks that the schema's directory exists and all dependencies are
    /// registered. Cycles are checked by [`check_circular`](Self::check_circular).
    pub fn validate(&self, name: &str) -> Result<(), AppError> {
        let schema = self.schema(name)?;

        if !schema.path.is_dir() {
            return Err(AppError::PathNotFound(schema.path.display().to_string()));
        }

        self.ensure_dependencies_registered(schema)
    }

    /// Checks that all dependencies are registered and none form a cycle.
    pub fn validate_dependencies(&self, name: &str) -> Result<(), AppError> {
        let schema = self.schema(name)?;
        self.ensure_dependencies_registered(schema)?;
        self.check_circular(name)
    }

    fn ensure_dependencies_registered(&self, schema: &Schema) -> Result<(), AppError> {
        match schema.dependencies.iter().find(|d| !self.exists(d)) {
            Some(missing) => Err(AppError::DependencyNotRegistered(missing.clone())),
            None => Ok(()),
        }
    }

    /// Adds `dependency` to `name`.
    ///
    /// Adding an existing dependency is a no-op. If the new edge would close
    /// a cycle it is removed again before the error is returned.
    pub fn add_dependency(&mut self, name: &str, dependency: &str) -> Result<(), AppError> {
        if name == dependency {
            return Err(AppError::SelfDependency(name.to_string()));
        }
        if !self.exists(name) {
            return Err(AppError::SchemaNotFound(name.to_string()));
        }
        if !self.exists(dependency) {
            return Err(AppError::DependencyNotRegistered(dependency.to_string()));
        }

        let schema = self.schema_mut(name)?;
        if schema.dependencies.iter().any(|d| d == dependency) {
            return Ok(());
        }
        schema.dependencies.push(dependency.to_string());

        if let Err(err) = self.check_circular(name) {
            self.schema_mut(name)?.dependencies.pop();
            tracing::debug!(schema = name, dependency, "Rejected dependency: {}", err);
            return Err(err);
        }

        Ok(())
    }

    /// Removes `dependency` from `name`.
    pub fn remove_dependency(&mut self, name: &str, dependency: &str) -> Result<(), AppError> {
        let schema = self.schema_mut(name)?;
        match schema.dependencies.iter().position(|d| d == dependency) {
            Some(pos) => {
                schema.dependencies.remove(pos);
                Ok(())
            }
            None => Err(AppError::NotADependency {
                schema: name.to_string(),
                dependency: dependency.to_string(),
            }),
        }
    }

    /// Fails with the cycle path if a cycle is reachable from `name`.
    pub fn check_circular(&self, name: &str) -> Result<(), AppError> {
        let schema = self.schema(name)?;
        match find_cycle(self, &schema.name) {
            Some(path) => Err(AppError::CircularDependency { path }),
            None => Ok(()),
        }
    }

    /// Snapshot of every schema's dependency list.
    pub fn dependency_graph(&self) -> DependencyGraph {
        DependencyGraph::new(
            self.schemas
                .iter()
                .map(|s| (s.name.clone(), s.dependencies.clone()))
                .collect(),
        )
    }

    /// All schema names ordered dependencies-first.
    pub fn topological_order(&self) -> Vec<String> {
        topological_order(self, self.names())
    }
}

impl Edges for SchemaRegistry {
    fn dependencies(&self, node: &str) -> Option<&[String]> {
        self.get(node).map(|s| s.dependencies.as_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn deps(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    /// Registry with `c`, `b -> c`, `a -> b`, all under a temp dir.
    fn chain() -> (TempDir, SchemaRegistry) {
        let dir = TempDir::new().unwrap();
        let mut registry = SchemaRegistry::new();
        registry.register("c", dir.path().join("c"), &[]).unwrap();
        registry.register("b", dir.path().join("b"), &deps(&["c"])).unwrap();
        registry.register("a", dir.path().join("a"), &deps(&["b"])).unwrap();
        (dir, registry)
    }

    #[test]
    fn test_register_and_get() {
        let (dir, registry) = chain();
        let b = registry.get("b").unwrap();
        assert_eq!(b.name, "b");
        assert_eq!(b.path, dir.path().join("b"));
        assert_eq!(b.dependencies, deps(&["c"]));
        assert!(registry.get("missing").is_none());
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["c", "b", "a"]);
    }

    #[test]
    fn test_register_duplicate_fails() {
        let (dir, mut registry) = chain();
        let err = registry.register("a", dir.path().join("other"), &[]).unwrap_err();
        assert!(matches!(err, AppError::SchemaAlreadyRegistered(name) if name == "a"));
    }

    #[test]
    fn test_register_rejects_invalid_path() {
        let mut registry = SchemaRegistry::new();
        assert!(matches!(
            registry.register("s", "relative/dir", &[]),
            Err(AppError::InvalidPath { .. })
        ));
        assert!(matches!(
            registry.register("s", "", &[]),
            Err(AppError::InvalidPath { .. })
        ));
        assert!(matches!(
            registry.register("s", "/tmp/bad|name", &[]),
            Err(AppError::InvalidPath { .. })
        ));
        assert!(!registry.exists("s"));
    }

    #[test]
    fn test_register_does_not_create_directory() {
        let dir = TempDir::new().unwrap();
        let mut registry = SchemaRegistry::new();
        registry.register("s", dir.path().join("s"), &[]).unwrap();
        assert!(!registry.path_exists("s").unwrap());
    }

    #[test]
    fn test_register_rejects_unregistered_dependency() {
        let mut registry = SchemaRegistry::new();
        let err = registry
            .register("tenant", "/srv/tenant", &deps(&["public"]))
            .unwrap_err();
        assert!(matches!(err, AppError::DependencyNotRegistered(d) if d == "public"));
    }

    #[test]
    fn test_dependencies_of_unknown_schema_fails() {
        let registry = SchemaRegistry::new();
        assert!(matches!(
            registry.dependencies_of("nope"),
            Err(AppError::SchemaNotFound(_))
        ));
    }

    #[test]
    fn test_chain_has_no_cycles() {
        let (_dir, registry) = chain();
        for name in ["a", "b", "c"] {
            registry.check_circular(name).unwrap();
        }
    }

    #[test]
    fn test_add_dependency_closing_cycle_is_reverted() {
        let (_dir, mut registry) = chain();
        let before = registry.dependencies_of("c").unwrap().to_vec();

        let err = registry.add_dependency("c", "a").unwrap_err();
        match err {
            AppError::CircularDependency { path } => {
                assert_eq!(path, deps(&["c", "a", "b", "c"]));
            }
            other => panic!("expected CircularDependency, got {other:?}"),
        }

        assert_eq!(registry.dependencies_of("c").unwrap(), before.as_slice());
        registry.check_circular("c").unwrap();
    }

    #[test]
    fn test_add_self_dependency_always_fails() {
        let (_dir, mut registry) = chain();
        assert!(matches!(
            registry.add_dependency("a", "a"),
            Err(AppError::SelfDependency(_))
        ));
        assert!(matches!(
            registry.add_dependency("x", "x"),
            Err(AppError::SelfDependency(_))
        ));
    }

    #[test]
    fn test_add_dependency_requires_both_schemas() {
        let (_dir, mut registry) = chain();
        assert!(matches!(
            registry.add_dependency("missing", "a"),
            Err(AppError::SchemaNotFound(_))
        ));
        assert!(matches!(
            registry.add_dependency("a", "missing"),
            Err(AppError::DependencyNotRegistered(_))
        ));
    }

    #[test]
    fn test_add_existing_dependency_is_noop() {
        let (_dir, mut registry) = chain();
        registry.add_dependency("a", "b").unwrap();
        assert_eq!(registry.dependencies_of("a").unwrap(), deps(&["b"]).as_slice());
        registry.add_dependency("a", "c").unwrap();
        assert_eq!(
            registry.dependencies_of("a").unwrap(),
            deps(&["b", "c"]).as_slice()
        );
    }

    #[test]
    fn test_remove_dependency() {
        let (_dir, mut registry) = chain();
        registry.remove_dependency("a", "b").unwrap();
        assert!(registry.dependencies_of("a").unwrap().is_empty());

        let err = registry.remove_dependency("a", "b").unwrap_err();
        assert!(matches!(err, AppError::NotADependency { .. }));
    }

    #[test]
    fn test_validate_requires_existing_path() {
        let (dir, registry) = chain();
        assert!(matches!(registry.validate("c"), Err(AppError::PathNotFound(_))));

        std::fs::create_dir_all(dir.path().join("c")).unwrap();
        registry.validate("c").unwrap();
    }

    #[test]
    fn test_create_path_is_idempotent() {
        let (dir, registry) = chain();
        registry.create_path("a").unwrap();
        assert!(dir.path().join("a").is_dir());
        registry.create_path("a").unwrap();
        assert!(registry.path_exists("a").unwrap());
    }

    #[test]
    fn test_create_path_for_unknown_schema_fails() {
        let registry = SchemaRegistry::new();
        assert!(matches!(
            registry.create_path("nope"),
            Err(AppError::SchemaNotFound(_))
        ));
    }

    #[test]
    fn test_set_path_validates_shape() {
        let (_dir, mut registry) = chain();
        registry.set_path("a", "/srv/elsewhere").unwrap();
        assert_eq!(registry.path("a").unwrap(), Path::new("/srv/elsewhere"));

        assert!(matches!(
            registry.set_path("a", "not/absolute"),
            Err(AppError::InvalidPath { .. })
        ));
        assert_eq!(registry.path("a").unwrap(), Path::new("/srv/elsewhere"));
        assert!(matches!(
            registry.set_path("missing", "/srv/x"),
            Err(AppError::SchemaNotFound(_))
        ));
    }

    #[test]
    fn test_dependency_graph_and_dependents() {
        let (_dir, registry) = chain();
        let graph = registry.dependency_graph();
        assert_eq!(graph.len(), 3);
        assert_eq!(graph.dependencies("a"), Some(deps(&["b"]).as_slice()));
        assert_eq!(registry.dependents_of("c"), vec!["b"]);
        assert!(registry.dependents_of("a").is_empty());
        assert_eq!(registry.topological_order(), deps(&["c", "b", "a"]));
    }

    #[test]
    fn test_validate_dependencies_runs_cycle_check() {
        let (_dir, registry) = chain();
        registry.validate_dependencies("a").unwrap();
        assert!(matches!(
            registry.validate_dependencies("zzz"),
            Err(AppError::SchemaNotFound(_))
        ));
    }
}
