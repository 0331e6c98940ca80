//! Finds migration files on disk.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::AppError;

/// Discovers migration identifiers under `<root>/<schema>/*.<extension>`,
/// or under the directory bound to a schema with [`Self::bind`].
#[derive(Debug, Clone)]
pub struct MigrationDiscovery {
    root: PathBuf,
    extension: String,
    dirs: HashMap<String, PathBuf>,
}

impl MigrationDiscovery {
    pub fn new(root: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        let extension = extension.into();
        Self {
            root: root.into(),
            extension: extension.trim_start_matches('.').to_string(),
            dirs: HashMap::new(),
        }
    }

    /// Scans `dir` instead of `<root>/<schema>` for `schema`.
    pub fn bind(&mut self, schema: impl Into<String>, dir: impl Into<PathBuf>) {
        self.dirs.insert(schema.into(), dir.into());
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Directory scanned for `schema`.
    pub fn schema_dir(&self, schema: &str) -> PathBuf {
        match self.dirs.get(schema) {
            Some(dir) => dir.clone(),
            None => self.root.join(schema),
        }
    }

    /// File names of every migration of `schema`, ascending.
    ///
    /// A missing directory yields no migrations. Subdirectories and files
    /// with another extension are ignored.
    pub async fn discover(&self, schema: &str) -> Result<Vec<String>, AppError> {
        let dir = self.schema_dir(schema);
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut found = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(self.extension.as_str()) {
                continue;
            }
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                found.push(name.to_string());
            }
        }

        found.sort();
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_discovers_sorted_files_with_extension() {
        let dir = TempDir::new().unwrap();
        let schema_dir = dir.path().join("public");
        std::fs::create_dir_all(schema_dir.join("nested")).unwrap();
        for name in ["2025_02_000002.sql", "2025_02_000001.sql", "README.md"] {
            std::fs::write(schema_dir.join(name), "").unwrap();
        }
        std::fs::write(schema_dir.join("nested").join("2025_01_x.sql"), "").unwrap();

        let discovery = MigrationDiscovery::new(dir.path(), ".sql");
        assert_eq!(discovery.extension(), "sql");
        assert_eq!(
            discovery.discover("public").await.unwrap(),
            vec!["2025_02_000001.sql", "2025_02_000002.sql"]
        );
    }

    #[tokio::test]
    async fn test_missing_directory_has_no_migrations() {
        let dir = TempDir::new().unwrap();
        let discovery = MigrationDiscovery::new(dir.path(), "sql");
        assert!(discovery.discover("ghost").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_bound_directory_replaces_root() {
        let root = TempDir::new().unwrap();
        let elsewhere = TempDir::new().unwrap();
        std::fs::create_dir_all(root.path().join("tenant")).unwrap();
        std::fs::write(root.path().join("tenant").join("stale.sql"), "").unwrap();
        std::fs::write(elsewhere.path().join("0001.sql"), "").unwrap();

        let mut discovery = MigrationDiscovery::new(root.path(), "sql");
        discovery.bind("tenant", elsewhere.path());

        assert_eq!(discovery.schema_dir("tenant"), elsewhere.path().to_path_buf());
        assert_eq!(discovery.schema_dir("public"), root.path().join("public"));
        assert_eq!(discovery.discover("tenant").await.unwrap(), vec!["0001.sql"]);
    }
}
