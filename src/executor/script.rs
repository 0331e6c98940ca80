//! Migration file format.
//!
//! A migration is a plain SQL file split into sections by marker comments:
//!
//! ```sql
//! -- strata:up
//! CREATE TABLE users (id BIGSERIAL PRIMARY KEY);
//!
//! -- strata:down
//! DROP TABLE users;
//! ```
//!
//! A file without markers is treated as one `up` section.

use std::path::Path;

use crate::error::AppError;

pub const UP_MARKER: &str = "-- strata:up";
pub const DOWN_MARKER: &str = "-- strata:down";

/// Direction a migration is executed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Up => "up",
            Direction::Down => "down",
        }
    }
}

/// Parsed migration file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationScript {
    pub up: String,
    pub down: Option<String>,
}

impl MigrationScript {
    pub fn parse(source: &str) -> Self {
        let mut up = String::new();
        let mut down: Option<String> = None;
        let mut section = Direction::Up;

        for line in source.lines() {
            match line.trim() {
                UP_MARKER => section = Direction::Up,
                DOWN_MARKER => {
                    section = Direction::Down;
                    down.get_or_insert_with(String::new);
                }
                _ => {
                    let target = match section {
                        Direction::Up => &mut up,
                        Direction::Down => down.get_or_insert_with(String::new),
                    };
                    target.push_str(line);
                    target.push('\n');
                }
            }
        }

        Self {
            up: up.trim().to_string(),
            down: down.map(|d| d.trim().to_string()),
        }
    }

    /// Reads and parses the migration at `path`.
    pub async fn load(path: &Path) -> Result<Self, AppError> {
        let source = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| AppError::execution(path.display().to_string(), e))?;
        Ok(Self::parse(&source))
    }

    /// SQL for `direction`.
    ///
    /// Reverting a migration without a `down` section is an error; an empty
    /// `up` section is allowed and runs nothing.
    pub fn section(&self, direction: Direction, migration: &str) -> Result<&str, AppError> {
        match direction {
            Direction::Up => Ok(&self.up),
            Direction::Down => match self.down.as_deref() {
                Some(sql) if !sql.is_empty() => Ok(sql),
                _ => Err(AppError::execution(migration, "migration has no down section")),
            },
        }
    }
}

/// Splits a section into statements for display.
///
/// Statements end at a `;` closing a line. Comment-only lines are dropped.
/// This is only used when simulating; real execution sends the section as
/// one batch.
pub fn statements(sql: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();

    for line in sql.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with("--") {
            continue;
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(trimmed);
        if trimmed.ends_with(';') {
            out.push(std::mem::take(&mut current));
        }
    }

    if !current.is_empty() {
        out.push(current);
    }
    out
}
