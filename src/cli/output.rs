//! Terminal output helpers shared by the command handlers.

use std::fmt;

use color_eyre::{eyre::eyre, Result};
use inquire::{Confirm, InquireError};
use serde::Serialize;

use crate::runner::{SchemaOutcome, SchemaStatus};

/// Plain-text table with left-aligned, padded columns.
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new<I, S>(headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            headers: headers.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    pub fn row<I, S>(&mut self, cells: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: ToString,
    {
        self.rows
            .push(cells.into_iter().map(|c| c.to_string()).collect());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn widths(&self) -> Vec<usize> {
        let mut widths: Vec<usize> = self.headers.iter().map(|h| h.chars().count()).collect();
        for row in &self.rows {
            for (i, cell) in row.iter().enumerate() {
                let len = cell.chars().count();
                match widths.get_mut(i) {
                    Some(w) => *w = (*w).max(len),
                    None => widths.push(len),
                }
            }
        }
        widths
    }
}

fn write_line(f: &mut fmt::Formatter<'_>, cells: &[String], widths: &[usize]) -> fmt::Result {
    let line = widths
        .iter()
        .enumerate()
        .map(|(i, w)| format!("{:<w$}", cells.get(i).map(String::as_str).unwrap_or(""), w = w))
        .collect::<Vec<_>>()
        .join("  ");
    writeln!(f, "{}", line.trim_end())
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let widths = self.widths();
        write_line(f, &self.headers, &widths)?;
        let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
        write_line(f, &rule, &widths)?;
        for row in &self.rows {
            write_line(f, row, &widths)?;
        }
        Ok(())
    }
}

/// Prints `value` as pretty JSON on stdout.
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Schema / Pending / Dependencies / Ready table.
pub fn status_table<'a>(statuses: impl IntoIterator<Item = &'a SchemaStatus>) -> Table {
    let mut table = Table::new(["Schema", "Pending", "Dependencies", "Ready"]);
    for status in statuses {
        table.row([
            status.schema.clone(),
            status.pending.len().to_string(),
            status.dependencies.join(", "),
            if status.can_run { "Yes" } else { "No" }.to_string(),
        ]);
    }
    table
}

/// Schema / Migration table of processed identifiers.
pub fn outcome_table(outcomes: &[SchemaOutcome]) -> Table {
    let mut table = Table::new(["Schema", "Migration"]);
    for outcome in outcomes {
        for migration in &outcome.migrations {
            table.row([outcome.schema.as_str(), migration.as_str()]);
        }
    }
    table
}

/// Prints processed identifiers, or "Nothing to <operation>." when empty.
pub fn print_outcomes(outcomes: &[SchemaOutcome], operation: &str, json: bool) -> Result<()> {
    if json {
        return print_json(outcomes);
    }
    let table = outcome_table(outcomes);
    if table.is_empty() {
        println!("Nothing to {}.", operation);
    } else {
        print!("{}", table);
    }
    Ok(())
}

/// Asks a yes/no question; defaults to no.
///
/// Escape or Ctrl-C declines. Without a terminal the prompt cannot be shown
/// and the caller has to pass `--force`.
pub fn confirm(message: &str) -> Result<bool> {
    match Confirm::new(message).with_default(false).prompt() {
        Ok(answer) => Ok(answer),
        Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => Ok(false),
        Err(InquireError::NotTTY) => Err(eyre!(
            "Cannot ask for confirmation without a terminal; pass --force to skip it"
        )),
        Err(e) => Err(eyre!("Failed to get confirmation: {}", e)),
    }
}

/// Question asked before a destructive operation, or `None` when there is
/// nothing to confirm.
fn operation_prompt(operation: &str, schemas: &[String]) -> Option<String> {
    if schemas.is_empty() {
        return None;
    }
    Some(format!(
        "Are you sure you want to {} the following schemas: {}?",
        operation,
        schemas.join(", ")
    ))
}

/// Confirmation prompt for a destructive operation over `schemas`.
pub fn confirm_operation(operation: &str, schemas: &[String]) -> Result<bool> {
    match operation_prompt(operation, schemas) {
        Some(message) => confirm(&message),
        None => Ok(true),
    }
}
