//! Per-column normalization of a reconciled table.
//!
//! Cleaning never fails as a whole: every problem is column-scoped, recorded
//! as a [`ColumnWarning`], and the pass moves on to the next column. Re-running
//! the cleaner over an already-clean table is a no-op.

use std::sync::OnceLock;

use log::debug;
use regex::Regex;
use thiserror::Error;

use crate::{
    data::{Value, parse_naive_date, parse_number},
    reconcile::{AliasBinding, BoundColumn},
    schema::ColumnKind,
    table::Table,
    transform::string_ops,
};

/// A column-scoped cleaning problem: recovered locally, never fatal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("column '{column}' (raw '{raw_name}'): {cause}")]
pub struct ColumnWarning {
    pub column: String,
    pub raw_name: String,
    pub cause: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleaningReport {
    pub warnings: Vec<ColumnWarning>,
}

impl CleaningReport {
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}

fn year_pattern() -> &'static Regex {
    static YEAR_RE: OnceLock<Regex> = OnceLock::new();
    YEAR_RE.get_or_init(|| Regex::new(r"^\d{4}$").expect("static year pattern"))
}

/// Normalizes every bound column of `table` in place according to its
/// canonical kind, and returns the per-column warnings.
pub fn clean(table: &mut Table, binding: &AliasBinding) -> CleaningReport {
    let mut report = CleaningReport::default();
    for column in binding.bound() {
        let warning = match column.kind {
            ColumnKind::Text => clean_text_column(table, column),
            ColumnKind::Numeric => clean_numeric_column(table, column),
            ColumnKind::Temporal => clean_temporal_column(table, column),
        };
        if let Some(warning) = warning {
            debug!("cleaning warning: {warning}");
            report.warnings.push(warning);
        }
    }
    report
}

fn clean_text_column(table: &mut Table, column: &BoundColumn) -> Option<ColumnWarning> {
    for row in 0..table.row_count() {
        let Some(cell) = table.cell_mut(row, column.raw_index) else {
            continue;
        };
        if let Some(Value::String(raw)) = cell {
            let trimmed = string_ops::trim(raw);
            if trimmed.is_empty() {
                *cell = None;
                continue;
            }
            let cased = string_ops::title_case(trimmed.as_ref()).into_owned();
            *cell = Some(Value::String(cased));
        }
    }
    None
}

fn clean_numeric_column(table: &mut Table, column: &BoundColumn) -> Option<ColumnWarning> {
    let mut failures = 0usize;
    let mut example: Option<String> = None;
    for row in 0..table.row_count() {
        let Some(cell) = table.cell_mut(row, column.raw_index) else {
            continue;
        };
        match cell {
            Some(Value::String(raw)) => {
                let trimmed = raw.trim();
                if trimmed.is_empty() {
                    *cell = None;
                    continue;
                }
                match parse_number(trimmed) {
                    Ok(value) => *cell = Some(value),
                    Err(_) => {
                        failures += 1;
                        example.get_or_insert_with(|| trimmed.to_string());
                        *cell = None;
                    }
                }
            }
            Some(Value::Date(date)) => {
                failures += 1;
                example.get_or_insert_with(|| date.to_string());
                *cell = None;
            }
            Some(Value::Integer(_)) | Some(Value::Float(_)) | None => {}
        }
    }
    coercion_warning(column, failures, example, "number")
}

fn clean_temporal_column(table: &mut Table, column: &BoundColumn) -> Option<ColumnWarning> {
    // A column is year-only iff every non-null value looks like a 4-digit
    // year; a single full date switches the whole column to date coercion.
    let mut year_only = true;
    let mut has_values = false;
    for cell in table.column_values(column.raw_index) {
        match cell {
            Some(Value::String(raw)) => {
                has_values = true;
                if !year_pattern().is_match(raw.trim()) {
                    year_only = false;
                }
            }
            Some(Value::Integer(_)) => has_values = true,
            Some(Value::Float(_)) | Some(Value::Date(_)) => {
                has_values = true;
                year_only = false;
            }
            None => {}
        }
    }
    if !has_values {
        return None;
    }

    let mut failures = 0usize;
    let mut example: Option<String> = None;
    for row in 0..table.row_count() {
        let Some(cell) = table.cell_mut(row, column.raw_index) else {
            continue;
        };
        match cell {
            Some(Value::String(raw)) => {
                let trimmed = raw.trim();
                if trimmed.is_empty() {
                    *cell = None;
                    continue;
                }
                let coerced = if year_only {
                    trimmed.parse::<i64>().ok().map(Value::Integer)
                } else {
                    parse_naive_date(trimmed).ok().map(Value::Date)
                };
                match coerced {
                    Some(value) => *cell = Some(value),
                    None => {
                        failures += 1;
                        example.get_or_insert_with(|| trimmed.to_string());
                        *cell = None;
                    }
                }
            }
            Some(Value::Integer(_)) if year_only => {}
            Some(Value::Integer(year)) => {
                // a bare year stranded in a full-date column
                failures += 1;
                example.get_or_insert_with(|| year.to_string());
                *cell = None;
            }
            Some(Value::Float(value)) => {
                failures += 1;
                example.get_or_insert_with(|| value.to_string());
                *cell = None;
            }
            Some(Value::Date(_)) | None => {}
        }
    }
    let expected = if year_only { "4-digit year" } else { "date" };
    coercion_warning(column, failures, example, expected)
}

fn coercion_warning(
    column: &BoundColumn,
    failures: usize,
    example: Option<String>,
    expected: &str,
) -> Option<ColumnWarning> {
    if failures == 0 {
        return None;
    }
    let example = example.unwrap_or_default();
    Some(ColumnWarning {
        column: column.target.clone(),
        raw_name: column.raw_name.clone(),
        cause: format!(
            "{failures} value(s) could not be coerced to a {expected} (e.g. '{example}'); set to null"
        ),
    })
}
