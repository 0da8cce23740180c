use std::collections::BTreeSet;

use thiserror::Error;

use crate::{
    data::{Value, parse_naive_date},
    reconcile::AliasBinding,
    table::Table,
};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FilterError {
    /// Configuration error: the canonical name was never bound, so no stage
    /// may reference it.
    #[error("column '{0}' is not bound to a raw column")]
    Unbound(String),
    #[error("range bound '{value}' is not a valid {expected} for column '{column}'")]
    BadBound {
        column: String,
        value: String,
        expected: &'static str,
    },
    #[error("column '{0}' holds neither dates nor years; range filtering needs an ordinal column")]
    NotOrdinal(String),
}

/// Outcome of an equality filter. An unknown value is not an error: the
/// caller gets the column's realized domain back so it can re-prompt.
#[derive(Debug, Clone, PartialEq)]
pub enum EqualsOutcome {
    Rows(Table),
    UnknownValue { valid: BTreeSet<String> },
}

/// Keeps the rows whose canonical column displays exactly `value` (after
/// trimming the probe). Null cells realize as the empty string, so every row
/// belongs to exactly one equality bucket and the distinct-value partition
/// reconstructs the table.
pub fn filter_equals(
    table: &Table,
    binding: &AliasBinding,
    target: &str,
    value: &str,
) -> Result<EqualsOutcome, FilterError> {
    let column = binding
        .get(target)
        .ok_or_else(|| FilterError::Unbound(target.to_string()))?;
    let needle = value.trim();

    let mut valid = BTreeSet::new();
    let mut hits = Vec::new();
    for row in 0..table.row_count() {
        let display = table.display_cell(row, column.raw_index);
        if display == needle {
            hits.push(row);
        }
        valid.insert(display);
    }

    if !valid.contains(needle) {
        return Ok(EqualsOutcome::UnknownValue { valid });
    }
    Ok(EqualsOutcome::Rows(table.subset(&hits)))
}

/// Keeps the rows whose ordinal canonical column falls within the inclusive
/// `[start, end]` range. Bounds are coerced to the column's realized type
/// (Date or Integer year). An inverted range yields an empty table.
pub fn filter_range(
    table: &Table,
    binding: &AliasBinding,
    target: &str,
    start: &str,
    end: &str,
) -> Result<Table, FilterError> {
    let column = binding
        .get(target)
        .ok_or_else(|| FilterError::Unbound(target.to_string()))?;

    let Some(ordinal) = realized_ordinal(table, column.raw_index) else {
        // no non-null cells: nothing can fall inside any range
        if table
            .column_values(column.raw_index)
            .all(|cell| cell.is_none())
        {
            return Ok(table.subset(&[]));
        }
        return Err(FilterError::NotOrdinal(target.to_string()));
    };

    let start = parse_bound(target, start, ordinal)?;
    let end = parse_bound(target, end, ordinal)?;

    let mut hits = Vec::new();
    for (row_idx, row) in table.rows().iter().enumerate() {
        if let Some(Some(value)) = row.get(column.raw_index)
            && matches_ordinal(value, ordinal)
            && *value >= start
            && *value <= end
        {
            hits.push(row_idx);
        }
    }
    Ok(table.subset(&hits))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OrdinalKind {
    Year,
    Date,
}

fn realized_ordinal(table: &Table, column: usize) -> Option<OrdinalKind> {
    for cell in table.column_values(column) {
        match cell {
            Some(Value::Integer(_)) => return Some(OrdinalKind::Year),
            Some(Value::Date(_)) => return Some(OrdinalKind::Date),
            Some(Value::Float(_)) | Some(Value::String(_)) => return None,
            None => {}
        }
    }
    None
}

fn matches_ordinal(value: &Value, ordinal: OrdinalKind) -> bool {
    matches!(
        (value, ordinal),
        (Value::Integer(_), OrdinalKind::Year) | (Value::Date(_), OrdinalKind::Date)
    )
}

fn parse_bound(column: &str, raw: &str, ordinal: OrdinalKind) -> Result<Value, FilterError> {
    let trimmed = raw.trim();
    match ordinal {
        OrdinalKind::Year => trimmed
            .parse::<i64>()
            .map(Value::Integer)
            .map_err(|_| FilterError::BadBound {
                column: column.to_string(),
                value: raw.to_string(),
                expected: "year",
            }),
        OrdinalKind::Date => parse_naive_date(trimmed)
            .map(Value::Date)
            .map_err(|_| FilterError::BadBound {
                column: column.to_string(),
                value: raw.to_string(),
                expected: "date",
            }),
    }
}
