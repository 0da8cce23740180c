//! Grouped reductions and ranked views over a cleaned table.
//!
//! Grouping keys and the optional measure are addressed by canonical name
//! through the alias binding; asking for an unbound name is a configuration
//! error, never a data error. Result rows are sorted descending by reduced
//! value with first-encountered group order breaking ties.

use std::cmp::Ordering;
use std::collections::HashMap;

use itertools::Itertools;
use serde::Serialize;
use thiserror::Error;

use crate::{
    data::{Value, format_number},
    reconcile::AliasBinding,
    table::Table,
};

/// Closed set of reductions. `Size` always counts rows per group; `Count`
/// counts non-null measure values when a measure is named, rows otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Reducer {
    Mean,
    Sum,
    Count,
    Size,
}

impl Reducer {
    pub fn as_str(&self) -> &'static str {
        match self {
            Reducer::Mean => "mean",
            Reducer::Sum => "sum",
            Reducer::Count => "count",
            Reducer::Size => "size",
        }
    }

    fn needs_measure(&self) -> bool {
        matches!(self, Reducer::Mean | Reducer::Sum)
    }
}

/// A grouping key: either a canonical column as-is, or the derived period
/// (year-month for dates, bare year for year columns) computed from one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupKey {
    Column(String),
    Period(String),
}

impl GroupKey {
    fn target(&self) -> &str {
        match self {
            GroupKey::Column(name) | GroupKey::Period(name) => name,
        }
    }

    fn label(&self) -> String {
        match self {
            GroupKey::Column(name) => name.clone(),
            GroupKey::Period(name) => format!("{name} (period)"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AggregateSpec {
    pub group_keys: Vec<GroupKey>,
    pub measure: Option<String>,
    pub reducer: Reducer,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AggregateError {
    #[error("column '{0}' is not bound to a raw column")]
    Unbound(String),
    #[error("reducer '{}' requires a measure column", .0.as_str())]
    MissingMeasure(Reducer),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultRow {
    pub key: Vec<String>,
    pub value: f64,
}

/// Ordered aggregation output: one row per group, sorted per the engine's
/// ranking rules. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultTable {
    pub key_columns: Vec<String>,
    pub reducer: Reducer,
    rows: Vec<ResultRow>,
}

impl ResultTable {
    pub fn rows(&self) -> &[ResultRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The first `n` rows of the already-sorted result; all rows when `n`
    /// exceeds the count.
    pub fn top_n(&self, n: usize) -> ResultTable {
        ResultTable {
            key_columns: self.key_columns.clone(),
            reducer: self.reducer,
            rows: self.rows.iter().take(n).cloned().collect(),
        }
    }

    pub fn display_rows(&self) -> Vec<Vec<String>> {
        self.rows
            .iter()
            .map(|row| {
                let mut cells = row.key.clone();
                cells.push(format_number(row.value));
                cells
            })
            .collect()
    }
}

struct GroupAccumulator {
    key: Vec<String>,
    rows: usize,
    non_null: usize,
    sum: f64,
}

pub fn aggregate(
    table: &Table,
    binding: &AliasBinding,
    spec: &AggregateSpec,
) -> Result<ResultTable, AggregateError> {
    let key_indices = spec
        .group_keys
        .iter()
        .map(|key| {
            binding
                .raw_index(key.target())
                .ok_or_else(|| AggregateError::Unbound(key.target().to_string()))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let measure_index = match &spec.measure {
        Some(name) => Some(
            binding
                .raw_index(name)
                .ok_or_else(|| AggregateError::Unbound(name.clone()))?,
        ),
        None => {
            if spec.reducer.needs_measure() {
                return Err(AggregateError::MissingMeasure(spec.reducer));
            }
            None
        }
    };

    let mut order: Vec<GroupAccumulator> = Vec::new();
    let mut lookup: HashMap<Vec<String>, usize> = HashMap::new();

    for row in table.rows() {
        let key = spec
            .group_keys
            .iter()
            .zip(&key_indices)
            .map(|(group_key, idx)| key_cell(group_key, row.get(*idx).and_then(|c| c.as_ref())))
            .collect::<Vec<_>>();

        let slot = *lookup.entry(key.clone()).or_insert_with(|| {
            order.push(GroupAccumulator {
                key,
                rows: 0,
                non_null: 0,
                sum: 0.0,
            });
            order.len() - 1
        });
        let group = &mut order[slot];
        group.rows += 1;
        if let Some(idx) = measure_index
            && let Some(Some(value)) = row.get(idx)
            && let Some(numeric) = value.as_number()
        {
            group.non_null += 1;
            group.sum += numeric;
        }
    }

    let reducer = spec.reducer;
    let rows = order
        .into_iter()
        .map(|group| ResultRow {
            value: reduce(&group, reducer, measure_index.is_some()),
            key: group.key,
        })
        .sorted_by(|a, b| compare_descending(a.value, b.value))
        .collect::<Vec<_>>();

    Ok(ResultTable {
        key_columns: spec.group_keys.iter().map(GroupKey::label).collect(),
        reducer,
        rows,
    })
}

fn reduce(group: &GroupAccumulator, reducer: Reducer, has_measure: bool) -> f64 {
    match reducer {
        Reducer::Size => group.rows as f64,
        Reducer::Count => {
            if has_measure {
                group.non_null as f64
            } else {
                group.rows as f64
            }
        }
        Reducer::Sum => group.sum,
        Reducer::Mean => {
            if group.non_null > 0 {
                group.sum / group.non_null as f64
            } else {
                f64::NAN
            }
        }
    }
}

/// Descending by value; groups with no reducible values (NaN) sink to the
/// bottom. The surrounding sort is stable, so ties keep first-encounter
/// order.
fn compare_descending(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => b.total_cmp(&a),
    }
}

fn key_cell(group_key: &GroupKey, cell: Option<&Value>) -> String {
    match group_key {
        GroupKey::Column(_) => cell.map(|v| v.as_display()).unwrap_or_default(),
        GroupKey::Period(_) => match cell {
            Some(Value::Date(date)) => date.format("%Y-%m").to_string(),
            Some(Value::Integer(year)) => year.to_string(),
            _ => String::new(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        reconcile::{BindingMode, reconcile},
        schema::{CanonicalColumn, CanonicalSchema, ColumnKind},
    };
    use chrono::NaiveDate;

    fn string_cell(value: &str) -> Option<Value> {
        Some(Value::String(value.to_string()))
    }

    fn rated_table() -> (Table, AliasBinding) {
        let table = Table::new(
            vec!["genre".to_string(), "rating".to_string()],
            vec![
                vec![string_cell("Drama"), Some(Value::Integer(5))],
                vec![string_cell("Drama"), None],
                vec![string_cell("Drama"), Some(Value::Integer(10))],
                vec![string_cell("Action"), Some(Value::Integer(6))],
            ],
        )
        .expect("table");
        let schema = CanonicalSchema::new(vec![
            CanonicalColumn::new("Genre", ColumnKind::Text),
            CanonicalColumn::new("Rating", ColumnKind::Numeric),
        ])
        .expect("schema");
        let binding =
            reconcile(table.headers(), &schema, 80, BindingMode::Total).expect("binding");
        (table, binding)
    }

    fn spec(keys: Vec<GroupKey>, measure: Option<&str>, reducer: Reducer) -> AggregateSpec {
        AggregateSpec {
            group_keys: keys,
            measure: measure.map(|m| m.to_string()),
            reducer,
        }
    }

    #[test]
    fn mean_skips_nulls_in_numerator_and_denominator() {
        let (table, binding) = rated_table();
        let result = aggregate(
            &table,
            &binding,
            &spec(
                vec![GroupKey::Column("Genre".to_string())],
                Some("Rating"),
                Reducer::Mean,
            ),
        )
        .expect("result");
        let drama = result
            .rows()
            .iter()
            .find(|r| r.key == vec!["Drama".to_string()])
            .expect("drama group");
        assert_eq!(drama.value, 7.5);
    }

    #[test]
    fn count_is_non_null_and_size_is_row_count() {
        let (table, binding) = rated_table();
        let count = aggregate(
            &table,
            &binding,
            &spec(
                vec![GroupKey::Column("Genre".to_string())],
                Some("Rating"),
                Reducer::Count,
            ),
        )
        .expect("count");
        let size = aggregate(
            &table,
            &binding,
            &spec(vec![GroupKey::Column("Genre".to_string())], None, Reducer::Size),
        )
        .expect("size");

        let drama_count = count
            .rows()
            .iter()
            .find(|r| r.key == vec!["Drama".to_string()])
            .expect("drama count");
        let drama_size = size
            .rows()
            .iter()
            .find(|r| r.key == vec!["Drama".to_string()])
            .expect("drama size");
        assert_eq!(drama_count.value, 2.0);
        assert_eq!(drama_size.value, 3.0);
    }

    #[test]
    fn results_sort_descending_with_stable_ties() {
        let table = Table::new(
            vec!["product".to_string(), "profit".to_string()],
            vec![
                vec![string_cell("B"), Some(Value::Integer(30))],
                vec![string_cell("A"), Some(Value::Integer(50))],
                vec![string_cell("C"), Some(Value::Integer(30))],
            ],
        )
        .expect("table");
        let schema = CanonicalSchema::new(vec![
            CanonicalColumn::new("Product", ColumnKind::Text),
            CanonicalColumn::new("Profit", ColumnKind::Numeric),
        ])
        .expect("schema");
        let binding =
            reconcile(table.headers(), &schema, 80, BindingMode::Total).expect("binding");

        let result = aggregate(
            &table,
            &binding,
            &spec(
                vec![GroupKey::Column("Product".to_string())],
                Some("Profit"),
                Reducer::Sum,
            ),
        )
        .expect("result");

        let keys: Vec<&str> = result.rows().iter().map(|r| r.key[0].as_str()).collect();
        assert_eq!(keys, vec!["A", "B", "C"]);

        // topN keeps the first-encountered member of the tied pair
        let top = result.top_n(2);
        assert_eq!(top.len(), 2);
        assert_eq!(top.rows()[1].key[0], "B");
        assert_eq!(top.rows()[1].value, 30.0);

        // n beyond the row count returns everything
        assert_eq!(result.top_n(10).len(), 3);
    }

    #[test]
    fn multi_key_grouping_builds_composite_tuples() {
        let table = Table::new(
            vec![
                "country".to_string(),
                "product".to_string(),
                "order_quantity".to_string(),
            ],
            vec![
                vec![string_cell("France"), string_cell("Bike"), Some(Value::Integer(2))],
                vec![string_cell("France"), string_cell("Bike"), Some(Value::Integer(3))],
                vec![string_cell("France"), string_cell("Helmet"), Some(Value::Integer(1))],
            ],
        )
        .expect("table");
        let schema = CanonicalSchema::new(vec![
            CanonicalColumn::new("Country", ColumnKind::Text),
            CanonicalColumn::new("Product", ColumnKind::Text),
            CanonicalColumn::new("Quantity", ColumnKind::Numeric),
        ])
        .expect("schema");
        let binding =
            reconcile(table.headers(), &schema, 80, BindingMode::Total).expect("binding");

        let result = aggregate(
            &table,
            &binding,
            &spec(
                vec![
                    GroupKey::Column("Country".to_string()),
                    GroupKey::Column("Product".to_string()),
                ],
                Some("Quantity"),
                Reducer::Sum,
            ),
        )
        .expect("result");

        assert_eq!(result.len(), 2);
        assert_eq!(result.rows()[0].key, vec!["France", "Bike"]);
        assert_eq!(result.rows()[0].value, 5.0);
    }

    #[test]
    fn period_key_derives_year_month_from_dates() {
        let table = Table::new(
            vec!["ordered".to_string(), "amount".to_string()],
            vec![
                vec![
                    Some(Value::Date(NaiveDate::from_ymd_opt(2024, 1, 15).unwrap())),
                    Some(Value::Integer(10)),
                ],
                vec![
                    Some(Value::Date(NaiveDate::from_ymd_opt(2024, 1, 20).unwrap())),
                    Some(Value::Integer(5)),
                ],
                vec![
                    Some(Value::Date(NaiveDate::from_ymd_opt(2024, 2, 1).unwrap())),
                    Some(Value::Integer(7)),
                ],
            ],
        )
        .expect("table");
        let schema = CanonicalSchema::new(vec![
            CanonicalColumn::new("Ordered", ColumnKind::Temporal),
            CanonicalColumn::new("Amount", ColumnKind::Numeric),
        ])
        .expect("schema");
        let binding =
            reconcile(table.headers(), &schema, 80, BindingMode::Total).expect("binding");

        let result = aggregate(
            &table,
            &binding,
            &spec(
                vec![GroupKey::Period("Ordered".to_string())],
                Some("Amount"),
                Reducer::Sum,
            ),
        )
        .expect("result");

        assert_eq!(result.key_columns, vec!["Ordered (period)".to_string()]);
        assert_eq!(result.rows()[0].key, vec!["2024-01"]);
        assert_eq!(result.rows()[0].value, 15.0);
        assert_eq!(result.rows()[1].key, vec!["2024-02"]);
    }

    #[test]
    fn empty_group_keys_reduce_the_whole_table() {
        let (table, binding) = rated_table();
        let result = aggregate(
            &table,
            &binding,
            &spec(Vec::new(), Some("Rating"), Reducer::Sum),
        )
        .expect("result");
        assert_eq!(result.len(), 1);
        assert!(result.rows()[0].key.is_empty());
        assert_eq!(result.rows()[0].value, 21.0);
    }

    #[test]
    fn unbound_names_are_fatal_configuration_errors() {
        let (table, binding) = rated_table();
        assert_eq!(
            aggregate(
                &table,
                &binding,
                &spec(
                    vec![GroupKey::Column("Country".to_string())],
                    None,
                    Reducer::Size,
                ),
            )
            .unwrap_err(),
            AggregateError::Unbound("Country".to_string())
        );
        assert_eq!(
            aggregate(
                &table,
                &binding,
                &spec(
                    vec![GroupKey::Column("Genre".to_string())],
                    Some("Votes"),
                    Reducer::Sum,
                ),
            )
            .unwrap_err(),
            AggregateError::Unbound("Votes".to_string())
        );
    }

    #[test]
    fn mean_without_measure_is_rejected() {
        let (table, binding) = rated_table();
        assert_eq!(
            aggregate(
                &table,
                &binding,
                &spec(vec![GroupKey::Column("Genre".to_string())], None, Reducer::Mean),
            )
            .unwrap_err(),
            AggregateError::MissingMeasure(Reducer::Mean)
        );
    }
}
