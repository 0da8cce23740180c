use std::borrow::Cow;
use std::fmt::Write as _;

use itertools::Itertools;

use crate::{aggregate::ResultTable, reconcile::AliasBinding, session::Overview};

pub fn render_table(headers: &[String], rows: &[Vec<String>]) -> String {
    let column_count = headers.len();
    let mut widths = headers.iter().map(|h| h.chars().count()).collect::<Vec<_>>();
    for row in rows {
        for (idx, cell) in row.iter().enumerate().take(column_count) {
            widths[idx] = widths[idx].max(cell.chars().count());
        }
    }
    for width in &mut widths {
        *width = (*width).max(1);
    }

    let mut output = String::new();
    let _ = writeln!(output, "{}", format_row(headers, &widths));
    let separator = widths
        .iter()
        .map(|w| "-".repeat((*w).max(3)))
        .collect::<Vec<_>>();
    let _ = writeln!(output, "{}", format_row(&separator, &widths));
    for row in rows {
        let _ = writeln!(output, "{}", format_row(row, &widths));
    }
    output
}

pub fn print_table(headers: &[String], rows: &[Vec<String>]) {
    print!("{}", render_table(headers, rows));
}

fn format_row(values: &[String], widths: &[usize]) -> String {
    let mut cells = Vec::with_capacity(values.len());
    for (idx, value) in values.iter().enumerate() {
        if idx >= widths.len() {
            break;
        }
        let sanitized = sanitize_cell(value);
        let display_len = sanitized.chars().count();
        let mut cell = sanitized.into_owned();
        let padding = widths[idx].saturating_sub(display_len);
        if padding > 0 {
            cell.push_str(&" ".repeat(padding));
        }
        cells.push(cell);
    }
    let mut line = cells.join("  ");
    while line.ends_with(' ') {
        line.pop();
    }
    line
}

fn sanitize_cell(value: &str) -> Cow<'_, str> {
    if value.contains(['\n', '\r', '\t']) {
        Cow::Owned(
            value
                .chars()
                .map(|ch| match ch {
                    '\n' | '\r' | '\t' => ' ',
                    other => other,
                })
                .collect(),
        )
    } else {
        Cow::Borrowed(value)
    }
}

/// Rows describing a binding: target, claimed raw header, kind, score.
pub fn binding_rows(binding: &AliasBinding) -> (Vec<String>, Vec<Vec<String>>) {
    let headers = vec![
        "target".to_string(),
        "raw_column".to_string(),
        "kind".to_string(),
        "score".to_string(),
    ];
    let rows = binding
        .bound()
        .iter()
        .map(|b| {
            vec![
                b.target.clone(),
                b.raw_name.clone(),
                b.kind.as_str().to_string(),
                b.score.to_string(),
            ]
        })
        .collect();
    (headers, rows)
}

pub fn result_headers(result: &ResultTable) -> Vec<String> {
    let mut headers = result.key_columns.clone();
    if headers.is_empty() {
        headers.push("group".to_string());
    }
    headers.push(result.reducer.as_str().to_string());
    headers
}

pub fn overview_lines(overview: &Overview) -> String {
    let mut output = String::new();
    let _ = writeln!(
        output,
        "{} row(s) across {} raw column(s)",
        overview.rows, overview.raw_columns
    );
    if let Some((target, min, max)) = &overview.ordinal_span {
        let _ = writeln!(output, "{target} spans {min} to {max}");
    }
    if !overview.unresolved.is_empty() {
        let _ = writeln!(
            output,
            "unresolved: {}",
            overview.unresolved.iter().join(", ")
        );
    }
    output
}
