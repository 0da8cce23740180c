use std::{collections::BTreeSet, path::Path};

use anyhow::{Context, Result, bail};

use crate::{data::Value, io_utils};

pub type Cell = Option<Value>;

/// Row-major table: raw column headers exactly as delivered by the source
/// (casing and whitespace preserved) plus typed cells. The loader produces
/// all-string cells; the cleaner retypes bound columns in place.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<Cell>>) -> Result<Self> {
        for (idx, row) in rows.iter().enumerate() {
            if row.len() != headers.len() {
                bail!(
                    "Row {} has {} cell(s) but the table declares {} column(s)",
                    idx + 1,
                    row.len(),
                    headers.len()
                );
            }
        }
        Ok(Self { headers, rows })
    }

    pub fn from_csv_path(
        path: &Path,
        delimiter: Option<u8>,
        encoding_label: Option<&str>,
    ) -> Result<Self> {
        let delimiter = io_utils::resolve_input_delimiter(path, delimiter);
        let encoding = io_utils::resolve_encoding(encoding_label)?;
        let mut reader = io_utils::open_csv_reader_from_path(path, delimiter)?;
        let headers = io_utils::reader_headers(&mut reader, encoding)
            .with_context(|| format!("Reading headers from {path:?}"))?;

        let mut rows = Vec::new();
        for (row_idx, record) in reader.byte_records().enumerate() {
            let record = record.with_context(|| format!("Reading row {}", row_idx + 2))?;
            let decoded = io_utils::decode_record(&record, encoding)
                .with_context(|| format!("Decoding row {}", row_idx + 2))?;
            let mut cells: Vec<Cell> = decoded
                .into_iter()
                .take(headers.len())
                .map(|field| {
                    if field.is_empty() {
                        None
                    } else {
                        Some(Value::String(field))
                    }
                })
                .collect();
            cells.resize(headers.len(), None);
            rows.push(cells);
        }
        Table::new(headers, rows)
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.headers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn cell(&self, row: usize, column: usize) -> Option<&Value> {
        self.rows.get(row).and_then(|r| r.get(column)).and_then(|c| c.as_ref())
    }

    pub(crate) fn cell_mut(&mut self, row: usize, column: usize) -> Option<&mut Cell> {
        self.rows.get_mut(row).and_then(|r| r.get_mut(column))
    }

    pub fn column_values(&self, column: usize) -> impl Iterator<Item = &Cell> {
        self.rows.iter().filter_map(move |row| row.get(column))
    }

    /// Display string for a cell; absent cells realize as the empty string so
    /// null buckets survive equality filtering and grouping.
    pub fn display_cell(&self, row: usize, column: usize) -> String {
        self.cell(row, column)
            .map(|v| v.as_display())
            .unwrap_or_default()
    }

    /// The realized distinct display values of a column after cleaning.
    pub fn distinct_values(&self, column: usize) -> BTreeSet<String> {
        self.rows
            .iter()
            .filter_map(|row| row.get(column))
            .map(|cell| cell.as_ref().map(|v| v.as_display()).unwrap_or_default())
            .collect()
    }

    /// Builds a new table holding clones of the selected rows, in the order
    /// given. Headers are shared semantics, so they are cloned verbatim.
    pub fn subset(&self, row_indices: &[usize]) -> Table {
        let rows = row_indices
            .iter()
            .filter_map(|idx| self.rows.get(*idx))
            .cloned()
            .collect();
        Table {
            headers: self.headers.clone(),
            rows,
        }
    }

    /// Renders every row as display strings, for table output and CSV export.
    pub fn display_rows(&self) -> Vec<Vec<String>> {
        self.rows
            .iter()
            .map(|row| {
                row.iter()
                    .map(|cell| cell.as_ref().map(|v| v.as_display()).unwrap_or_default())
                    .collect()
            })
            .collect()
    }

    pub fn write_csv(&self, path: Option<&Path>, delimiter: u8) -> Result<()> {
        let mut writer = io_utils::open_csv_writer(path, delimiter)?;
        writer
            .write_record(&self.headers)
            .context("Writing CSV headers")?;
        for (row_idx, row) in self.display_rows().into_iter().enumerate() {
            writer
                .write_record(&row)
                .with_context(|| format!("Writing row {}", row_idx + 2))?;
        }
        writer.flush().context("Flushing CSV output")?;
        Ok(())
    }
}
