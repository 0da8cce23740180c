//! One analysis session over one table.
//!
//! The session is the explicit context object threaded through every call:
//! it owns the pipeline configuration, the binding computed once per table,
//! the cleaned table, and the cleaning warnings. Nothing here is global.

use anyhow::{Context, Result};
use log::{info, warn};

use crate::{
    aggregate::{self, AggregateError, AggregateSpec, ResultTable},
    clean::{self, ColumnWarning},
    filter::{self, EqualsOutcome, FilterError},
    reconcile::{self, AliasBinding},
    schema::{ColumnKind, PipelineConfig},
    table::Table,
};

pub struct AnalysisSession {
    config: PipelineConfig,
    binding: AliasBinding,
    table: Table,
    warnings: Vec<ColumnWarning>,
}

/// Summary of a prepared session: the original's "basic info" view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Overview {
    pub rows: usize,
    pub raw_columns: usize,
    pub bound: Vec<(String, String, u8)>,
    pub unresolved: Vec<String>,
    /// Span of the first bound temporal column, as display strings.
    pub ordinal_span: Option<(String, String, String)>,
}

impl AnalysisSession {
    /// Reconciles and cleans `table` under `config`. Fails only on
    /// reconciliation (per the configured binding mode) or a broken schema
    /// document; cleaning problems surface as warnings.
    pub fn prepare(config: PipelineConfig, mut table: Table) -> Result<Self> {
        let schema = config.schema()?;
        let binding = reconcile::reconcile(table.headers(), &schema, config.threshold, config.mode)
            .with_context(|| {
                format!(
                    "Reconciling {} raw column(s) against {} canonical target(s) at threshold {}",
                    table.column_count(),
                    schema.len(),
                    config.threshold
                )
            })?;
        info!(
            "Bound {} of {} canonical column(s)",
            binding.bound().len(),
            schema.len()
        );

        let report = clean::clean(&mut table, &binding);
        for warning in &report.warnings {
            warn!("{warning}");
        }

        Ok(Self {
            config,
            binding,
            table,
            warnings: report.warnings,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn binding(&self) -> &AliasBinding {
        &self.binding
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn warnings(&self) -> &[ColumnWarning] {
        &self.warnings
    }

    pub fn filter_equals(&self, target: &str, value: &str) -> Result<EqualsOutcome, FilterError> {
        filter::filter_equals(&self.table, &self.binding, target, value)
    }

    pub fn filter_range(&self, target: &str, start: &str, end: &str) -> Result<Table, FilterError> {
        filter::filter_range(&self.table, &self.binding, target, start, end)
    }

    pub fn aggregate(&self, spec: &AggregateSpec) -> Result<ResultTable, AggregateError> {
        aggregate::aggregate(&self.table, &self.binding, spec)
    }

    /// Aggregates a table other than the session's own (a filtered subset)
    /// under the session's binding.
    pub fn aggregate_over(
        &self,
        table: &Table,
        spec: &AggregateSpec,
    ) -> Result<ResultTable, AggregateError> {
        aggregate::aggregate(table, &self.binding, spec)
    }

    pub fn overview(&self) -> Overview {
        let bound = self
            .binding
            .bound()
            .iter()
            .map(|b| (b.target.clone(), b.raw_name.clone(), b.score))
            .collect();

        let ordinal_span = self
            .binding
            .bound()
            .iter()
            .find(|b| b.kind == ColumnKind::Temporal)
            .and_then(|b| {
                let mut values = self
                    .table
                    .column_values(b.raw_index)
                    .filter_map(|cell| cell.as_ref());
                let first = values.next()?;
                let (min, max) = values.fold((first, first), |(min, max), value| {
                    (
                        if value < min { value } else { min },
                        if value > max { value } else { max },
                    )
                });
                Some((b.target.clone(), min.as_display(), max.as_display()))
            });

        Overview {
            rows: self.table.row_count(),
            raw_columns: self.table.column_count(),
            bound,
            unresolved: self.binding.unresolved().to_vec(),
            ordinal_span,
        }
    }
}
