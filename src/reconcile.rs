//! Fuzzy reconciliation of raw column headers against the canonical schema.
//!
//! Each canonical target is scored against every raw header with a
//! token-aware, case- and whitespace-insensitive similarity (0–100). A target
//! binds to its best-scoring header iff the score clears the configured
//! threshold. Targets claim headers in declaration order: once a header is
//! claimed, later targets re-match against the remaining unclaimed headers
//! only, so no raw column is ever bound twice.

use heck::ToSnakeCase;
use serde::{Deserialize, Serialize};
use similar::TextDiff;
use thiserror::Error;

use crate::schema::{CanonicalSchema, ColumnKind};

/// Policy governing whether every canonical target must resolve.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BindingMode {
    /// Reconciliation fails as a whole unless all targets resolve.
    #[default]
    Total,
    /// Whatever subset resolves is returned alongside the unresolved list.
    Partial,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReconcileError {
    #[error("input table has no columns to reconcile")]
    NoColumns,
    #[error("unresolved canonical column(s): {}", .0.join(", "))]
    Unresolved(Vec<String>),
}

/// One resolved target: the raw header it claimed and the confidence score.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BoundColumn {
    pub target: String,
    pub kind: ColumnKind,
    pub raw_name: String,
    pub raw_index: usize,
    pub score: u8,
}

/// Mapping from canonical target to claimed raw column, in target
/// declaration order. Immutable once computed; every later pipeline stage
/// addresses columns through it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AliasBinding {
    bound: Vec<BoundColumn>,
    unresolved: Vec<String>,
}

impl AliasBinding {
    pub fn bound(&self) -> &[BoundColumn] {
        &self.bound
    }

    pub fn unresolved(&self) -> &[String] {
        &self.unresolved
    }

    pub fn is_total(&self) -> bool {
        self.unresolved.is_empty()
    }

    pub fn get(&self, target: &str) -> Option<&BoundColumn> {
        self.bound.iter().find(|b| b.target == target)
    }

    pub fn raw_index(&self, target: &str) -> Option<usize> {
        self.get(target).map(|b| b.raw_index)
    }
}

pub fn reconcile(
    headers: &[String],
    schema: &CanonicalSchema,
    threshold: u8,
    mode: BindingMode,
) -> Result<AliasBinding, ReconcileError> {
    if headers.is_empty() {
        return Err(ReconcileError::NoColumns);
    }

    let mut claimed = vec![false; headers.len()];
    let mut bound = Vec::with_capacity(schema.len());
    let mut unresolved = Vec::new();

    for column in schema.columns() {
        let mut best: Option<(usize, u8)> = None;
        for (idx, raw) in headers.iter().enumerate() {
            if claimed[idx] {
                continue;
            }
            let score = similarity(&column.name, raw);
            // strict comparison: the first occurrence wins score ties
            if best.is_none_or(|(_, current)| score > current) {
                best = Some((idx, score));
            }
        }
        match best {
            Some((idx, score)) if score >= threshold => {
                claimed[idx] = true;
                bound.push(BoundColumn {
                    target: column.name.clone(),
                    kind: column.kind,
                    raw_name: headers[idx].clone(),
                    raw_index: idx,
                    score,
                });
            }
            _ => unresolved.push(column.name.clone()),
        }
    }

    if !unresolved.is_empty() && mode == BindingMode::Total {
        return Err(ReconcileError::Unresolved(unresolved));
    }
    Ok(AliasBinding { bound, unresolved })
}

/// Token-aware similarity between a canonical target and a raw header,
/// scaled 0–100. The score is the best of the full normalized comparison,
/// the token-sorted comparison, and the strongest single-token comparison in
/// either direction, so `Year` still scores 100 against `release_year`.
pub fn similarity(target: &str, candidate: &str) -> u8 {
    let target_norm = normalize_header(target);
    let candidate_norm = normalize_header(candidate);
    if target_norm.is_empty() || candidate_norm.is_empty() {
        return 0;
    }
    if target_norm == candidate_norm {
        return 100;
    }

    let target_tokens: Vec<&str> = target_norm.split(' ').collect();
    let candidate_tokens: Vec<&str> = candidate_norm.split(' ').collect();

    let mut best = char_ratio(&target_norm, &candidate_norm);

    let mut sorted_target = target_tokens.clone();
    sorted_target.sort_unstable();
    let mut sorted_candidate = candidate_tokens.clone();
    sorted_candidate.sort_unstable();
    best = best.max(char_ratio(
        &sorted_target.join(" "),
        &sorted_candidate.join(" "),
    ));

    for token in &candidate_tokens {
        best = best.max(char_ratio(&target_norm, token));
    }
    for token in &target_tokens {
        best = best.max(char_ratio(token, &candidate_norm));
    }
    best
}

/// Lowercases, strips surrounding whitespace, and splits camelCase and
/// underscore/space-delimited headers into space-joined tokens.
fn normalize_header(name: &str) -> String {
    name.trim().to_snake_case().replace('_', " ")
}

fn char_ratio(a: &str, b: &str) -> u8 {
    if a == b {
        return 100;
    }
    let ratio = TextDiff::from_chars(a, b).ratio();
    (ratio * 100.0).round().min(100.0) as u8
}
