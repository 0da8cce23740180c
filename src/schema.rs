//! Canonical schema model and YAML persistence.
//!
//! The canonical schema is the fixed, ordered list of semantic column names
//! downstream logic programs against, independent of any source file's
//! literal headers. Each target carries a [`ColumnKind`] telling the cleaner
//! whether the matched column holds free text, numbers, or dates. The schema
//! is supplied at pipeline construction (YAML file or code) and never derived
//! from data.

use std::{collections::HashSet, fs::File, io::BufReader, path::Path};

use anyhow::{Context, Result, bail, ensure};
use serde::{Deserialize, Serialize};

use crate::reconcile::BindingMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    Text,
    Numeric,
    Temporal,
}

impl ColumnKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnKind::Text => "text",
            ColumnKind::Numeric => "numeric",
            ColumnKind::Temporal => "temporal",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanonicalColumn {
    pub name: String,
    pub kind: ColumnKind,
}

impl CanonicalColumn {
    pub fn new(name: impl Into<String>, kind: ColumnKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// Ordered set of canonical targets. Construction validates uniqueness so a
/// binding can never be asked to resolve the same semantic name twice.
#[derive(Debug, Clone)]
pub struct CanonicalSchema {
    columns: Vec<CanonicalColumn>,
}

impl CanonicalSchema {
    pub fn new(columns: Vec<CanonicalColumn>) -> Result<Self> {
        ensure!(
            !columns.is_empty(),
            "Canonical schema must declare at least one column"
        );
        let mut seen = HashSet::new();
        for column in &columns {
            let trimmed = column.name.trim();
            ensure!(!trimmed.is_empty(), "Canonical column names cannot be blank");
            if !seen.insert(trimmed.to_ascii_lowercase()) {
                bail!("Duplicate canonical column '{}'", column.name);
            }
        }
        Ok(Self { columns })
    }

    pub fn columns(&self) -> &[CanonicalColumn] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// The configuration surface of one pipeline instance: targets, similarity
/// threshold, and binding mode. Never read from environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub columns: Vec<CanonicalColumn>,
    #[serde(default = "default_threshold")]
    pub threshold: u8,
    #[serde(default)]
    pub mode: BindingMode,
}

const fn default_threshold() -> u8 {
    80
}

impl PipelineConfig {
    pub fn new(schema: &CanonicalSchema, threshold: u8, mode: BindingMode) -> Result<Self> {
        let config = Self {
            columns: schema.columns().to_vec(),
            threshold,
            mode,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("Opening schema file {path:?}"))?;
        let reader = BufReader::new(file);
        let config: PipelineConfig =
            serde_yaml::from_reader(reader).context("Parsing schema YAML")?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        self.validate()?;
        let file = File::create(path).with_context(|| format!("Creating schema file {path:?}"))?;
        serde_yaml::to_writer(file, self).context("Writing schema YAML")
    }

    pub fn schema(&self) -> Result<CanonicalSchema> {
        CanonicalSchema::new(self.columns.clone())
    }

    fn validate(&self) -> Result<()> {
        ensure!(
            self.threshold <= 100,
            "Similarity threshold must be between 0 and 100, got {}",
            self.threshold
        );
        CanonicalSchema::new(self.columns.clone()).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn movie_columns() -> Vec<CanonicalColumn> {
        vec![
            CanonicalColumn::new("Title", ColumnKind::Text),
            CanonicalColumn::new("Genre", ColumnKind::Text),
            CanonicalColumn::new("Year", ColumnKind::Temporal),
            CanonicalColumn::new("Rating", ColumnKind::Numeric),
        ]
    }

    #[test]
    fn schema_rejects_duplicates_and_blanks() {
        let mut columns = movie_columns();
        columns.push(CanonicalColumn::new("title", ColumnKind::Text));
        assert!(CanonicalSchema::new(columns).is_err());

        assert!(CanonicalSchema::new(vec![CanonicalColumn::new("  ", ColumnKind::Text)]).is_err());
        assert!(CanonicalSchema::new(Vec::new()).is_err());
    }

    #[test]
    fn config_round_trips_through_yaml() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("schema.yaml");
        let schema = CanonicalSchema::new(movie_columns()).expect("schema");
        let config =
            PipelineConfig::new(&schema, 80, BindingMode::Partial).expect("config");
        config.save(&path).expect("save");

        let loaded = PipelineConfig::load(&path).expect("load");
        assert_eq!(loaded.threshold, 80);
        assert_eq!(loaded.mode, BindingMode::Partial);
        assert_eq!(loaded.columns.len(), 4);
        assert_eq!(loaded.columns[2].name, "Year");
        assert_eq!(loaded.columns[2].kind, ColumnKind::Temporal);
    }

    #[test]
    fn config_defaults_threshold_and_mode() {
        let yaml = "columns:\n  - name: Title\n    kind: text\n";
        let config: PipelineConfig = serde_yaml::from_str(yaml).expect("parse");
        assert_eq!(config.threshold, 80);
        assert_eq!(config.mode, BindingMode::Total);
    }

    #[test]
    fn config_rejects_threshold_over_100() {
        let yaml = "threshold: 101\ncolumns:\n  - name: Title\n    kind: text\n";
        let config: PipelineConfig = serde_yaml::from_str(yaml).expect("parse");
        assert!(config.validate().is_err());
    }
}
