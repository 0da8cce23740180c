#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::{TempDir, tempdir};

/// Scratch directory helper that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    /// Creates a fresh scratch directory for the current test case.
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    /// Returns the root path for all files owned by this workspace.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        let mut file = File::create(&path).expect("create temp file");
        file.write_all(contents.as_bytes())
            .expect("write temp file contents");
        path
    }
}

/// A messy movie CSV whose headers only fuzzily match the canonical targets.
pub const MOVIES_CSV: &str = "\
\"title \",\"GENRE\",\"release_year\",\"rating_score\",\"country\"
\"  the matrix \",\"sci-fi\",\"1999\",\"8.7\",\"USA\"
\"heat\",\"crime\",\"1995\",\"8.3\",\"USA\"
\"amelie\",\"comedy\",\"2001\",\"8.3\",\"France\"
\"oldboy\",\"crime\",\"2003\",\"not rated\",\"South Korea\"
\"the host\",\"sci-fi\",\"2006\",\"7.1\",\"South Korea\"
";

/// The canonical movie schema used across integration suites.
pub const MOVIES_SCHEMA_YAML: &str = "\
threshold: 80
mode: total
columns:
  - name: Title
    kind: text
  - name: Genre
    kind: text
  - name: Year
    kind: temporal
  - name: Rating
    kind: numeric
  - name: Country
    kind: text
";

/// Writes both fixtures and returns (csv_path, schema_path).
pub fn movie_fixtures(workspace: &TestWorkspace) -> (PathBuf, PathBuf) {
    let csv = workspace.write("movies.csv", MOVIES_CSV);
    let schema = workspace.write("schema.yaml", MOVIES_SCHEMA_YAML);
    (csv, schema)
}
