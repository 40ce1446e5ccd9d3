//! Run diagnostics: which lookups resolved to the missing sentinel and which
//! subjects failed outright.
//!
//! Collected as an explicit accumulator threaded through the run rather than
//! ambient logging, so callers embedding the engine can inspect the outcome
//! programmatically. The `extract` command can additionally serialize it as a
//! JSON side artifact next to the main output.

use std::{
    fs::File,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Why a lookup produced no value. All of these are expected absence, not
/// errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MissReason {
    /// Source table file does not exist for this subject.
    TableAbsent,
    /// Table exists but has no matching dataset column.
    ColumnAbsent,
    /// Column exists but the statistic row is missing or blank.
    RowAbsent,
    /// Segmentation has zero voxels, so its statistics carry no meaning.
    EmptyMask,
}

#[derive(Debug, Clone, Serialize)]
pub struct MissingRecord {
    pub subject: String,
    pub table: String,
    pub column: String,
    /// Statistic row label for [`MissReason::RowAbsent`], empty otherwise.
    pub row: String,
    pub reason: MissReason,
}

impl MissingRecord {
    pub fn new(subject: &str, table: &str, column: &str, reason: MissReason) -> Self {
        Self {
            subject: subject.to_string(),
            table: table.to_string(),
            column: column.to_string(),
            row: String::new(),
            reason,
        }
    }

    pub fn with_row(mut self, row: &str) -> Self {
        self.row = row.to_string();
        self
    }
}

/// A subject whose row was dropped because a source table was malformed.
#[derive(Debug, Clone, Serialize)]
pub struct SubjectFailure {
    pub subject: String,
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub generated_at: DateTime<Utc>,
    pub input_root: PathBuf,
    pub subjects_scanned: usize,
    pub rows_emitted: usize,
    pub columns: usize,
    pub missing: Vec<MissingRecord>,
    pub failures: Vec<SubjectFailure>,
}

impl RunSummary {
    pub fn new(input_root: &Path, columns: usize) -> Self {
        Self {
            generated_at: Utc::now(),
            input_root: input_root.to_path_buf(),
            subjects_scanned: 0,
            rows_emitted: 0,
            columns,
            missing: Vec::new(),
            failures: Vec::new(),
        }
    }

    pub fn record_failure(&mut self, subject: &str, error: &str) {
        self.failures.push(SubjectFailure {
            subject: subject.to_string(),
            error: error.to_string(),
        });
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let file =
            File::create(path).with_context(|| format!("Creating summary file {path:?}"))?;
        serde_json::to_writer_pretty(file, self).context("Writing summary JSON")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn miss_reason_serializes_as_snake_case() {
        let record = MissingRecord::new(
            "1000001",
            "seg_volumes",
            "seg_liver_dixon",
            MissReason::TableAbsent,
        );
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["reason"], "table_absent");
        assert_eq!(value["column"], "seg_liver_dixon");
    }

    #[test]
    fn save_writes_parseable_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("summary.json");
        let mut summary = RunSummary::new(Path::new("/data/subjects"), 42);
        summary.subjects_scanned = 2;
        summary.rows_emitted = 1;
        summary.record_failure("1000002", "malformed source table");

        summary.save(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["columns"], 42);
        assert_eq!(value["failures"][0]["subject"], "1000002");
    }
}
