#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::{TempDir, tempdir};

/// Scratch subject tree rooted in a temp directory that cleans up on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    /// Root directory holding one subdirectory per subject.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Creates a subject directory without any statistics tables.
    pub fn add_subject(&self, subject: &str) -> PathBuf {
        let dir = self.temp_dir.path().join(subject);
        fs::create_dir_all(&dir).expect("create subject dir");
        dir
    }

    /// Writes a source table under `<subject>/<stats_dir>/<table>.tsv`.
    pub fn write_table_in(
        &self,
        subject: &str,
        stats_dir: &str,
        table: &str,
        contents: &str,
    ) -> PathBuf {
        let dir = self.temp_dir.path().join(subject).join(stats_dir);
        fs::create_dir_all(&dir).expect("create stats dir");
        let path = dir.join(format!("{table}.tsv"));
        fs::write(&path, contents).expect("write table");
        path
    }

    /// Writes a source table under the default `stats` subdirectory.
    pub fn write_table(&self, subject: &str, table: &str, contents: &str) -> PathBuf {
        self.write_table_in(subject, "stats", table, contents)
    }

    /// Path for an output artifact inside the workspace.
    pub fn output_path(&self, name: &str) -> PathBuf {
        self.temp_dir.path().join(name)
    }
}

/// Splits one line of minimal-quoted CSV. Good enough for the identifier and
/// numeric cells these tests emit.
pub fn split_csv_line(line: &str) -> Vec<String> {
    line.split(',').map(|field| field.to_string()).collect()
}

/// Finds the field index of a named column in the header line.
pub fn column_position(header: &str, name: &str) -> usize {
    split_csv_line(header)
        .iter()
        .position(|field| field == name)
        .unwrap_or_else(|| panic!("column '{name}' not found in header"))
}
