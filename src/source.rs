//! Source table accessor: lazy, cached loading of per-subject statistics
//! tables.
//!
//! Tables are tab-delimited with a header row of dataset names and a label
//! column of statistic names. A table that does not exist on disk is the
//! steady state for subjects missing a modality and loads as an empty table;
//! a table that exists but cannot be parsed is malformed and fails that
//! subject. Loaded tables are cached for the lifetime of one subject's
//! processing and dropped with the [`SubjectStore`].

use std::{
    collections::HashMap,
    collections::hash_map::Entry,
    path::{Path, PathBuf},
};

use log::{debug, warn};

use crate::{
    error::{IdpError, Result},
    io_utils,
};

/// One loaded table: rows are statistic names, columns are dataset names.
/// Immutable once loaded. Duplicate dataset or statistic names resolve to the
/// first occurrence.
#[derive(Debug, Default)]
pub struct SourceTable {
    columns: Vec<String>,
    row_labels: Vec<String>,
    cells: Vec<Vec<String>>,
}

impl SourceTable {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Loads a tab-delimited table. Surrounding whitespace around delimiters
    /// is tolerated; ragged rows, invalid UTF-8, and files without a header
    /// row are malformed.
    pub fn from_tsv(path: &Path) -> Result<Self> {
        let mut reader = io_utils::open_tsv_reader(path)?;
        let header = reader
            .headers()
            .map_err(|err| malformed(path, err))?
            .clone();
        if header.is_empty() {
            return Err(IdpError::TableMalformed {
                path: path.to_path_buf(),
                detail: "no header row".to_string(),
            });
        }
        // First header cell names the label column and is not a dataset.
        let columns: Vec<String> = header.iter().skip(1).map(str::to_string).collect();
        let mut row_labels = Vec::new();
        let mut cells = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|err| malformed(path, err))?;
            let mut fields = record.iter();
            let label = fields.next().unwrap_or_default();
            row_labels.push(label.to_string());
            cells.push(fields.map(str::to_string).collect());
        }
        Ok(Self {
            columns,
            row_labels,
            cells,
        })
    }

    /// True when the table has no dataset columns, as loaded for an absent
    /// file or a header carrying only the label cell. A header that names
    /// columns is not empty even when no statistic rows follow it.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn n_rows(&self) -> usize {
        self.row_labels.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|col| col == name)
    }

    pub fn row_index(&self, label: &str) -> Option<usize> {
        self.row_labels.iter().position(|row| row == label)
    }

    pub fn row_label(&self, row: usize) -> &str {
        self.row_labels.get(row).map_or("", String::as_str)
    }

    /// Cell at (row position, column position). Positions must come from the
    /// lookup methods above.
    pub fn cell(&self, row: usize, column: usize) -> &str {
        self.cells
            .get(row)
            .and_then(|cells| cells.get(column))
            .map_or("", String::as_str)
    }

    /// Cell addressed by statistic row label, `None` when the row is absent.
    pub fn cell_by_row_label(&self, column: usize, label: &str) -> Option<&str> {
        self.row_index(label).map(|row| self.cell(row, column))
    }
}

fn malformed(path: &Path, err: csv::Error) -> IdpError {
    IdpError::TableMalformed {
        path: path.to_path_buf(),
        detail: err.to_string(),
    }
}

/// Per-subject table cache. Resolves logical table names to
/// `<root>/<subject>/<stats_dir>/<table>.tsv`, loading each table at most
/// once. Scoped to one subject; create a fresh store per subject so no data
/// leaks across rows.
pub struct SubjectStore<'a> {
    root: &'a Path,
    stats_dir: &'a str,
    subject: &'a str,
    cache: HashMap<String, SourceTable>,
}

impl<'a> SubjectStore<'a> {
    pub fn new(root: &'a Path, stats_dir: &'a str, subject: &'a str) -> Self {
        Self {
            root,
            stats_dir,
            subject,
            cache: HashMap::new(),
        }
    }

    /// Subject ID; borrows from the store's construction inputs so it stays
    /// usable while a loaded table is borrowed.
    pub fn subject(&self) -> &'a str {
        self.subject
    }

    pub fn table_path(&self, table: &str) -> PathBuf {
        self.root
            .join(self.subject)
            .join(self.stats_dir)
            .join(format!("{table}.tsv"))
    }

    /// Loads a table by logical name, reusing the cached copy on repeat
    /// access. An absent file loads as an empty table and logs a warning
    /// once; a present but unparsable file is an error.
    pub fn load(&mut self, table: &str) -> Result<&SourceTable> {
        let path = self.table_path(table);
        match self.cache.entry(table.to_string()) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let loaded = if path.exists() {
                    debug!(
                        "subject {}: loading table '{table}' from {}",
                        self.subject,
                        path.display()
                    );
                    SourceTable::from_tsv(&path)?
                } else {
                    warn!(
                        "subject {}: no '{table}' table at {}",
                        self.subject,
                        path.display()
                    );
                    SourceTable::empty()
                };
                Ok(entry.insert(loaded))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn parses_labelled_table() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("liver_dixon_stats.tsv");
        std::fs::write(
            &path,
            "stat\tt1_liver_molli\tt2star_pancreas_gre_presco\nMean\t720.5\t31.2\nStd\t55\t4.5\n",
        )
        .unwrap();

        let table = SourceTable::from_tsv(&path).unwrap();
        assert_eq!(table.n_rows(), 2);
        let col = table.column_index("t2star_pancreas_gre_presco").unwrap();
        assert_eq!(table.cell_by_row_label(col, "Mean"), Some("31.2"));
        assert_eq!(table.cell_by_row_label(col, "Median"), None);
        assert!(table.column_index("missing").is_none());
    }

    #[test]
    fn tolerates_whitespace_around_delimiters() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("stats.tsv");
        std::fs::write(&path, "stat\t t1_liver_molli \nMean\t 720.5 \n").unwrap();

        let table = SourceTable::from_tsv(&path).unwrap();
        let col = table.column_index("t1_liver_molli").unwrap();
        assert_eq!(table.cell_by_row_label(col, "Mean"), Some("720.5"));
    }

    #[test]
    fn ragged_row_is_malformed() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("stats.tsv");
        std::fs::write(&path, "stat\ta\tb\nMean\t1\n").unwrap();

        let err = SourceTable::from_tsv(&path).unwrap_err();
        assert!(matches!(err, IdpError::TableMalformed { .. }));
    }

    #[test]
    fn empty_file_is_malformed() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("stats.tsv");
        std::fs::write(&path, "").unwrap();

        let err = SourceTable::from_tsv(&path).unwrap_err();
        assert!(matches!(err, IdpError::TableMalformed { .. }));
    }

    #[test]
    fn emptiness_means_no_dataset_columns() {
        let dir = tempdir().unwrap();
        let label_only = dir.path().join("label_only.tsv");
        std::fs::write(&label_only, "stat\n").unwrap();
        assert!(SourceTable::from_tsv(&label_only).unwrap().is_empty());

        let named_columns = dir.path().join("named_columns.tsv");
        std::fs::write(&named_columns, "stat\tseg_liver_dixon\n").unwrap();
        let table = SourceTable::from_tsv(&named_columns).unwrap();
        assert!(!table.is_empty());
        assert_eq!(table.n_rows(), 0);
    }

    #[test]
    fn duplicate_columns_resolve_to_first() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("stats.tsv");
        std::fs::write(&path, "stat\tx\tx\nMean\t1\t2\n").unwrap();

        let table = SourceTable::from_tsv(&path).unwrap();
        let col = table.column_index("x").unwrap();
        assert_eq!(table.cell_by_row_label(col, "Mean"), Some("1"));
    }

    #[test]
    fn absent_table_loads_empty_and_is_cached() {
        let dir = tempdir().unwrap();
        let mut store = SubjectStore::new(dir.path(), "stats", "1000001");

        let table = store.load("seg_volumes").unwrap();
        assert!(table.is_empty());
        // Second access hits the cache rather than the filesystem.
        assert!(store.load("seg_volumes").unwrap().is_empty());
    }

    #[test]
    fn store_resolves_path_under_stats_dir() {
        let dir = tempdir().unwrap();
        let subject_stats = dir.path().join("1000001").join("stats");
        std::fs::create_dir_all(&subject_stats).unwrap();
        std::fs::write(
            subject_stats.join("seg_volumes.tsv"),
            "stat\tseg_liver_dixon\nn\t120\nvol\t45000\n",
        )
        .unwrap();

        let mut store = SubjectStore::new(dir.path(), "stats", "1000001");
        let table = store.load("seg_volumes").unwrap();
        assert_eq!(table.column_index("seg_liver_dixon"), Some(0));
        assert_eq!(table.n_rows(), 2);
    }
}
