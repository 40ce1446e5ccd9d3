use std::path::PathBuf;

/// Errors raised by the extraction engine.
///
/// The distinction between variants matters to callers: an absent source
/// table is *not* an error (the accessor returns an empty table instead),
/// so anything surfacing here as [`IdpError::TableMalformed`] or
/// [`IdpError::BadValue`] means the data on disk is corrupt rather than
/// missing, and the affected subject's row must not be emitted.
#[derive(Debug, thiserror::Error)]
pub enum IdpError {
    /// The feature schema failed structural validation. Fatal at startup,
    /// before any subject is processed.
    #[error("invalid feature schema: {0}")]
    SchemaInvalid(String),

    /// A source table file exists but cannot be parsed as a label-indexed
    /// TSV table.
    #[error("malformed source table {}: {detail}", .path.display())]
    TableMalformed { path: PathBuf, detail: String },

    /// A cell was found but its text is not usable as the expected numeric
    /// value.
    #[error("bad value in table '{table}', column '{column}': {detail}")]
    BadValue {
        table: String,
        column: String,
        detail: String,
    },

    /// An I/O failure other than "file does not exist" (absence is handled
    /// by the accessor and never reaches this type).
    #[error("reading {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, IdpError>;
