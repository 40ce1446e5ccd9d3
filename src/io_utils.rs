//! I/O utilities for source-table reading and output writing.
//!
//! All file I/O flows through this module. Source tables are tab-delimited
//! with surrounding whitespace around delimiters tolerated; the output CSV
//! uses minimal quoting. The `-` path convention routes output to stdout.

use std::{
    fs::File,
    io::{BufReader, BufWriter, Write},
    path::Path,
};

use anyhow::{Context, Result};
use csv::{QuoteStyle, Trim};

use crate::error::IdpError;

pub fn is_dash(path: &Path) -> bool {
    path == Path::new("-")
}

pub fn open_tsv_reader(path: &Path) -> Result<csv::Reader<BufReader<File>>, IdpError> {
    let file = File::open(path).map_err(|source| IdpError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut builder = csv::ReaderBuilder::new();
    builder
        .has_headers(true)
        .delimiter(b'\t')
        .trim(Trim::All)
        .flexible(false);
    Ok(builder.from_reader(BufReader::new(file)))
}

pub fn open_csv_writer(path: &Path) -> Result<csv::Writer<Box<dyn Write>>> {
    let base: Box<dyn Write> = if is_dash(path) {
        Box::new(std::io::stdout())
    } else {
        Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("Creating output file {path:?}"))?,
        ))
    };
    let mut builder = csv::WriterBuilder::new();
    builder
        .delimiter(b',')
        .quote_style(QuoteStyle::Necessary)
        .double_quote(true);
    Ok(builder.from_writer(base))
}
