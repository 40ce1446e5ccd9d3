use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Tabulate imaging-derived phenotypes from DEMISTIFI pipeline output",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Extract IDPs for every subject and write the combined CSV table
    Extract(ExtractArgs),
    /// List the output columns the feature definition generates
    Columns(ColumnsArgs),
}

#[derive(Debug, Args)]
pub struct ExtractArgs {
    /// Input directory containing one subdirectory per subject
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Name of the statistics subdirectory inside each subject directory
    #[arg(long = "stats-dir", default_value = "stats")]
    pub stats_dir: String,
    /// Output CSV file ('-' for stdout)
    #[arg(short = 'o', long = "output", default_value = "demistifi_idps.csv")]
    pub output: PathBuf,
    /// Write a JSON run summary (missing data, failed subjects) to this path
    #[arg(long)]
    pub summary: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct ColumnsArgs {
    /// Only list columns belonging to this organ
    #[arg(long)]
    pub organ: Option<String>,
}
