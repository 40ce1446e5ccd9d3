pub mod cli;
pub mod columns;
pub mod data;
pub mod diagnostics;
pub mod emit;
pub mod error;
pub mod extract;
pub mod io_utils;
pub mod naming;
pub mod plan;
pub mod schema;
pub mod source;
pub mod table;
pub mod tabulate;

use std::{env, sync::OnceLock};

use anyhow::Result;
use clap::Parser;
use log::LevelFilter;

use crate::cli::{Cli, Commands};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("demistifi_idps", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Extract(args) => tabulate::execute(&args),
        Commands::Columns(args) => columns::execute(&args),
    }
}
