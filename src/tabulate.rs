//! Tabulation assembler: drives the schema walk across every subject and
//! writes the output table.
//!
//! Subjects are the immediate subdirectories of the input root, visited in
//! sorted order so repeated runs over the same tree produce byte-identical
//! output. Each subject gets a fresh [`SubjectStore`]; a subject whose data
//! is malformed loses its row and is reported in the summary, but never
//! stops the run or disturbs other subjects' rows.

use std::{fs, path::Path};

use anyhow::{Context, Result};
use itertools::Itertools;
use log::{error, info, warn};

use crate::{
    cli::ExtractArgs,
    diagnostics::RunSummary,
    emit,
    extract::{self, SubjectRow},
    io_utils,
    plan::TabulationPlan,
    schema::FeatureSchema,
    source::SubjectStore,
};

/// Assembled output: all successfully extracted rows plus run diagnostics.
pub struct Tabulation {
    pub rows: Vec<SubjectRow>,
    pub summary: RunSummary,
}

pub fn execute(args: &ExtractArgs) -> Result<()> {
    let schema = FeatureSchema::demistifi()?;
    let plan = TabulationPlan::build(&schema)?;
    info!(
        "Tabulating {} IDP column(s) from '{}'",
        plan.width(),
        args.input.display()
    );

    let tabulation = tabulate(&plan, &args.input, &args.stats_dir)?;

    let mut writer = io_utils::open_csv_writer(&args.output)?;
    emit::write_table(&mut writer, &plan, &tabulation.rows)?;
    writer.flush().context("Flushing output")?;

    if let Some(path) = &args.summary {
        tabulation.summary.save(path)?;
        info!("Run summary written to {path:?}");
    }
    info!(
        "Wrote {} row(s) x {} column(s) to '{}' ({} missing value(s), {} failed subject(s))",
        tabulation.summary.rows_emitted,
        plan.width(),
        args.output.display(),
        tabulation.summary.missing.len(),
        tabulation.summary.failures.len()
    );
    Ok(())
}

/// Extracts every subject under `input_root` against a frozen plan.
pub fn tabulate(plan: &TabulationPlan, input_root: &Path, stats_dir: &str) -> Result<Tabulation> {
    let subjects = subject_ids(input_root)?;
    if subjects.is_empty() {
        warn!(
            "No subject directories under '{}', writing header-only output",
            input_root.display()
        );
    }

    let mut summary = RunSummary::new(input_root, plan.width());
    let mut rows = Vec::with_capacity(subjects.len());
    for subject in &subjects {
        info!("Processing subject {subject}");
        summary.subjects_scanned += 1;
        let mut store = SubjectStore::new(input_root, stats_dir, subject);
        match extract::extract_subject(&mut store, plan) {
            Ok((row, missing)) => {
                summary.missing.extend(missing);
                summary.rows_emitted += 1;
                rows.push(row);
            }
            Err(err) => {
                error!("Subject {subject} failed, dropping its row: {err}");
                summary.record_failure(subject, &err.to_string());
            }
        }
    }
    Ok(Tabulation { rows, summary })
}

fn subject_ids(input_root: &Path) -> Result<Vec<String>> {
    let entries = fs::read_dir(input_root)
        .with_context(|| format!("Reading input directory {input_root:?}"))?;
    let mut subjects = Vec::new();
    for entry in entries {
        let entry = entry.with_context(|| format!("Reading input directory {input_root:?}"))?;
        if entry.file_type().map(|kind| kind.is_dir()).unwrap_or(false) {
            subjects.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    Ok(subjects.into_iter().sorted().collect())
}
