//! Emitter: serializes the assembled table to CSV.
//!
//! Layout: one row of output column names, five metadata rows (organ,
//! segmentation, grid, parameter, measure) with repeated runs collapsed to
//! their first occurrence, then one row per subject. The subject ID column
//! leads every row and carries blank metadata labels. Sentinel cells become
//! the empty string here and nowhere else.

use std::io::Write;

use anyhow::{Context, Result};

use crate::{
    extract::SubjectRow,
    plan::{ColumnMeta, TabulationPlan},
};

pub fn write_table<W: Write>(
    writer: &mut csv::Writer<W>,
    plan: &TabulationPlan,
    rows: &[SubjectRow],
) -> Result<()> {
    let mut names = Vec::with_capacity(plan.width() + 1);
    names.push("subjid".to_string());
    names.extend(plan.columns.iter().map(|column| column.name.clone()));
    writer
        .write_record(&names)
        .context("Writing column name header")?;

    write_meta_row(writer, plan, |meta| &meta.organ)?;
    write_meta_row(writer, plan, |meta| &meta.segmentation)?;
    write_meta_row(writer, plan, |meta| &meta.grid)?;
    write_meta_row(writer, plan, |meta| &meta.parameter)?;
    write_meta_row(writer, plan, |meta| &meta.measure)?;

    for row in rows {
        let mut record = Vec::with_capacity(plan.width() + 1);
        record.push(row.subject.clone());
        record.extend(
            row.cells
                .iter()
                .map(|cell| cell.map_or_else(String::new, |value| value.as_display())),
        );
        writer
            .write_record(&record)
            .with_context(|| format!("Writing row for subject {}", row.subject))?;
    }
    Ok(())
}

fn write_meta_row<W, F>(writer: &mut csv::Writer<W>, plan: &TabulationPlan, pick: F) -> Result<()>
where
    W: Write,
    F: Fn(&ColumnMeta) -> &str,
{
    let mut labels = Vec::with_capacity(plan.width() + 1);
    labels.push(String::new());
    labels.extend(
        plan.columns
            .iter()
            .map(|column| pick(&column.meta).to_string()),
    );
    writer
        .write_record(&strip_repeats(&labels))
        .context("Writing metadata header")?;
    Ok(())
}

/// Collapses each run of equal labels to its first occurrence, producing the
/// sparse merged-cell look of the metadata header.
pub fn strip_repeats(labels: &[String]) -> Vec<String> {
    labels
        .iter()
        .enumerate()
        .map(|(idx, label)| {
            if idx > 0 && labels[idx - 1] == *label {
                String::new()
            } else {
                label.clone()
            }
        })
        .collect()
}
