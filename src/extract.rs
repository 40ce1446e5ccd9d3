//! Feature extractor: one subject's cell values for every leaf of the
//! tabulation plan.
//!
//! Degradation rules, applied per leaf:
//!
//! - volumes column absent: count and volume are sentinels, statistics are
//!   skipped
//! - voxel count zero: count and volume are sentinels (`0` would be
//!   indistinguishable from a real measurement), statistics are skipped
//! - statistics column absent under both naming conventions: sentinels for
//!   every measure of that parameter
//! - statistic row missing or blank: sentinel for that measure only
//!
//! Anything that parses but should not (garbage numerics, a negative voxel
//! count, a volumes table without its count/volume row pair) is an error that
//! fails the subject.

use log::{debug, warn};

use crate::{
    data::{self, Value},
    diagnostics::{MissReason, MissingRecord},
    error::{IdpError, Result},
    naming,
    plan::{LeafPlan, ParamPlan, TabulationPlan},
    source::SubjectStore,
};

/// One subject's extracted values, positionally aligned to the plan columns.
#[derive(Debug)]
pub struct SubjectRow {
    pub subject: String,
    pub cells: Vec<Option<Value>>,
}

/// Extracts every planned leaf for one subject.
///
/// Missing-data records are returned alongside the row rather than written
/// into shared state, so a subject that later turns out to be malformed
/// contributes nothing to the run summary.
pub fn extract_subject(
    store: &mut SubjectStore<'_>,
    plan: &TabulationPlan,
) -> Result<(SubjectRow, Vec<MissingRecord>)> {
    let mut cells = Vec::with_capacity(plan.width());
    let mut missing = Vec::new();
    for leaf in &plan.leaves {
        extract_leaf(store, leaf, &mut cells, &mut missing)?;
    }
    debug_assert_eq!(cells.len(), plan.width());
    Ok((
        SubjectRow {
            subject: store.subject().to_string(),
            cells,
        },
        missing,
    ))
}

fn extract_leaf(
    store: &mut SubjectStore<'_>,
    leaf: &LeafPlan,
    cells: &mut Vec<Option<Value>>,
    missing: &mut Vec<MissingRecord>,
) -> Result<()> {
    let count = segmentation_size(store, leaf, cells, missing)?;
    let populated = count.is_some_and(|n| n > 0);
    for param in &leaf.params {
        extract_param(store, leaf, param, populated, cells, missing)?;
    }
    Ok(())
}

/// Pushes the count/volume cell pair and returns the voxel count, `None`
/// when the volumes lookup found nothing.
fn segmentation_size(
    store: &mut SubjectStore<'_>,
    leaf: &LeafPlan,
    cells: &mut Vec<Option<Value>>,
    missing: &mut Vec<MissingRecord>,
) -> Result<Option<i64>> {
    let subject = store.subject();
    let path = store.table_path(naming::VOLUMES_TABLE);
    let table = store.load(naming::VOLUMES_TABLE)?;

    // The pair is positional: first row is the voxel count, second the
    // volume. A loaded table with any other shape means the producer wrote
    // something we do not understand, regardless of which columns it names.
    if !table.is_empty() && table.n_rows() != 2 {
        return Err(IdpError::TableMalformed {
            path,
            detail: format!(
                "expected 2 statistic rows (count, volume), found {}",
                table.n_rows()
            ),
        });
    }

    let Some(column) = table.column_index(&leaf.volume_column) else {
        warn!(
            "subject {subject}: no volume found for segmentation '{}'",
            leaf.volume_column
        );
        let reason = if table.is_empty() {
            MissReason::TableAbsent
        } else {
            MissReason::ColumnAbsent
        };
        missing.push(MissingRecord::new(
            subject,
            naming::VOLUMES_TABLE,
            &leaf.volume_column,
            reason,
        ));
        cells.push(None);
        cells.push(None);
        return Ok(None);
    };

    let count = data::parse_count(table.cell(0, column)).map_err(|err| IdpError::BadValue {
        table: naming::VOLUMES_TABLE.to_string(),
        column: leaf.volume_column.clone(),
        detail: err.to_string(),
    })?;
    let Some(count) = count else {
        debug!(
            "subject {subject}: blank voxel count for '{}'",
            leaf.volume_column
        );
        missing.push(
            MissingRecord::new(
                subject,
                naming::VOLUMES_TABLE,
                &leaf.volume_column,
                MissReason::RowAbsent,
            )
            .with_row(table.row_label(0)),
        );
        cells.push(None);
        cells.push(None);
        return Ok(None);
    };
    if count == 0 {
        debug!(
            "subject {subject}: segmentation '{}' has zero voxels",
            leaf.volume_column
        );
        missing.push(MissingRecord::new(
            subject,
            naming::VOLUMES_TABLE,
            &leaf.volume_column,
            MissReason::EmptyMask,
        ));
        cells.push(None);
        cells.push(None);
        return Ok(Some(0));
    }

    let volume = data::parse_cell(table.cell(1, column)).map_err(|err| IdpError::BadValue {
        table: naming::VOLUMES_TABLE.to_string(),
        column: leaf.volume_column.clone(),
        detail: err.to_string(),
    })?;
    let volume = match volume {
        Some(value) => Some(match leaf.volume_divisor {
            Some(divisor) => value.scaled(divisor),
            None => value,
        }),
        None => {
            debug!(
                "subject {subject}: blank volume for '{}'",
                leaf.volume_column
            );
            missing.push(
                MissingRecord::new(
                    subject,
                    naming::VOLUMES_TABLE,
                    &leaf.volume_column,
                    MissReason::RowAbsent,
                )
                .with_row(table.row_label(1)),
            );
            None
        }
    };
    cells.push(Some(Value::Integer(count)));
    cells.push(volume);
    Ok(Some(count))
}

fn extract_param(
    store: &mut SubjectStore<'_>,
    leaf: &LeafPlan,
    param: &ParamPlan,
    populated: bool,
    cells: &mut Vec<Option<Value>>,
    missing: &mut Vec<MissingRecord>,
) -> Result<()> {
    // An empty or missing mask carries no meaningful statistics; skip the
    // lookup entirely rather than report whatever the table holds.
    if !populated {
        cells.extend(std::iter::repeat_n(None, param.measures.len()));
        return Ok(());
    }

    let subject = store.subject();
    let table = store.load(&leaf.stats_table)?;
    let found = table
        .column_index(&param.primary)
        .map(|idx| (param.primary.as_str(), idx))
        .or_else(|| {
            param
                .fallback
                .as_deref()
                .and_then(|fallback| table.column_index(fallback).map(|idx| (fallback, idx)))
        });
    let Some((column_name, column)) = found else {
        warn!(
            "subject {subject}: no statistics column '{}' in table '{}'",
            param.primary, leaf.stats_table
        );
        let reason = if table.is_empty() {
            MissReason::TableAbsent
        } else {
            MissReason::ColumnAbsent
        };
        missing.push(MissingRecord::new(
            subject,
            &leaf.stats_table,
            &param.primary,
            reason,
        ));
        cells.extend(std::iter::repeat_n(None, param.measures.len()));
        return Ok(());
    };

    for measure in param.measures {
        let label = measure.row_label();
        let value = match table.cell_by_row_label(column, label) {
            Some(text) => data::parse_cell(text).map_err(|err| IdpError::BadValue {
                table: leaf.stats_table.clone(),
                column: column_name.to_string(),
                detail: err.to_string(),
            })?,
            None => None,
        };
        if value.is_none() {
            missing.push(
                MissingRecord::new(subject, &leaf.stats_table, column_name, MissReason::RowAbsent)
                    .with_row(label),
            );
        }
        cells.push(value);
    }
    Ok(())
}
