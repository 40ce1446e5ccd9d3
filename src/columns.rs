//! `columns` command: lists every output column the current feature
//! definition generates, with its metadata labels, without reading any
//! subject data.

use anyhow::Result;
use log::{info, warn};

use crate::{cli::ColumnsArgs, plan::TabulationPlan, schema::FeatureSchema, table};

pub fn execute(args: &ColumnsArgs) -> Result<()> {
    let schema = FeatureSchema::demistifi()?;
    let plan = TabulationPlan::build(&schema)?;

    let headers: Vec<String> = [
        "position",
        "name",
        "organ",
        "segmentation",
        "grid",
        "parameter",
        "measure",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();
    let rows = listing_rows(&plan, args.organ.as_deref());
    if rows.is_empty()
        && let Some(organ) = &args.organ
    {
        warn!("No columns match organ '{organ}'");
    }
    table::print_table(&headers, &rows);
    info!("Listed {} of {} IDP column(s)", rows.len(), plan.width());
    Ok(())
}

/// Positions are 1-based fields of the emitted CSV, so the subject ID column
/// occupies position 1 and the first IDP column reports 2.
fn listing_rows(plan: &TabulationPlan, organ: Option<&str>) -> Vec<Vec<String>> {
    plan.columns
        .iter()
        .enumerate()
        .filter(|(_, column)| organ.is_none_or(|name| column.meta.organ == name))
        .map(|(idx, column)| {
            vec![
                (idx + 2).to_string(),
                column.name.clone(),
                column.meta.organ.clone(),
                column.meta.segmentation.clone(),
                column.meta.grid.clone(),
                column.meta.parameter.clone(),
                column.meta.measure.clone(),
            ]
        })
        .collect()
}
