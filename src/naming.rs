//! Column name resolver: pure functions mapping schema paths to source-table
//! and output-table names.
//!
//! Two naming conventions exist upstream for statistic columns. Maps resampled
//! onto a named grid carry the grid name (`t2star_pancreas_gre_presco`); maps
//! on a segmentation's native grid carry the organ/segmentation pair instead
//! (`t2star_liver_ideal_presco`). Some producers use the organ/segmentation
//! form even for gridded maps, so lookups try the primary form first and fall
//! back to the organ/segmentation form. Output names are always derived from
//! the primary form so the output layout does not depend on which convention a
//! given subject's data happens to use.

/// Logical name of the shared per-subject segmentation volumes table.
pub const VOLUMES_TABLE: &str = "seg_volumes";

/// Logical name of the statistics table for one (organ, segmentation) pair.
pub fn stats_table(organ: &str, segmentation: &str) -> String {
    format!("{organ}_{segmentation}_stats")
}

/// Dataset column holding a segmentation's count/volume pair in the volumes
/// table: `seg_<organ>_<segmentation>[_regrid_<grid>]`.
pub fn segmentation_column(organ: &str, segmentation: &str, grid: &str) -> String {
    if grid.is_empty() {
        format!("seg_{organ}_{segmentation}")
    } else {
        format!("seg_{organ}_{segmentation}_regrid_{grid}")
    }
}

/// Primary dataset column for a parameter map statistic:
/// `<parameter>_<grid>[_<method>]`, or the organ/segmentation form when the
/// grid is the segmentation's own.
pub fn source_column(
    organ: &str,
    segmentation: &str,
    grid: &str,
    parameter: &str,
    method: &str,
) -> String {
    let mut name = if grid.is_empty() {
        format!("{parameter}_{organ}_{segmentation}")
    } else {
        format!("{parameter}_{grid}")
    };
    if !method.is_empty() {
        name.push('_');
        name.push_str(method);
    }
    name
}

/// Fallback dataset column: always the organ/segmentation form.
pub fn source_column_fallback(
    organ: &str,
    segmentation: &str,
    parameter: &str,
    method: &str,
) -> String {
    source_column(organ, segmentation, "", parameter, method)
}

/// Output column for a leaf's voxel count: `<organ>_<segmentation>_<grid>_n`.
/// An empty grid leaves a double underscore, e.g. `liver_dixon__n`.
pub fn count_output(organ: &str, segmentation: &str, grid: &str) -> String {
    format!("{organ}_{segmentation}_{grid}_n")
}

/// Output column for a leaf's volume: `<organ>_<segmentation>_<grid>_vol`.
pub fn volume_output(organ: &str, segmentation: &str, grid: &str) -> String {
    format!("{organ}_{segmentation}_{grid}_vol")
}

/// Output column for one extracted statistic:
/// `<organ>_<segmentation>_<primary source column>_<measure suffix>`.
pub fn stat_output(organ: &str, segmentation: &str, source_column: &str, suffix: &str) -> String {
    format!("{organ}_{segmentation}_{source_column}_{suffix}")
}

/// Parameter label for the metadata header: `<parameter>[_<method>]`.
pub fn parameter_label(parameter: &str, method: &str) -> String {
    if method.is_empty() {
        parameter.to_string()
    } else {
        format!("{parameter}_{method}")
    }
}
