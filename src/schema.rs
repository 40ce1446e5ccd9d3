//! Feature schema model: the static, declarative definition of every IDP to
//! extract.
//!
//! The schema is a typed tree `Organ -> Segmentation -> Grid -> [Parameter x
//! Method]`. It is built once at startup, validated structurally before any
//! subject is touched, and never mutated during a run. It is the single
//! source of truth for output-column existence: a column appears in the
//! output iff it is reachable from this tree, regardless of which subjects
//! actually have data for it.
//!
//! ## Responsibilities
//!
//! - Tree types with chained `with_*` construction
//! - Structural validation (name charset, duplicate keys, degenerate nodes)
//! - Per-organ capability flags: extended statistics and volume unit
//!   normalization
//! - The built-in DEMISTIFI definition ([`FeatureSchema::demistifi`])

use std::collections::HashSet;

use crate::error::{IdpError, Result};

/// Volumes recorded in cubic millimetres are normalized to millilitres.
const MM3_PER_ML: f64 = 1000.0;

/// A scalar summary extracted from a parameter map over a segmentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Measure {
    Mean,
    Std,
    Median,
    Mode,
    Fwhm,
}

const CORE_MEASURES: [Measure; 3] = [Measure::Mean, Measure::Std, Measure::Median];
const EXTENDED_MEASURES: [Measure; 5] = [
    Measure::Mean,
    Measure::Std,
    Measure::Median,
    Measure::Mode,
    Measure::Fwhm,
];

impl Measure {
    /// Statistic row label used by the upstream stats tables.
    pub fn row_label(self) -> &'static str {
        match self {
            Measure::Mean => "Mean",
            Measure::Std => "Std",
            Measure::Median => "Median",
            Measure::Mode => "Mode",
            Measure::Fwhm => "FWHM",
        }
    }

    /// Suffix appended to output column names, also the `measure` metadata
    /// label.
    pub fn suffix(self) -> &'static str {
        match self {
            Measure::Mean => "mean",
            Measure::Std => "std",
            Measure::Median => "median",
            Measure::Mode => "mode",
            Measure::Fwhm => "fwhm",
        }
    }
}

/// One (parameter, method) pair under a grid. `method` may be empty when the
/// parameter map carries no fitting-method qualifier.
#[derive(Debug, Clone)]
pub struct ParamDef {
    pub parameter: String,
    pub method: String,
}

impl ParamDef {
    pub fn new(parameter: &str, method: &str) -> Self {
        Self {
            parameter: parameter.to_string(),
            method: method.to_string(),
        }
    }
}

/// A reference grid a segmentation has been resampled onto. An empty name
/// means the segmentation's own native grid.
#[derive(Debug, Clone)]
pub struct GridDef {
    pub name: String,
    pub params: Vec<ParamDef>,
}

impl GridDef {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            params: Vec::new(),
        }
    }

    pub fn with_param(mut self, parameter: &str, method: &str) -> Self {
        self.params.push(ParamDef::new(parameter, method));
        self
    }
}

/// A segmentation method for an organ, with the grids it is evaluated on.
#[derive(Debug, Clone)]
pub struct SegmentationDef {
    pub name: String,
    pub grids: Vec<GridDef>,
}

impl SegmentationDef {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            grids: Vec::new(),
        }
    }

    pub fn with_grid(mut self, grid: GridDef) -> Self {
        self.grids.push(grid);
        self
    }
}

/// An organ together with its capability flags.
///
/// `extended_stats` is a declared property, not an inferred one: organs
/// carrying it additionally report mode and FWHM estimates. `volume_divisor`
/// normalizes volumes recorded in a different physical unit than the rest of
/// the table (the flagged organ's volumes are divided by it at extraction
/// time).
#[derive(Debug, Clone)]
pub struct OrganDef {
    pub name: String,
    pub extended_stats: bool,
    pub volume_divisor: Option<f64>,
    pub segmentations: Vec<SegmentationDef>,
}

impl OrganDef {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            extended_stats: false,
            volume_divisor: None,
            segmentations: Vec::new(),
        }
    }

    pub fn with_extended_stats(mut self) -> Self {
        self.extended_stats = true;
        self
    }

    pub fn with_volume_divisor(mut self, divisor: f64) -> Self {
        self.volume_divisor = Some(divisor);
        self
    }

    pub fn with_segmentation(mut self, segmentation: SegmentationDef) -> Self {
        self.segmentations.push(segmentation);
        self
    }

    /// The measure set extracted for this organ's parameters.
    pub fn measures(&self) -> &'static [Measure] {
        if self.extended_stats {
            &EXTENDED_MEASURES
        } else {
            &CORE_MEASURES
        }
    }
}

/// The full feature definition. Construct via [`FeatureSchema::new`], which
/// validates the tree, or use the built-in [`FeatureSchema::demistifi`].
#[derive(Debug, Clone)]
pub struct FeatureSchema {
    pub organs: Vec<OrganDef>,
}

impl FeatureSchema {
    pub fn new(organs: Vec<OrganDef>) -> Result<Self> {
        validate(&organs)?;
        Ok(Self { organs })
    }

    /// The DEMISTIFI IDP definition.
    ///
    /// Dataset naming conventions this definition relies on:
    ///
    /// - segmentations: `seg_<organ>_<segmentation>`, e.g. `seg_liver_dixon`
    /// - re-gridded segmentations: `seg_<organ>_<segmentation>_regrid_<grid>`
    /// - parameter maps: `<parameter>_<grid>[_<method>]`, e.g.
    ///   `t2star_pancreas_gre_presco`; maps on a segmentation's native grid
    ///   use `<parameter>_<organ>_<segmentation>` instead
    ///
    /// An organ here is the target of the scan a map was derived from; all
    /// maps for one target organ share one grid. Liver additionally reports
    /// mode/FWHM estimates; the kidney segmentations come out of the renal
    /// sub-pipeline with volumes in mm³ and are normalized to mL.
    pub fn demistifi() -> Result<Self> {
        Self::new(vec![
            OrganDef::new("liver")
                .with_extended_stats()
                .with_segmentation(
                    SegmentationDef::new("dixon")
                        .with_grid(GridDef::new("liver_molli").with_param("t1", ""))
                        .with_grid(multiecho_grid("pancreas_gre"))
                        .with_grid(multiecho_grid("kidney_gre")),
                )
                .with_segmentation(
                    SegmentationDef::new("ideal").with_grid(
                        GridDef::new("")
                            .with_param("t2star", "presco")
                            .with_param("r2star", "presco")
                            .with_param("iron", "presco")
                            .with_param("pdff", "presco"),
                    ),
                ),
            OrganDef::new("pancreas").with_segmentation(
                SegmentationDef::new("t1w")
                    .with_grid(GridDef::new("pancreas_molli").with_param("t1", ""))
                    .with_grid(
                        GridDef::new("pancreas_gre")
                            .with_param("t2star", "loglin")
                            .with_param("r2star", "loglin")
                            .with_param("pdff", "presco"),
                    ),
            ),
            kidney("kidney_left"),
            kidney("kidney_right"),
            OrganDef::new("spleen").with_segmentation(
                SegmentationDef::new("dixon").with_grid(
                    GridDef::new("")
                        .with_param("t2star", "loglin")
                        .with_param("r2star", "loglin"),
                ),
            ),
        ])
    }
}

fn multiecho_grid(grid: &str) -> GridDef {
    GridDef::new(grid)
        .with_param("t2star", "presco")
        .with_param("r2star", "presco")
        .with_param("t2star", "loglin")
        .with_param("r2star", "loglin")
        .with_param("iron", "presco")
        .with_param("pdff", "presco")
}

fn kidney(name: &str) -> OrganDef {
    OrganDef::new(name)
        .with_volume_divisor(MM3_PER_ML)
        .with_segmentation(
            SegmentationDef::new("dixon")
                .with_grid(GridDef::new("kidney_molli").with_param("t1", ""))
                .with_grid(
                    GridDef::new("kidney_gre")
                        .with_param("t2star", "loglin")
                        .with_param("r2star", "loglin"),
                ),
        )
}

fn validate(organs: &[OrganDef]) -> Result<()> {
    if organs.is_empty() {
        return Err(IdpError::SchemaInvalid(
            "schema defines no organs".to_string(),
        ));
    }
    let mut organ_names = HashSet::new();
    for organ in organs {
        check_name(&organ.name, "organ")?;
        if !organ_names.insert(organ.name.as_str()) {
            return Err(IdpError::SchemaInvalid(format!(
                "duplicate organ '{}'",
                organ.name
            )));
        }
        if let Some(divisor) = organ.volume_divisor
            && !(divisor.is_finite() && divisor > 0.0)
        {
            return Err(IdpError::SchemaInvalid(format!(
                "organ '{}' has non-positive volume divisor {divisor}",
                organ.name
            )));
        }
        if organ.segmentations.is_empty() {
            return Err(IdpError::SchemaInvalid(format!(
                "organ '{}' defines no segmentations",
                organ.name
            )));
        }
        let mut seg_names = HashSet::new();
        for segmentation in &organ.segmentations {
            check_name(&segmentation.name, "segmentation")?;
            if !seg_names.insert(segmentation.name.as_str()) {
                return Err(IdpError::SchemaInvalid(format!(
                    "duplicate segmentation '{}' under organ '{}'",
                    segmentation.name, organ.name
                )));
            }
            if segmentation.grids.is_empty() {
                return Err(IdpError::SchemaInvalid(format!(
                    "segmentation '{}_{}' defines no grids",
                    organ.name, segmentation.name
                )));
            }
            let mut grid_names = HashSet::new();
            for grid in &segmentation.grids {
                check_label(&grid.name, "grid")?;
                if !grid_names.insert(grid.name.as_str()) {
                    return Err(IdpError::SchemaInvalid(format!(
                        "duplicate grid '{}' under segmentation '{}_{}'",
                        grid.name, organ.name, segmentation.name
                    )));
                }
                let mut leaf_keys = HashSet::new();
                for param in &grid.params {
                    check_name(&param.parameter, "parameter")?;
                    check_label(&param.method, "method")?;
                    if !leaf_keys.insert((param.parameter.as_str(), param.method.as_str())) {
                        return Err(IdpError::SchemaInvalid(format!(
                            "duplicate parameter '{}'/'{}' under grid '{}_{}_{}'",
                            param.parameter,
                            param.method,
                            organ.name,
                            segmentation.name,
                            grid.name
                        )));
                    }
                }
            }
        }
    }
    Ok(())
}

fn check_name(name: &str, role: &str) -> Result<()> {
    if name.is_empty() {
        return Err(IdpError::SchemaInvalid(format!("{role} name is empty")));
    }
    check_label(name, role)
}

// Names feed file names and CSV column names, so anything outside the
// identifier charset is rejected up front.
fn check_label(name: &str, role: &str) -> Result<()> {
    if name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        Ok(())
    } else {
        Err(IdpError::SchemaInvalid(format!(
            "{role} name '{name}' contains characters outside [A-Za-z0-9_]"
        )))
    }
}
