//! Tabulation plan: the frozen output column universe.
//!
//! The plan is computed from the feature schema alone, before any subject
//! data is touched, so the column set and order are identical no matter which
//! subjects exist, which files they have, or what order they are visited in.
//! Leaves and columns are produced in one pass over the schema; extraction
//! walks the same leaf sequence and therefore yields cells positionally
//! aligned to [`TabulationPlan::columns`] by construction.

use std::collections::HashSet;

use crate::{
    error::{IdpError, Result},
    naming,
    schema::{FeatureSchema, GridDef, Measure, OrganDef, SegmentationDef},
};

/// Metadata labels carried by one output column, one per header row.
#[derive(Debug, Clone)]
pub struct ColumnMeta {
    pub organ: String,
    pub segmentation: String,
    pub grid: String,
    pub parameter: String,
    pub measure: String,
}

#[derive(Debug, Clone)]
pub struct ColumnDef {
    pub name: String,
    pub meta: ColumnMeta,
}

/// Lookup recipe for one (parameter, method) leaf entry. `fallback` is `None`
/// when the primary column already uses the organ/segmentation form.
#[derive(Debug, Clone)]
pub struct ParamPlan {
    pub primary: String,
    pub fallback: Option<String>,
    pub measures: &'static [Measure],
}

/// Extraction recipe for one (organ, segmentation, grid) leaf: which volumes
/// column and stats table to consult, and which parameter columns to pull.
#[derive(Debug, Clone)]
pub struct LeafPlan {
    pub organ: String,
    pub segmentation: String,
    pub grid: String,
    pub volume_column: String,
    pub volume_divisor: Option<f64>,
    pub stats_table: String,
    pub params: Vec<ParamPlan>,
}

#[derive(Debug)]
pub struct TabulationPlan {
    pub leaves: Vec<LeafPlan>,
    pub columns: Vec<ColumnDef>,
}

impl TabulationPlan {
    /// Walks the schema in definition order and lays out every output column.
    /// Fails if two schema paths generate the same output name, which the
    /// per-level duplicate checks cannot rule out once names contain
    /// underscores.
    pub fn build(schema: &FeatureSchema) -> Result<Self> {
        let mut leaves = Vec::new();
        let mut columns: Vec<ColumnDef> = Vec::new();
        let mut seen = HashSet::new();
        for organ in &schema.organs {
            let measures = organ.measures();
            for segmentation in &organ.segmentations {
                let stats_table = naming::stats_table(&organ.name, &segmentation.name);
                for grid in &segmentation.grids {
                    push_column(
                        &mut columns,
                        &mut seen,
                        naming::count_output(&organ.name, &segmentation.name, &grid.name),
                        meta(organ, segmentation, grid, "", "n"),
                    )?;
                    push_column(
                        &mut columns,
                        &mut seen,
                        naming::volume_output(&organ.name, &segmentation.name, &grid.name),
                        meta(organ, segmentation, grid, "", "vol"),
                    )?;
                    let mut params = Vec::new();
                    for param in &grid.params {
                        let primary = naming::source_column(
                            &organ.name,
                            &segmentation.name,
                            &grid.name,
                            &param.parameter,
                            &param.method,
                        );
                        let fallback = if grid.name.is_empty() {
                            None
                        } else {
                            Some(naming::source_column_fallback(
                                &organ.name,
                                &segmentation.name,
                                &param.parameter,
                                &param.method,
                            ))
                        };
                        let label = naming::parameter_label(&param.parameter, &param.method);
                        for measure in measures {
                            push_column(
                                &mut columns,
                                &mut seen,
                                naming::stat_output(
                                    &organ.name,
                                    &segmentation.name,
                                    &primary,
                                    measure.suffix(),
                                ),
                                meta(organ, segmentation, grid, &label, measure.suffix()),
                            )?;
                        }
                        params.push(ParamPlan {
                            primary,
                            fallback,
                            measures,
                        });
                    }
                    leaves.push(LeafPlan {
                        organ: organ.name.clone(),
                        segmentation: segmentation.name.clone(),
                        grid: grid.name.clone(),
                        volume_column: naming::segmentation_column(
                            &organ.name,
                            &segmentation.name,
                            &grid.name,
                        ),
                        volume_divisor: organ.volume_divisor,
                        stats_table: stats_table.clone(),
                        params,
                    });
                }
            }
        }
        Ok(Self { leaves, columns })
    }

    /// Number of value cells per subject row, excluding the subject ID.
    pub fn width(&self) -> usize {
        self.columns.len()
    }
}

fn meta(
    organ: &OrganDef,
    segmentation: &SegmentationDef,
    grid: &GridDef,
    parameter: &str,
    measure: &str,
) -> ColumnMeta {
    ColumnMeta {
        organ: organ.name.clone(),
        segmentation: segmentation.name.clone(),
        grid: grid.name.clone(),
        parameter: parameter.to_string(),
        measure: measure.to_string(),
    }
}

fn push_column(
    columns: &mut Vec<ColumnDef>,
    seen: &mut HashSet<String>,
    name: String,
    meta: ColumnMeta,
) -> Result<()> {
    if !seen.insert(name.clone()) {
        return Err(IdpError::SchemaInvalid(format!(
            "output column '{name}' is generated by more than one schema path"
        )));
    }
    columns.push(ColumnDef { name, meta });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn demistifi_plan_starts_with_liver_molli_leaf() {
        let schema = FeatureSchema::demistifi().unwrap();
        let plan = TabulationPlan::build(&schema).unwrap();

        let names: Vec<&str> = plan.columns.iter().map(|c| c.name.as_str()).collect();
        // liver is an extended-stats organ, so t1 yields five statistics.
        assert_eq!(
            &names[..7],
            &[
                "liver_dixon_liver_molli_n",
                "liver_dixon_liver_molli_vol",
                "liver_dixon_t1_liver_molli_mean",
                "liver_dixon_t1_liver_molli_std",
                "liver_dixon_t1_liver_molli_median",
                "liver_dixon_t1_liver_molli_mode",
                "liver_dixon_t1_liver_molli_fwhm",
            ]
        );
    }

    #[test]
    fn count_column_meta_has_blank_parameter() {
        let schema = FeatureSchema::demistifi().unwrap();
        let plan = TabulationPlan::build(&schema).unwrap();

        let count = &plan.columns[0];
        assert_eq!(count.meta.organ, "liver");
        assert_eq!(count.meta.segmentation, "dixon");
        assert_eq!(count.meta.grid, "liver_molli");
        assert_eq!(count.meta.parameter, "");
        assert_eq!(count.meta.measure, "n");
    }

    #[test]
    fn fallback_is_only_planned_for_gridded_leaves() {
        let schema = FeatureSchema::demistifi().unwrap();
        let plan = TabulationPlan::build(&schema).unwrap();

        let gridded = plan
            .leaves
            .iter()
            .find(|leaf| leaf.grid == "pancreas_gre" && leaf.organ == "liver")
            .unwrap();
        assert_eq!(gridded.params[0].primary, "t2star_pancreas_gre_presco");
        assert_eq!(
            gridded.params[0].fallback.as_deref(),
            Some("t2star_liver_dixon_presco")
        );

        let native = plan
            .leaves
            .iter()
            .find(|leaf| leaf.organ == "liver" && leaf.segmentation == "ideal")
            .unwrap();
        assert_eq!(native.params[0].primary, "t2star_liver_ideal_presco");
        assert!(native.params[0].fallback.is_none());
    }

    #[test]
    fn kidney_leaves_carry_the_volume_divisor() {
        let schema = FeatureSchema::demistifi().unwrap();
        let plan = TabulationPlan::build(&schema).unwrap();

        for leaf in &plan.leaves {
            if leaf.organ.starts_with("kidney") {
                assert_eq!(leaf.volume_divisor, Some(1000.0));
            } else {
                assert_eq!(leaf.volume_divisor, None);
            }
        }
    }

    #[test]
    fn colliding_output_names_are_rejected() {
        // Distinct schema paths, same generated name: a_b/c and a/b_c both
        // produce the count column "a_b_c__n".
        let schema = FeatureSchema::new(vec![
            OrganDef::new("a_b")
                .with_segmentation(SegmentationDef::new("c").with_grid(GridDef::new(""))),
            OrganDef::new("a")
                .with_segmentation(SegmentationDef::new("b_c").with_grid(GridDef::new(""))),
        ])
        .unwrap();

        let err = TabulationPlan::build(&schema).unwrap_err();
        assert!(matches!(err, IdpError::SchemaInvalid(_)));
    }

    fn schema_strategy() -> impl Strategy<Value = FeatureSchema> {
        proptest::collection::vec(
            (
                any::<bool>(),
                proptest::collection::vec(proptest::collection::vec(0usize..4, 1..3), 1..3),
            ),
            1..4,
        )
        .prop_map(|organs| {
            let organs = organs
                .into_iter()
                .enumerate()
                .map(|(oi, (extended, segs))| {
                    let mut organ = OrganDef::new(&format!("organ{oi}"));
                    if extended {
                        organ = organ.with_extended_stats();
                    }
                    for (si, grids) in segs.into_iter().enumerate() {
                        let mut seg = SegmentationDef::new(&format!("seg{si}"));
                        for (gi, n_params) in grids.into_iter().enumerate() {
                            let mut grid = GridDef::new(&format!("grid{gi}"));
                            for pi in 0..n_params {
                                grid = grid.with_param(&format!("param{pi}"), "m");
                            }
                            seg = seg.with_grid(grid);
                        }
                        organ = organ.with_segmentation(seg);
                    }
                    organ
                })
                .collect();
            FeatureSchema::new(organs).expect("generated schema is valid")
        })
    }

    proptest! {
        #[test]
        fn plan_width_matches_schema_shape(schema in schema_strategy()) {
            let plan = TabulationPlan::build(&schema).expect("plan builds");

            let expected: usize = schema
                .organs
                .iter()
                .flat_map(|organ| {
                    organ.segmentations.iter().flat_map(move |seg| {
                        seg.grids
                            .iter()
                            .map(move |grid| 2 + grid.params.len() * organ.measures().len())
                    })
                })
                .sum();
            prop_assert_eq!(plan.width(), expected);

            let unique: HashSet<&str> =
                plan.columns.iter().map(|c| c.name.as_str()).collect();
            prop_assert_eq!(unique.len(), plan.width());
        }
    }
}
