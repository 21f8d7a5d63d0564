use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{
    error::{Result, RoiError},
    ops,
    set::RegionSet,
    types::Region,
};

/// Tolerance for the nesting check on carved cytoplasm areas.
const AREA_EPS: f64 = 1e-6;

/// Optional disk constraint for a second, radius-limited cytoplasm variant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DiskConstraint {
    /// Disk radius in physical units; converted to pixels through the set's
    /// calibration when the disk is constructed.
    pub radius: f64,
}

/// Configuration for one derivation pass over a loaded region set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DeriveConfig {
    /// Number of leading regions excluded from pairing (1 when a background
    /// region precedes the data).
    pub skip: usize,
    /// Pixel margin applied to the nucleus before carving cytoplasm, to keep a
    /// rim of nuclear signal bleed out of the cytoplasm measurement.
    pub dilate: f64,
    /// When set, also produce `CytoConstrained_*` regions limited to a disk
    /// around each nucleus centroid.
    pub disk: Option<DiskConstraint>,
}

impl Default for DeriveConfig {
    fn default() -> Self {
        Self {
            skip: 1,
            dilate: 3.0,
            disk: None,
        }
    }
}

/// One (nucleus, cell) pair produced by [`nucleus_cell_pairs`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellPair {
    /// 1-based running cell number, used in derived region names.
    pub cell_number: usize,
    pub nucleus: usize,
    pub cell: usize,
}

/// Map a flat region sequence plus a skip count to the (nucleus, cell) index
/// pairs it contains.
///
/// Rejects the whole sequence when the remaining count is odd: pairing is a
/// hard precondition, not a partial-failure case. Pairs are taken from
/// consecutive indices starting at `skip`, stopping at `count - skip`.
pub fn nucleus_cell_pairs(
    count: usize,
    skip: usize,
) -> Result<impl Iterator<Item = CellPair>> {
    let paired = count
        .checked_sub(skip)
        .ok_or(RoiError::InvalidPairing { count, skip })?;
    if paired % 2 != 0 {
        return Err(RoiError::InvalidPairing { count, skip });
    }
    let end = count - skip;
    Ok((skip..end)
        .step_by(2)
        .enumerate()
        .map(move |(k, nucleus)| CellPair {
            cell_number: k + 1,
            nucleus,
            cell: nucleus + 1,
        }))
}

/// Outcome of one derivation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeriveSummary {
    /// Number of (nucleus, cell) pairs processed.
    pub cells: usize,
    /// Number of disk-constrained cytoplasm regions actually produced.
    pub constrained: usize,
}

/// Derive cytoplasm regions for every (nucleus, cell) pair in `set`.
///
/// For each pair: dilate the nucleus, rename the pair, append the carved
/// cytoplasm (`Cyto_k`), optionally append the disk-constrained variant
/// (`CytoConstrained_k`), then restore the nucleus to its original extent so
/// later measurement sees undilated geometry. With `skip == 1` the leading
/// region is renamed to `Background` after the loop.
pub fn derive_cytoplasm(set: &mut RegionSet, config: &DeriveConfig) -> Result<DeriveSummary> {
    let pairs: Vec<CellPair> = nucleus_cell_pairs(set.len(), config.skip)?.collect();
    let mut constrained = 0;

    for pair in &pairs {
        debug!(
            cell = pair.cell_number,
            nucleus_index = pair.nucleus,
            cell_index = pair.cell,
            "processing nucleus/cell pair"
        );

        // Centroid must be captured before dilation: the disk is centered on
        // the original nucleus, not the dilated one.
        let disk_center = if config.disk.is_some() {
            Some(set.get(pair.nucleus)?.pixel_centroid())
        } else {
            None
        };

        set.enlarge(pair.nucleus, config.dilate)?;
        set.rename(pair.nucleus, format!("Nucl_{}", pair.cell_number))?;
        set.rename(pair.cell, format!("Cell_{}", pair.cell_number))?;

        let cyto = set.difference(pair.cell, pair.nucleus)?;

        let cell_area = set.get(pair.cell)?.pixel_area();
        let nucleus_area = set.get(pair.nucleus)?.pixel_area();
        if cyto.pixel_area() > cell_area - nucleus_area + AREA_EPS {
            warn!(
                cell = pair.cell_number,
                "nucleus is not fully contained in its cell; carved cytoplasm is an exclusive-or, not a set difference"
            );
        }

        let cyto_index = set.append(cyto);
        set.rename(cyto_index, format!("Cyto_{}", pair.cell_number))?;

        if let (Some(disk), Some(center)) = (config.disk, disk_center) {
            let radius_pixels = set.calibration().to_pixels(disk.radius);
            let scratch = set.append(Region::new("Disk", ops::disk(center, radius_pixels)));
            let intersected = set.intersection(cyto_index, scratch)?;
            // The scratch disk is never measured or persisted.
            set.remove(scratch)?;
            match intersected {
                // Boundary slivers left by the boolean op count as no overlap
                // here; only a constrained region with real extent is kept.
                Some(region) if !region.is_empty() => {
                    let index = set.append(region);
                    set.rename(index, format!("CytoConstrained_{}", pair.cell_number))?;
                    constrained += 1;
                }
                _ => {
                    warn!(
                        cell = pair.cell_number,
                        "disk does not intersect the cytoplasm; no constrained region produced"
                    );
                }
            }
        }

        // Restore the nucleus to its pre-dilation extent; downstream
        // measurement and later centroids must see the original geometry.
        set.enlarge(pair.nucleus, -config.dilate)?;
    }

    if config.skip == 1 {
        set.rename(0, "Background")?;
    }

    info!(
        cells = pairs.len(),
        constrained,
        total_regions = set.len(),
        "derived cytoplasm regions"
    );
    Ok(DeriveSummary {
        cells: pairs.len(),
        constrained,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Calibration;

    fn square(name: &str, x: f64, y: f64, side: f64) -> Region {
        Region::from_exterior(
            name,
            vec![
                [x, y],
                [x + side, y],
                [x + side, y + side],
                [x, y + side],
                [x, y],
            ],
        )
    }

    /// Background plus `cells` nested nucleus/cell pairs spaced along x.
    fn fixture(cells: usize) -> RegionSet {
        let mut set = RegionSet::default();
        set.append(square("bg", 0.0, 100.0, 5.0));
        for k in 0..cells {
            let offset = 50.0 * k as f64;
            set.append(square("n", offset + 20.0, 20.0, 10.0));
            set.append(square("c", offset + 10.0, 10.0, 30.0));
        }
        set
    }

    #[test]
    fn pairing_rejects_odd_counts() {
        assert!(nucleus_cell_pairs(6, 1).is_err());
        assert!(nucleus_cell_pairs(5, 0).is_err());
        assert!(nucleus_cell_pairs(0, 1).is_err());
    }

    #[test]
    fn pairing_yields_consecutive_pairs() {
        let pairs: Vec<CellPair> = nucleus_cell_pairs(5, 1).expect("valid").collect();
        assert_eq!(pairs.len(), 2);
        assert_eq!((pairs[0].nucleus, pairs[0].cell), (1, 2));
        assert_eq!((pairs[1].nucleus, pairs[1].cell), (3, 4));
        assert_eq!(pairs[1].cell_number, 2);
    }

    #[test]
    fn odd_set_is_rejected_wholesale() {
        let mut set = fixture(2);
        set.append(square("stray", 200.0, 200.0, 5.0));
        let before = set.clone();
        let config = DeriveConfig::default();
        assert!(derive_cytoplasm(&mut set, &config).is_err());
        // Nothing was appended or renamed.
        assert_eq!(set, before);
    }

    #[test]
    fn naming_is_deterministic() {
        let mut set = fixture(2);
        let config = DeriveConfig {
            skip: 1,
            dilate: 3.0,
            disk: None,
        };
        let summary = derive_cytoplasm(&mut set, &config).expect("derive");
        assert_eq!(summary.cells, 2);
        let names: Vec<&str> = set.regions().iter().map(|r| r.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["Background", "Nucl_1", "Cell_1", "Nucl_2", "Cell_2", "Cyto_1", "Cyto_2"]
        );
    }

    #[test]
    fn five_region_scenario_with_no_dilation() {
        let mut set = fixture(2);
        let config = DeriveConfig {
            skip: 1,
            dilate: 0.0,
            disk: None,
        };
        let summary = derive_cytoplasm(&mut set, &config).expect("derive");
        assert_eq!(summary.cells, 2);
        assert_eq!(set.len(), 7);
        assert_eq!(set.get(0).expect("bg").name, "Background");
        assert_eq!(set.get(5).expect("cyto 1").name, "Cyto_1");
        assert_eq!(set.get(6).expect("cyto 2").name, "Cyto_2");
    }

    #[test]
    fn cytoplasm_area_accounts_for_dilated_nucleus() {
        let mut set = fixture(1);
        let config = DeriveConfig {
            skip: 1,
            dilate: 3.0,
            disk: None,
        };
        derive_cytoplasm(&mut set, &config).expect("derive");
        // Cell 30x30, nucleus dilated from 10x10 to 16x16.
        let cyto = set.get(3).expect("cyto");
        assert_eq!(cyto.name, "Cyto_1");
        assert!((cyto.pixel_area() - (900.0 - 256.0)).abs() < 1e-6);
    }

    #[test]
    fn nucleus_is_restored_after_derivation() {
        let mut set = fixture(1);
        let before = set.get(1).expect("nucleus").pixel_area();
        let config = DeriveConfig {
            skip: 1,
            dilate: 5.0,
            disk: None,
        };
        derive_cytoplasm(&mut set, &config).expect("derive");
        let after = set.get(1).expect("nucleus").pixel_area();
        assert!((after - before).abs() < 1e-9);
    }

    #[test]
    fn disk_constraint_appends_constrained_region() {
        let mut set = fixture(1);
        set.set_calibration(Calibration::new(0.5, "um"));
        let config = DeriveConfig {
            skip: 1,
            dilate: 3.0,
            disk: Some(DiskConstraint { radius: 5.0 }),
        };
        let summary = derive_cytoplasm(&mut set, &config).expect("derive");
        assert_eq!(summary.constrained, 1);
        assert_eq!(set.len(), 5);
        let names: Vec<&str> = set.regions().iter().map(|r| r.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["Background", "Nucl_1", "Cell_1", "Cyto_1", "CytoConstrained_1"]
        );
    }

    #[test]
    fn empty_disk_intersection_is_skipped_not_fatal() {
        let mut set = fixture(1);
        // Disk of 2px sits entirely inside the dilated (16x16) nucleus, so it
        // cannot touch the cytoplasm.
        let config = DeriveConfig {
            skip: 1,
            dilate: 3.0,
            disk: Some(DiskConstraint { radius: 2.0 }),
        };
        let summary = derive_cytoplasm(&mut set, &config).expect("derive");
        assert_eq!(summary.cells, 1);
        assert_eq!(summary.constrained, 0);
        assert!(!set.regions().iter().any(|r| r.name.starts_with("CytoConstrained")));
        // Scratch disk was removed as well.
        assert_eq!(set.len(), 4);
    }
}
