use crate::{
    error::{Result, RoiError},
    ops::{self, RegionOp},
    types::{Calibration, Region},
};

/// An ordered collection of regions loaded from one annotation source, sharing
/// one spatial calibration.
///
/// This is a plain owned value passed through the pipeline by argument. There
/// is no process-wide manager and no implicit "current selection": every
/// operation takes explicit region indices.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionSet {
    regions: Vec<Region>,
    calibration: Calibration,
}

impl RegionSet {
    pub fn new(regions: Vec<Region>, calibration: Calibration) -> Self {
        Self {
            regions,
            calibration,
        }
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn calibration(&self) -> &Calibration {
        &self.calibration
    }

    pub fn set_calibration(&mut self, calibration: Calibration) {
        self.calibration = calibration;
    }

    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    pub fn get(&self, index: usize) -> Result<&Region> {
        self.regions.get(index).ok_or(RoiError::IndexOutOfRange {
            index,
            len: self.regions.len(),
        })
    }

    /// Read-only view over a set of indices, in the order given.
    pub fn select(&self, indices: &[usize]) -> Result<Vec<&Region>> {
        indices.iter().map(|&i| self.get(i)).collect()
    }

    /// Append a region at the end of the set, returning its index. Existing
    /// regions are never reordered.
    pub fn append(&mut self, region: Region) -> usize {
        self.regions.push(region);
        self.regions.len() - 1
    }

    pub fn rename(&mut self, index: usize, name: impl Into<String>) -> Result<()> {
        let len = self.regions.len();
        let region = self
            .regions
            .get_mut(index)
            .ok_or(RoiError::IndexOutOfRange { index, len })?;
        region.name = name.into();
        Ok(())
    }

    /// Remove and return the region at `index`. Only used for scratch regions
    /// (the disk outline) that must never be measured or persisted.
    pub fn remove(&mut self, index: usize) -> Result<Region> {
        if index >= self.regions.len() {
            return Err(RoiError::IndexOutOfRange {
                index,
                len: self.regions.len(),
            });
        }
        Ok(self.regions.remove(index))
    }

    /// Combine two regions with a boolean operation, producing a new region
    /// named after the operation (callers rename it once appended).
    pub fn combine(&self, op: RegionOp, a: usize, b: usize) -> Result<Region> {
        let selected = self.select(&[a, b])?;
        let geometry = ops::combine(op, &selected[0].geometry, &selected[1].geometry);
        Ok(Region::new(op.to_string(), geometry))
    }

    /// Symmetric carve of regions `a` and `b` (cell and nucleus when nested).
    pub fn difference(&self, a: usize, b: usize) -> Result<Region> {
        self.combine(RegionOp::Difference, a, b)
    }

    /// Geometric intersection of regions `a` and `b`. `None` only when the two
    /// do not overlap at all; a degenerate zero-area overlap is still a region
    /// and is returned as such.
    pub fn intersection(&self, a: usize, b: usize) -> Result<Option<Region>> {
        let region = self.combine(RegionOp::Intersection, a, b)?;
        Ok(if region.geometry.0.is_empty() {
            None
        } else {
            Some(region)
        })
    }

    /// Grow or shrink a region's outline in place by a pixel margin.
    pub fn enlarge(&mut self, index: usize, margin_pixels: f64) -> Result<()> {
        let len = self.regions.len();
        let region = self
            .regions
            .get_mut(index)
            .ok_or(RoiError::IndexOutOfRange { index, len })?;
        region.geometry = ops::enlarge(&region.geometry, margin_pixels);
        Ok(())
    }

    /// Centroid in calibrated units.
    pub fn centroid(&self, index: usize) -> Result<[f64; 2]> {
        let [x, y] = self.get(index)?.pixel_centroid();
        Ok([x * self.calibration.pixel_size, y * self.calibration.pixel_size])
    }

    /// Area in squared calibrated units.
    pub fn area(&self, index: usize) -> Result<f64> {
        Ok(self.get(index)?.pixel_area() * self.calibration.area_scale())
    }
}

impl Default for RegionSet {
    fn default() -> Self {
        Self::new(Vec::new(), Calibration::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

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

    #[test]
    fn append_returns_new_index_and_preserves_order() {
        let mut set = RegionSet::default();
        assert_eq!(set.append(square("a", 0.0, 0.0, 1.0)), 0);
        assert_eq!(set.append(square("b", 2.0, 0.0, 1.0)), 1);
        assert_eq!(set.get(0).expect("index 0").name, "a");
        assert_eq!(set.get(1).expect("index 1").name, "b");
    }

    #[test]
    fn rename_out_of_range_is_an_error() {
        let mut set = RegionSet::default();
        set.append(square("a", 0.0, 0.0, 1.0));
        assert!(matches!(
            set.rename(3, "x"),
            Err(RoiError::IndexOutOfRange { index: 3, len: 1 })
        ));
    }

    #[test]
    fn difference_carves_nested_pair() {
        let mut set = RegionSet::default();
        set.append(square("nucleus", 5.0, 5.0, 10.0));
        set.append(square("cell", 0.0, 0.0, 20.0));
        let cyto = set.difference(1, 0).expect("combine");
        assert!((cyto.pixel_area() - 300.0).abs() < 1e-6);
    }

    #[test]
    fn intersection_of_disjoint_regions_is_none() {
        let mut set = RegionSet::default();
        set.append(square("a", 0.0, 0.0, 5.0));
        set.append(square("b", 50.0, 50.0, 5.0));
        assert!(set.intersection(0, 1).expect("combine").is_none());
    }

    #[test]
    fn intersection_of_overlapping_regions_is_some() {
        let mut set = RegionSet::default();
        set.append(square("a", 0.0, 0.0, 10.0));
        set.append(square("b", 5.0, 5.0, 10.0));
        let overlap = set.intersection(0, 1).expect("combine").expect("overlap");
        assert!((overlap.pixel_area() - 25.0).abs() < 1e-6);
    }

    #[test]
    fn calibrated_area_and_centroid() {
        let mut set = RegionSet::new(Vec::new(), Calibration::new(0.5, "um"));
        set.append(square("sq", 0.0, 0.0, 10.0));
        let area = set.area(0).expect("area");
        assert!((area - 25.0).abs() < 1e-9);
        let [cx, cy] = set.centroid(0).expect("centroid");
        assert!((cx - 2.5).abs() < 1e-9);
        assert!((cy - 2.5).abs() < 1e-9);
    }

    #[test]
    fn enlarge_round_trip_restores_area() {
        let mut set = RegionSet::default();
        set.append(square("sq", 10.0, 10.0, 10.0));
        let before = set.area(0).expect("area");
        set.enlarge(0, 4.0).expect("grow");
        assert!(set.area(0).expect("area") > before);
        set.enlarge(0, -4.0).expect("shrink");
        assert!((set.area(0).expect("area") - before).abs() < 1e-9);
    }
}
