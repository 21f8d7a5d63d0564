use geo_types::{Coord, LineString, MultiPolygon, Polygon};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Spatial calibration shared by every region in one annotation set.
///
/// Geometry is always stored in pixel coordinates; calibrated queries scale by
/// `pixel_size` (physical units per pixel).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Calibration {
    pub pixel_size: f64,
    pub unit: String,
}

impl Calibration {
    pub fn new(pixel_size: f64, unit: impl Into<String>) -> Self {
        Self {
            pixel_size,
            unit: unit.into(),
        }
    }

    /// Convert a physical-unit length to pixels.
    pub fn to_pixels(&self, length: f64) -> f64 {
        length / self.pixel_size
    }

    /// Squared scale factor for converting pixel areas to calibrated areas.
    pub fn area_scale(&self) -> f64 {
        self.pixel_size * self.pixel_size
    }
}

impl Default for Calibration {
    fn default() -> Self {
        Self {
            pixel_size: 1.0,
            unit: "pixel".to_string(),
        }
    }
}

/// A single labeled, closed planar region.
///
/// The outline may consist of several disjoint parts and parts may carry holes
/// (a carved cytoplasm is an annulus), so the geometry is a `MultiPolygon`.
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    pub name: String,
    pub geometry: MultiPolygon<f64>,
}

impl Region {
    pub fn new(name: impl Into<String>, geometry: MultiPolygon<f64>) -> Self {
        Self {
            name: name.into(),
            geometry,
        }
    }

    /// Build a region from a single closed exterior ring.
    pub fn from_exterior(name: impl Into<String>, exterior: Vec<[f64; 2]>) -> Self {
        let ring: Vec<Coord<f64>> = exterior.iter().map(|&[x, y]| Coord { x, y }).collect();
        let polygon = Polygon::new(LineString::new(ring), vec![]);
        Self::new(name, MultiPolygon::new(vec![polygon]))
    }

    /// Area in square pixels.
    pub fn pixel_area(&self) -> f64 {
        use geo::Area;
        self.geometry.unsigned_area()
    }

    /// Centroid in pixel coordinates.
    pub fn pixel_centroid(&self) -> [f64; 2] {
        use geo::Centroid;
        if let Some(centroid) = self.geometry.centroid() {
            [centroid.x(), centroid.y()]
        } else {
            // Fallback to bounding box center
            let (min, max) = self.bounding_box();
            [(min[0] + max[0]) / 2.0, (min[1] + max[1]) / 2.0]
        }
    }

    /// Axis-aligned bounding box in pixel coordinates.
    pub fn bounding_box(&self) -> ([f64; 2], [f64; 2]) {
        use geo::BoundingRect;
        match self.geometry.bounding_rect() {
            Some(rect) => ([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]),
            None => ([0.0, 0.0], [0.0, 0.0]),
        }
    }

    /// True when the outline encloses no area. Boolean combinations can leave
    /// degenerate slivers along shared boundaries, so a small tolerance is
    /// applied rather than an exact zero test.
    pub fn is_empty(&self) -> bool {
        self.geometry.0.is_empty() || self.pixel_area() < 1e-9
    }
}
