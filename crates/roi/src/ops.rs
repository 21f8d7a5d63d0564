use geo_types::{Coord, LineString, MultiPolygon, Polygon};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr, VariantNames};

/// Number of vertices used to approximate a circular disk outline.
pub const DISK_VERTICES: usize = 64;

/// Boolean combination applied to a pair of regions.
#[derive(
    Debug, Clone, Copy,
    Serialize, Deserialize, JsonSchema,
    Display, EnumString, EnumIter, VariantNames, IntoStaticStr,
    PartialEq, Eq
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RegionOp {
    /// Symmetric carve: the exclusive-or of the two outlines. Equivalent to a
    /// true set-difference whenever one region is nested inside the other.
    Difference,
    /// Geometric intersection of the two outlines.
    Intersection,
}

/// Combine two outlines with the given operation.
pub fn combine(op: RegionOp, a: &MultiPolygon<f64>, b: &MultiPolygon<f64>) -> MultiPolygon<f64> {
    use geo::BooleanOps;
    match op {
        RegionOp::Difference => a.xor(b),
        RegionOp::Intersection => a.intersection(b),
    }
}

/// Grow (positive margin) or shrink (negative margin) an outline by a fixed
/// pixel margin.
///
/// Each ring is offset with a miter rule: every vertex moves along the bisector
/// of its two edge normals, so edge directions are preserved and an offset by
/// `+k` followed by `-k` restores the original vertices exactly (up to floating
/// point). Interior rings are offset with the opposite sign so a positive
/// margin always grows the enclosed area.
pub fn enlarge(geometry: &MultiPolygon<f64>, margin: f64) -> MultiPolygon<f64> {
    if margin == 0.0 {
        return geometry.clone();
    }
    MultiPolygon::new(
        geometry
            .0
            .iter()
            .map(|polygon| {
                let exterior = offset_ring(polygon.exterior(), margin);
                let interiors = polygon
                    .interiors()
                    .iter()
                    .map(|ring| offset_ring(ring, -margin))
                    .collect();
                Polygon::new(exterior, interiors)
            })
            .collect(),
    )
}

/// Closed polygonal approximation of a disk, centered at `center` (pixels).
pub fn disk(center: [f64; 2], radius_pixels: f64) -> MultiPolygon<f64> {
    let mut ring: Vec<Coord<f64>> = (0..DISK_VERTICES)
        .map(|i| {
            let theta = 2.0 * std::f64::consts::PI * i as f64 / DISK_VERTICES as f64;
            Coord {
                x: center[0] + radius_pixels * theta.cos(),
                y: center[1] + radius_pixels * theta.sin(),
            }
        })
        .collect();
    ring.push(ring[0]);
    MultiPolygon::new(vec![Polygon::new(LineString::new(ring), vec![])])
}

fn offset_ring(ring: &LineString<f64>, margin: f64) -> LineString<f64> {
    let coords = ring.0.as_slice();
    // Rings are stored closed (first == last); offset the unique vertices only.
    let n = if coords.len() >= 2 && coords[0] == coords[coords.len() - 1] {
        coords.len() - 1
    } else {
        coords.len()
    };
    if n < 3 {
        return ring.clone();
    }
    let pts = &coords[..n];

    let orientation = if shoelace(pts) >= 0.0 { 1.0 } else { -1.0 };

    let mut out: Vec<Coord<f64>> = Vec::with_capacity(n + 1);
    for i in 0..n {
        let prev = pts[(i + n - 1) % n];
        let cur = pts[i];
        let next = pts[(i + 1) % n];

        let n1 = edge_normal(prev, cur, orientation);
        let n2 = edge_normal(cur, next, orientation);
        let offset = miter(n1, n2);
        out.push(Coord {
            x: cur.x + margin * offset.0,
            y: cur.y + margin * offset.1,
        });
    }
    out.push(out[0]);
    LineString::new(out)
}

/// Miter offset direction for a vertex whose adjacent edges have unit outward
/// normals `n1` and `n2`: `(n1 + n2) / (1 + n1·n2)`. Collapses to the shared
/// normal on straight runs; guarded against near-reversal spikes.
fn miter(n1: (f64, f64), n2: (f64, f64)) -> (f64, f64) {
    let dot = n1.0 * n2.0 + n1.1 * n2.1;
    let denom = 1.0 + dot;
    if denom.abs() < 1e-9 {
        n1
    } else {
        ((n1.0 + n2.0) / denom, (n1.1 + n2.1) / denom)
    }
}

/// Unit normal of the edge `a -> b`, pointing out of the ring's enclosed area.
fn edge_normal(a: Coord<f64>, b: Coord<f64>, orientation: f64) -> (f64, f64) {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let len = (dx * dx + dy * dy).sqrt();
    if len < 1e-12 {
        return (0.0, 0.0);
    }
    (orientation * dy / len, -orientation * dx / len)
}

fn shoelace(pts: &[Coord<f64>]) -> f64 {
    let n = pts.len();
    let mut twice_area = 0.0;
    for i in 0..n {
        let j = (i + 1) % n;
        twice_area += pts[i].x * pts[j].y - pts[j].x * pts[i].y;
    }
    twice_area / 2.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::Area;

    fn square(x: f64, y: f64, side: f64) -> MultiPolygon<f64> {
        let ring = vec![
            Coord { x, y },
            Coord { x: x + side, y },
            Coord { x: x + side, y: y + side },
            Coord { x, y: y + side },
            Coord { x, y },
        ];
        MultiPolygon::new(vec![Polygon::new(LineString::new(ring), vec![])])
    }

    #[test]
    fn difference_of_nested_squares_is_annulus() {
        let outer = square(0.0, 0.0, 20.0);
        let inner = square(5.0, 5.0, 10.0);
        let carved = combine(RegionOp::Difference, &outer, &inner);
        assert!((carved.unsigned_area() - 300.0).abs() < 1e-6);
    }

    #[test]
    fn intersection_of_disjoint_squares_is_empty() {
        let a = square(0.0, 0.0, 10.0);
        let b = square(100.0, 100.0, 10.0);
        let both = combine(RegionOp::Intersection, &a, &b);
        assert!(both.unsigned_area() < 1e-9);
    }

    #[test]
    fn enlarge_grows_and_shrink_restores() {
        let original = square(10.0, 10.0, 20.0);
        let grown = enlarge(&original, 3.0);
        // 20x20 grown by 3 on every side -> 26x26
        assert!((grown.unsigned_area() - 676.0).abs() < 1e-6);

        let restored = enlarge(&grown, -3.0);
        assert!((restored.unsigned_area() - original.unsigned_area()).abs() < 1e-9);
        for (a, b) in restored.0[0]
            .exterior()
            .coords()
            .zip(original.0[0].exterior().coords())
        {
            assert!((a.x - b.x).abs() < 1e-9);
            assert!((a.y - b.y).abs() < 1e-9);
        }
    }

    #[test]
    fn enlarge_round_trip_on_clockwise_ring() {
        // Same square with reversed winding; the offset must still grow it.
        let ring = vec![
            Coord { x: 0.0, y: 0.0 },
            Coord { x: 0.0, y: 10.0 },
            Coord { x: 10.0, y: 10.0 },
            Coord { x: 10.0, y: 0.0 },
            Coord { x: 0.0, y: 0.0 },
        ];
        let cw = MultiPolygon::new(vec![Polygon::new(LineString::new(ring), vec![])]);
        let grown = enlarge(&cw, 2.0);
        assert!((grown.unsigned_area() - 196.0).abs() < 1e-6);
        let restored = enlarge(&grown, -2.0);
        assert!((restored.unsigned_area() - 100.0).abs() < 1e-9);
    }

    #[test]
    fn disk_area_approximates_circle() {
        let d = disk([50.0, 50.0], 10.0);
        let ideal = std::f64::consts::PI * 100.0;
        // A 64-gon underestimates the circle by well under 1%.
        assert!((d.unsigned_area() - ideal).abs() / ideal < 0.01);
    }

    #[test]
    fn region_op_round_trips_through_serde() {
        let json = serde_json::to_string(&RegionOp::Intersection).expect("serialize");
        assert_eq!(json, "\"intersection\"");
        let parsed: RegionOp = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(parsed, RegionOp::Intersection);
    }
}
