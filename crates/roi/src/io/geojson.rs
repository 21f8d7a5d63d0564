use std::path::Path;

use geo_types::{Coord, LineString, MultiPolygon, Polygon};
use geojson::{Feature, FeatureCollection, Geometry, Value};

use crate::{
    error::{Result, RoiError},
    set::RegionSet,
    types::{Calibration, Region},
};

impl RegionSet {
    /// Export the set as a GeoJSON FeatureCollection: one feature per region in
    /// index order, the region name as a property, calibration in foreign
    /// members.
    pub fn to_geojson(&self) -> Result<FeatureCollection> {
        let mut features = Vec::new();

        for (i, region) in self.regions().iter().enumerate() {
            let geometry = Geometry::new(multi_polygon_value(&region.geometry));

            let mut properties = serde_json::Map::new();
            properties.insert(
                "name".to_string(),
                serde_json::Value::String(region.name.clone()),
            );
            properties.insert(
                "area".to_string(),
                serde_json::Value::Number(
                    serde_json::Number::from_f64(self.area(i)?)
                        .unwrap_or(serde_json::Number::from(0)),
                ),
            );

            features.push(Feature {
                bbox: None,
                geometry: Some(geometry),
                id: Some(geojson::feature::Id::Number(serde_json::Number::from(i))),
                properties: Some(properties),
                foreign_members: None,
            });
        }

        let mut foreign_members = serde_json::Map::new();
        foreign_members.insert(
            "pixel_size".to_string(),
            serde_json::Value::Number(
                serde_json::Number::from_f64(self.calibration().pixel_size)
                    .unwrap_or(serde_json::Number::from(1)),
            ),
        );
        foreign_members.insert(
            "unit".to_string(),
            serde_json::Value::String(self.calibration().unit.clone()),
        );

        Ok(FeatureCollection {
            bbox: None,
            features,
            foreign_members: Some(foreign_members),
        })
    }

    pub fn to_geojson_string(&self) -> Result<String> {
        let collection = self.to_geojson()?;
        Ok(serde_json::to_string_pretty(&collection)?)
    }

    pub fn save_geojson<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = self.to_geojson_string()?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load a region set from a GeoJSON archive file. Fails with
    /// [`RoiError::EmptyArchive`] when the file holds no regions.
    pub fn from_geojson_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        let set = Self::from_geojson_string(&content)?;
        if set.is_empty() {
            return Err(RoiError::EmptyArchive(path.as_ref().to_path_buf()));
        }
        Ok(set)
    }

    pub fn from_geojson_string(content: &str) -> Result<Self> {
        let collection: FeatureCollection = content.parse()?;

        let calibration = match collection.foreign_members.as_ref() {
            Some(members) => {
                // A non-positive pixel size would blow up unit conversion, so
                // fall back to the uncalibrated default.
                let pixel_size = members
                    .get("pixel_size")
                    .and_then(|v| v.as_f64())
                    .filter(|v| v.is_finite() && *v > 0.0)
                    .unwrap_or(1.0);
                let unit = members
                    .get("unit")
                    .and_then(|v| v.as_str())
                    .unwrap_or("pixel")
                    .to_string();
                Calibration::new(pixel_size, unit)
            }
            None => Calibration::default(),
        };

        let mut regions = Vec::new();
        for (i, feature) in collection.features.into_iter().enumerate() {
            let geometry = feature.geometry.ok_or_else(|| {
                RoiError::MalformedArchive(format!("feature {i} has no geometry"))
            })?;
            let multi_polygon = match geometry.value {
                Value::Polygon(rings) => MultiPolygon::new(vec![polygon_from_rings(&rings)]),
                Value::MultiPolygon(polygons) => MultiPolygon::new(
                    polygons.iter().map(|rings| polygon_from_rings(rings)).collect(),
                ),
                _ => {
                    return Err(RoiError::MalformedArchive(format!(
                        "feature {i} is not a polygon geometry"
                    )));
                }
            };

            let name = feature
                .properties
                .as_ref()
                .and_then(|p| p.get("name"))
                .and_then(|v| v.as_str())
                .map(str::to_string)
                .unwrap_or_else(|| format!("Region_{i}"));

            regions.push(Region::new(name, multi_polygon));
        }

        Ok(RegionSet::new(regions, calibration))
    }
}

fn multi_polygon_value(geometry: &MultiPolygon<f64>) -> Value {
    let polygons: Vec<Vec<Vec<Vec<f64>>>> = geometry
        .0
        .iter()
        .map(|polygon| {
            let mut rings = vec![ring_coords(polygon.exterior())];
            for interior in polygon.interiors() {
                rings.push(ring_coords(interior));
            }
            rings
        })
        .collect();
    Value::MultiPolygon(polygons)
}

fn ring_coords(ring: &LineString<f64>) -> Vec<Vec<f64>> {
    ring.coords().map(|c| vec![c.x, c.y]).collect()
}

fn polygon_from_rings(rings: &[Vec<Vec<f64>>]) -> Polygon<f64> {
    let mut iter = rings.iter().map(|ring| {
        LineString::new(
            ring.iter()
                .map(|position| Coord {
                    x: position[0],
                    y: position[1],
                })
                .collect(),
        )
    });
    let exterior = iter.next().unwrap_or_else(|| LineString::new(vec![]));
    Polygon::new(exterior, iter.collect())
}
