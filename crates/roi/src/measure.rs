use std::path::Path;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{error::Result, set::RegionSet};

/// One measured region: source file, region name, area in squared calibrated
/// units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MeasurementRecord {
    pub filename: String,
    pub region_name: String,
    pub area: f64,
}

/// Append-only measurement table accumulated across a whole batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MeasurementTable {
    records: Vec<MeasurementRecord>,
}

impl MeasurementTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[MeasurementRecord] {
        &self.records
    }

    /// Append one record per region of `set`, in index order. Does not mutate
    /// the set; returns the number of rows added.
    pub fn collect(&mut self, filename: &str, set: &RegionSet) -> Result<usize> {
        let before = self.records.len();
        for index in 0..set.len() {
            self.records.push(MeasurementRecord {
                filename: filename.to_string(),
                region_name: set.get(index)?.name.clone(),
                area: set.area(index)?,
            });
        }
        Ok(self.records.len() - before)
    }

    /// Render the table as CSV with the `Filename, ROI name, ROI area` columns.
    pub fn to_csv(&self) -> String {
        let mut out = String::from("Filename,ROI name,ROI area\n");
        for record in &self.records {
            out.push_str(&format!(
                "{},{},{}\n",
                csv_field(&record.filename),
                csv_field(&record.region_name),
                record.area
            ));
        }
        out
    }

    pub fn save_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        std::fs::write(path, self.to_csv())?;
        Ok(())
    }
}

/// Quote a field when it carries a separator, quote, or newline.
fn csv_field(field: &str) -> String {
    if field.contains([',', '"', '\n']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Calibration, Region};

    fn two_region_set() -> RegionSet {
        let mut set = RegionSet::new(Vec::new(), Calibration::new(0.5, "um"));
        set.append(Region::from_exterior(
            "Nucl_1",
            vec![[0.0, 0.0], [10.0, 0.0], [10.0, 10.0], [0.0, 10.0], [0.0, 0.0]],
        ));
        set.append(Region::from_exterior(
            "Cell_1",
            vec![[0.0, 0.0], [20.0, 0.0], [20.0, 20.0], [0.0, 20.0], [0.0, 0.0]],
        ));
        set
    }

    #[test]
    fn collect_adds_one_row_per_region_in_order() {
        let set = two_region_set();
        let mut table = MeasurementTable::new();
        let added = table.collect("RoiSet_A.geojson", &set).expect("collect");
        assert_eq!(added, 2);
        assert_eq!(table.len(), 2);
        assert_eq!(table.records()[0].region_name, "Nucl_1");
        assert_eq!(table.records()[1].region_name, "Cell_1");
        assert!(table.records().iter().all(|r| r.area >= 0.0));
        // Calibrated: 10x10 px at 0.5 um/px -> 25 um^2.
        assert!((table.records()[0].area - 25.0).abs() < 1e-9);
    }

    #[test]
    fn table_accumulates_across_sources() {
        let set = two_region_set();
        let mut table = MeasurementTable::new();
        table.collect("a.geojson", &set).expect("collect");
        table.collect("b.geojson", &set).expect("collect");
        assert_eq!(table.len(), 4);
        assert_eq!(table.records()[2].filename, "b.geojson");
    }

    #[test]
    fn csv_has_header_and_quotes_awkward_fields() {
        let mut set = RegionSet::default();
        set.append(Region::from_exterior(
            "odd,name",
            vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0], [0.0, 0.0]],
        ));
        let mut table = MeasurementTable::new();
        table.collect("source.geojson", &set).expect("collect");
        let csv = table.to_csv();
        let mut lines = csv.lines();
        assert_eq!(lines.next(), Some("Filename,ROI name,ROI area"));
        assert_eq!(lines.next(), Some("source.geojson,\"odd,name\",1"));
    }
}
