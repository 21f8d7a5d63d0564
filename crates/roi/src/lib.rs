//! # Cytoplasm ROI Derivation Library
//!
//! Derives per-cell cytoplasm regions from paired nucleus/whole-cell
//! annotations, optionally constrains them to a fixed-radius disk around the
//! nucleus centroid, and reports per-region area measurements for a batch of
//! annotation sets.
//!
//! ## Core Features
//!
//! - **Region-set algebra**: ordered, calibrated region collections with
//!   boolean combination, margin enlargement, and renaming
//! - **Cytoplasm derivation**: the nucleus/cell pairing pass producing
//!   `Cyto_*` and `CytoConstrained_*` regions with deterministic names
//! - **Measurement**: one area record per region, accumulated across a batch
//! - **GeoJSON archives**: order- and name-preserving load/save per source
//! - **Batch runner**: recursive discovery, per-source error containment,
//!   cooperative cancellation
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use roi::{derive_cytoplasm, DeriveConfig, MeasurementTable, RegionSet};
//!
//! let mut set = RegionSet::from_geojson_file("RoiSet_A.geojson")?;
//! derive_cytoplasm(&mut set, &DeriveConfig::default())?;
//!
//! let mut table = MeasurementTable::new();
//! table.collect("RoiSet_A.geojson", &set)?;
//! set.save_geojson("RoiSet_A_Cyto_Rois.geojson")?;
//! # Ok::<(), roi::RoiError>(())
//! ```

// Core modules
pub mod batch;
pub mod derive;
pub mod error;
pub mod io;
pub mod measure;
pub mod ops;
pub mod set;
pub mod types;

// Re-exports for convenience
pub use batch::{discover_sources, BatchConfig, BatchRunner, BatchSummary};
pub use derive::{derive_cytoplasm, nucleus_cell_pairs, CellPair, DeriveConfig, DeriveSummary, DiskConstraint};
pub use error::{Result, RoiError};
pub use measure::{MeasurementRecord, MeasurementTable};
pub use ops::{combine, disk, enlarge, RegionOp};
pub use set::RegionSet;
pub use types::{Calibration, Region};
