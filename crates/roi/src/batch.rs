use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{
    derive::{derive_cytoplasm, DeriveConfig, DiskConstraint},
    error::{Result, RoiError},
    measure::MeasurementTable,
    set::RegionSet,
    types::Calibration,
};

/// File name of the accumulated measurement table, written once per batch.
pub const MEASUREMENT_TABLE_NAME: &str = "RoiAreas.csv";

/// Suffix appended to each source's base name for the derived archive.
pub const OUTPUT_SUFFIX: &str = "_Cyto_Rois.geojson";

/// Configuration for one batch run over a directory tree of annotation sets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BatchConfig {
    /// Root directory searched recursively for annotation archives.
    pub input_dir: PathBuf,
    /// Root directory for derived archives and the measurement table.
    pub output_dir: PathBuf,
    /// Exact filename suffix a source must carry.
    #[serde(default = "default_extension")]
    pub extension: String,
    /// Substring a source filename must contain.
    #[serde(default = "default_contains")]
    pub contains: String,
    /// Whether each set starts with a background region (skip = 1).
    #[serde(default = "default_background")]
    pub background: bool,
    /// Pixel margin for nucleus dilation before carving cytoplasm.
    #[serde(default = "default_dilate")]
    pub dilate: f64,
    /// Physical units per pixel; enables calibrated measurements.
    #[serde(default)]
    pub pixel_size: Option<f64>,
    /// Disk radius in physical units; enables the constrained variant.
    #[serde(default)]
    pub radius: Option<f64>,
    /// Mirror the input's relative directory structure under the output root
    /// instead of flattening into it.
    #[serde(default = "default_keep_directories")]
    pub keep_directories: bool,
}

fn default_extension() -> String {
    ".geojson".to_string()
}

fn default_contains() -> String {
    "RoiSet".to_string()
}

fn default_background() -> bool {
    true
}

fn default_dilate() -> f64 {
    3.0
}

fn default_keep_directories() -> bool {
    true
}

impl BatchConfig {
    pub fn new(input_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            input_dir: input_dir.into(),
            output_dir: output_dir.into(),
            extension: default_extension(),
            contains: default_contains(),
            background: default_background(),
            dilate: default_dilate(),
            pixel_size: None,
            radius: None,
            keep_directories: default_keep_directories(),
        }
    }

    pub fn derive_config(&self) -> DeriveConfig {
        DeriveConfig {
            skip: usize::from(self.background),
            dilate: self.dilate,
            disk: self.radius.map(|radius| DiskConstraint { radius }),
        }
    }

    pub fn calibration(&self) -> Option<Calibration> {
        self.pixel_size.map(|pixel_size| Calibration::new(pixel_size, "um"))
    }

    /// Reject configurations that would feed non-finite geometry downstream:
    /// a zero pixel size turns the disk radius into infinity.
    pub fn validate(&self) -> Result<()> {
        if let Some(pixel_size) = self.pixel_size {
            if !pixel_size.is_finite() || pixel_size <= 0.0 {
                return Err(RoiError::InvalidConfig(format!(
                    "pixel_size must be positive and finite, got {pixel_size}"
                )));
            }
        }
        if let Some(radius) = self.radius {
            if !radius.is_finite() || radius <= 0.0 {
                return Err(RoiError::InvalidConfig(format!(
                    "radius must be positive and finite, got {radius}"
                )));
            }
        }
        Ok(())
    }
}

/// True when a filename passes the discovery filter: not a dotfile, carries the
/// extension, contains the substring.
pub fn matches_filter(file_name: &str, extension: &str, contains: &str) -> bool {
    !file_name.starts_with('.') && file_name.ends_with(extension) && file_name.contains(contains)
}

/// Recursively collect matching annotation sources under `root`, sorted by
/// path for a deterministic processing order.
pub fn discover_sources(root: &Path, extension: &str, contains: &str) -> Result<Vec<PathBuf>> {
    let mut sources = Vec::new();
    walk(root, extension, contains, &mut sources)?;
    sources.sort();
    Ok(sources)
}

fn walk(dir: &Path, extension: &str, contains: &str, out: &mut Vec<PathBuf>) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            walk(&path, extension, contains, out)?;
        } else if let Some(file_name) = path.file_name().and_then(|n| n.to_str()) {
            if matches_filter(file_name, extension, contains) {
                out.push(path);
            }
        }
    }
    Ok(())
}

/// Outcome of a batch run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BatchSummary {
    /// Sources processed to completion.
    pub processed: usize,
    /// Sources skipped because of per-source errors (bad format, odd count).
    pub skipped: usize,
    /// Measurement rows written to the table.
    pub measured_rows: usize,
    /// True when the run stopped early at a source boundary.
    pub cancelled: bool,
}

/// Sequential batch driver: discovers sources, derives and measures each one,
/// writes derived archives and the accumulated measurement table.
pub struct BatchRunner {
    config: BatchConfig,
    cancel: Arc<AtomicBool>,
}

impl BatchRunner {
    pub fn new(config: BatchConfig) -> Self {
        Self {
            config,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Handle for requesting cooperative cancellation; checked before each
    /// source, so the current source always finishes or skips cleanly.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    pub fn run(&self) -> Result<BatchSummary> {
        self.config.validate()?;

        let sources = discover_sources(
            &self.config.input_dir,
            &self.config.extension,
            &self.config.contains,
        )?;
        info!(count = sources.len(), root = %self.config.input_dir.display(), "discovered annotation sources");

        // Failing to create the output root is fatal to the whole batch.
        fs::create_dir_all(&self.config.output_dir)?;

        let mut table = MeasurementTable::new();
        let mut summary = BatchSummary::default();

        for source in &sources {
            if self.cancel.load(Ordering::Relaxed) {
                warn!("cancellation requested; stopping at source boundary");
                summary.cancelled = true;
                break;
            }
            // An output directory that cannot be created is an environment
            // failure, fatal to the whole batch like the output root.
            let save_dir = self.save_dir_for(source)?;
            fs::create_dir_all(&save_dir)?;
            match self.process_source(source, &save_dir, &mut table) {
                Ok(()) => summary.processed += 1,
                Err(err) => {
                    warn!(source = %source.display(), error = %err, "skipped ROI set");
                    summary.skipped += 1;
                }
            }
        }

        summary.measured_rows = table.len();
        table.save_csv(self.config.output_dir.join(MEASUREMENT_TABLE_NAME))?;

        info!(
            processed = summary.processed,
            skipped = summary.skipped,
            rows = summary.measured_rows,
            "batch complete"
        );
        Ok(summary)
    }

    fn process_source(
        &self,
        source: &Path,
        save_dir: &Path,
        table: &mut MeasurementTable,
    ) -> Result<()> {
        let file_name = source
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();
        info!(source = %file_name, "processing ROI set");

        let mut set = RegionSet::from_geojson_file(source)?;
        info!(regions = set.len(), "loaded annotation archive");

        if let Some(calibration) = self.config.calibration() {
            set.set_calibration(calibration);
        }

        derive_cytoplasm(&mut set, &self.config.derive_config())?;

        let base_name = source
            .file_stem()
            .and_then(|n| n.to_str())
            .unwrap_or("RoiSet");
        let target = save_dir.join(format!("{base_name}{OUTPUT_SUFFIX}"));
        set.save_geojson(&target)?;
        info!(target = %target.display(), "saved derived ROI set");

        // Rows enter the shared table only once the archive is on disk, so a
        // skipped source never contributes measurements.
        table.collect(&file_name, &set)?;
        Ok(())
    }

    /// Mirror the source's relative directory under the output root, or
    /// flatten everything into the output root.
    fn save_dir_for(&self, source: &Path) -> Result<PathBuf> {
        if !self.config.keep_directories {
            return Ok(self.config.output_dir.clone());
        }
        let parent = source.parent().unwrap_or(&self.config.input_dir);
        match parent.strip_prefix(&self.config.input_dir) {
            Ok(relative) => Ok(self.config.output_dir.join(relative)),
            Err(_) => Ok(self.config.output_dir.clone()),
        }
    }
}
