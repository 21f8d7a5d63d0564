use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RoiError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] geojson::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Annotation archive is empty: {0}")]
    EmptyArchive(PathBuf),

    #[error("Malformed annotation archive: {0}")]
    MalformedArchive(String),

    #[error("Invalid region pairing: {count} regions with {skip} skipped cannot form nucleus/cell pairs")]
    InvalidPairing { count: usize, skip: usize },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Region index {index} out of range for set of {len}")]
    IndexOutOfRange { index: usize, len: usize },
}

pub type Result<T> = std::result::Result<T, RoiError>;
