use roi::BatchConfig;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CytoKitError {
    #[error(transparent)]
    SerdeError(#[from] serde_json::Error),
    #[error(transparent)]
    TomlDeError(#[from] toml::de::Error),
    #[error(transparent)]
    TomlSerError(#[from] toml::ser::Error),
    #[error(transparent)]
    IoError(#[from] std::io::Error),
    #[error("Unsupported file format. Please use .toml or .json files")]
    UnsupportedFileFormat,
}

/// A batch job description loadable from a TOML or JSON file.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct BatchJob {
    /// Optional human-readable label for the run.
    #[serde(default)]
    pub description: Option<String>,
    #[serde(flatten)]
    pub batch: BatchConfig,
}

impl BatchJob {
    /// Load a BatchJob from a TOML file
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self, CytoKitError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Load a BatchJob from a TOML string
    pub fn from_toml(content: &str) -> Result<Self, CytoKitError> {
        let job: BatchJob = toml::from_str(content)?;
        Ok(job)
    }

    /// Load a BatchJob from a JSON file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, CytoKitError> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Load a BatchJob from a JSON string
    pub fn from_json(content: &str) -> Result<Self, CytoKitError> {
        let job: BatchJob = serde_json::from_str(content)?;
        Ok(job)
    }

    /// Auto-detect file format and load the job
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, CytoKitError> {
        let path_ref = path.as_ref();
        match path_ref.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::from_toml_file(path),
            Some("json") => Self::from_json_file(path),
            _ => Err(CytoKitError::UnsupportedFileFormat),
        }
    }

    /// Save the job to a TOML file
    pub fn to_toml_file<P: AsRef<Path>>(&self, path: P) -> Result<(), CytoKitError> {
        let content = self.to_toml()?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Convert the job to a TOML string
    pub fn to_toml(&self) -> Result<String, CytoKitError> {
        let toml = toml::to_string_pretty(&self)?;
        Ok(toml)
    }

    /// Save the job to a JSON file
    pub fn to_json_file<P: AsRef<Path>>(&self, path: P) -> Result<(), CytoKitError> {
        let content = self.to_json()?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Convert the job to a JSON string
    pub fn to_json(&self) -> Result<String, CytoKitError> {
        Ok(serde_json::to_string_pretty(&self)?)
    }
}
