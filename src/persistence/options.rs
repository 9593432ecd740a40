//! JSON file backing the prediction options resource

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::api::PredictionOption;

/// Whole-file reads and writes; callers serialize writers
#[derive(Debug, Clone)]
pub struct PredictionOptionFile {
    path: PathBuf,
}

impl PredictionOptionFile {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Missing or unreadable file yields an empty list
    pub fn read(&self) -> Vec<PredictionOption> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Failed to read prediction options data file");
                return Vec::new();
            }
        };
        match serde_json::from_str(&raw) {
            Ok(options) => options,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Failed to parse prediction options data file");
                Vec::new()
            }
        }
    }

    pub fn write(&self, options: &[PredictionOption]) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let raw = serde_json::to_string_pretty(options)?;
        fs::write(&self.path, raw)
            .with_context(|| format!("Failed to write prediction options file {}", self.path.display()))?;
        info!(path = %self.path.display(), count = options.len(), "Prediction options saved");
        Ok(())
    }
}
