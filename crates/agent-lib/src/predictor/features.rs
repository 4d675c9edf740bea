//! Feature naming for the outlier model
//!
//! The training procedure stores the column order it used next to the
//! model as a JSON array. The scorer feeds inputs in that order.

use std::path::Path;

use tracing::{info, warn};

use crate::error::{MonitorError, Result};

/// Column order used when no feature-names artifact is present
pub const DEFAULT_FEATURE_NAMES: [&str; 2] = ["cpu_percent", "ram_percent"];

/// Ordered pair of model input labels
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureNames {
    names: [String; 2],
}

impl FeatureNames {
    /// Validate a label list: exactly cpu_percent and ram_percent, any order
    pub fn new(names: Vec<String>) -> Result<Self> {
        let names: [String; 2] = names.try_into().map_err(|v: Vec<String>| {
            MonitorError::FeatureNames(format!("expected 2 feature names, got {}", v.len()))
        })?;

        let mut sorted = names.clone();
        sorted.sort();
        if sorted != [DEFAULT_FEATURE_NAMES[0], DEFAULT_FEATURE_NAMES[1]] {
            return Err(MonitorError::FeatureNames(format!(
                "unsupported feature names {:?}",
                names
            )));
        }

        Ok(Self { names })
    }

    /// Load the artifact, falling back to the default order when it is absent
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if !path.exists() {
            warn!(
                path = %path.display(),
                "Feature names artifact not found, using default ordering"
            );
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let names: Vec<String> = serde_json::from_str(&content)
            .map_err(|e| MonitorError::FeatureNames(format!("{}: {e}", path.display())))?;
        let names = Self::new(names)?;
        info!(path = %path.display(), names = ?names.as_slice(), "Loaded feature names");
        Ok(names)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.names
    }

    /// Arrange a reading in model input order
    pub fn arrange(&self, cpu_percent: f64, ram_percent: f64) -> [f32; 2] {
        if self.names[0] == DEFAULT_FEATURE_NAMES[0] {
            [cpu_percent as f32, ram_percent as f32]
        } else {
            [ram_percent as f32, cpu_percent as f32]
        }
    }
}

impl Default for FeatureNames {
    fn default() -> Self {
        Self {
            names: DEFAULT_FEATURE_NAMES.map(String::from),
        }
    }
}
