//! ONNX inference using tract
//!
//! Loads the pre-trained isolation-style outlier model and scores
//! (cpu, ram) readings. The model is read once at startup and never
//! reloaded.

use std::path::Path;
use std::time::Instant;

use sha2::{Digest, Sha256};
use tract_onnx::prelude::*;
use tracing::{debug, info, warn};

use super::{FeatureNames, OutlierScore, OutlierScorer};
use crate::error::{MonitorError, Result};

/// Number of input features expected by the model
const NUM_FEATURES: usize = 2;

/// Maximum inference latency before warning
const MAX_INFERENCE_MS: u128 = 5;

type TractModel = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// Outlier scorer backed by an ONNX model
pub struct OnnxScorer {
    model: TractModel,
    feature_names: FeatureNames,
    checksum: String,
}

impl OnnxScorer {
    /// Load a model file, optionally verifying its SHA-256 first
    pub fn from_path(
        path: &Path,
        feature_names: FeatureNames,
        expected_sha256: Option<&str>,
    ) -> Result<Self> {
        if !path.exists() {
            return Err(MonitorError::ModelNotFound(path.to_path_buf()));
        }
        let bytes = std::fs::read(path)?;
        let scorer = Self::from_bytes(&bytes, feature_names, expected_sha256)?;
        info!(
            path = %path.display(),
            sha256 = %scorer.checksum,
            "Loaded outlier model"
        );
        Ok(scorer)
    }

    /// Build a scorer from raw model bytes
    pub fn from_bytes(
        bytes: &[u8],
        feature_names: FeatureNames,
        expected_sha256: Option<&str>,
    ) -> Result<Self> {
        let checksum = hex::encode(Sha256::digest(bytes));
        if let Some(expected) = expected_sha256 {
            if !expected.eq_ignore_ascii_case(&checksum) {
                return Err(MonitorError::ChecksumMismatch {
                    expected: expected.to_string(),
                    actual: checksum,
                });
            }
        }

        let model = Self::load_model(bytes)?;
        Ok(Self {
            model,
            feature_names,
            checksum,
        })
    }

    /// Parse and optimize an ONNX model from bytes
    fn load_model(bytes: &[u8]) -> Result<TractModel> {
        let invalid =
            |stage: &str, e: TractError| MonitorError::ModelInvalid(format!("{stage}: {e}"));

        tract_onnx::onnx()
            .model_for_read(&mut std::io::Cursor::new(bytes))
            .map_err(|e| invalid("failed to parse ONNX model", e))?
            .with_input_fact(0, f32::fact([1, NUM_FEATURES]).into())
            .map_err(|e| invalid("failed to set input shape", e))?
            .into_optimized()
            .map_err(|e| invalid("failed to optimize model", e))?
            .into_runnable()
            .map_err(|e| invalid("failed to create runnable model", e))
    }

    /// Hex SHA-256 of the loaded model bytes
    pub fn checksum(&self) -> &str {
        &self.checksum
    }

    fn run(&self, cpu_percent: f64, ram_percent: f64) -> TractResult<OutlierScore> {
        let features = self.feature_names.arrange(cpu_percent, ram_percent);
        let input: Tensor =
            tract_ndarray::Array2::from_shape_vec((1, NUM_FEATURES), features.to_vec())?.into();

        let outputs = self.model.run(tvec!(input.into()))?;

        // Two outputs: (label, score). A single output is the score.
        let (label, score) = match outputs.len() {
            0 => anyhow::bail!("model produced no outputs"),
            1 => (None, &outputs[0]),
            _ => (Some(&outputs[0]), &outputs[1]),
        };

        let value = first_value(score)?;
        let is_outlier = match label {
            Some(label) => Some(first_value(label)? < 0.0),
            None => None,
        };

        Ok(OutlierScore {
            value: value as f64,
            is_outlier,
        })
    }
}

fn first_value(tensor: &Tensor) -> TractResult<f32> {
    let values = tensor.cast_to::<f32>()?;
    let view = values.to_array_view::<f32>()?;
    view.iter()
        .next()
        .copied()
        .ok_or_else(|| anyhow::anyhow!("empty model output"))
}

impl OutlierScorer for OnnxScorer {
    fn score(&self, cpu_percent: f64, ram_percent: f64) -> Result<OutlierScore> {
        let start = Instant::now();

        let score = self
            .run(cpu_percent, ram_percent)
            .map_err(|e| MonitorError::Scoring(e.to_string()))?;

        let elapsed = start.elapsed();
        if elapsed.as_millis() > MAX_INFERENCE_MS {
            warn!(
                elapsed_ms = elapsed.as_millis(),
                "Inference exceeded {}ms target", MAX_INFERENCE_MS
            );
        } else {
            debug!(elapsed_us = elapsed.as_micros(), score = score.value, "Inference completed");
        }

        Ok(score)
    }
}
