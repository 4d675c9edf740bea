//! Outlier scoring over a pre-trained model

mod features;
mod inference;

pub use features::{FeatureNames, DEFAULT_FEATURE_NAMES};
pub use inference::OnnxScorer;

use crate::error::Result;

/// Output of one scoring call
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutlierScore {
    /// Continuous score; lower means more of an outlier
    pub value: f64,
    /// Inlier/outlier label, when the model provides one
    pub is_outlier: Option<bool>,
}

impl OutlierScore {
    pub fn new(value: f64) -> Self {
        Self {
            value,
            is_outlier: None,
        }
    }
}

/// Trait for outlier scoring implementations
pub trait OutlierScorer: Send + Sync {
    /// Score a (cpu, ram) reading
    fn score(&self, cpu_percent: f64, ram_percent: f64) -> Result<OutlierScore>;
}
