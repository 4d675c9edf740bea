//! Hybrid anomaly classification
//!
//! A sample is anomalous only when the outlier model finds it rare AND the
//! raw readings are elevated, either above the dynamic ceiling or more than
//! two standard deviations above the baseline mean.

use serde::{Deserialize, Serialize};

use super::Baseline;

/// Absolute CPU ceiling (%) above which load is always high
pub const FIXED_CPU_THRESHOLD: f64 = 80.0;

/// Absolute RAM ceiling (%) above which usage is always high
pub const FIXED_RAM_THRESHOLD: f64 = 80.0;

/// Number of standard deviations above the mean that make a spike
pub const SPIKE_STD_DEVS: f64 = 2.0;

/// Outcome of classifying one sample, with every intermediate flag
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Classification {
    pub is_anomaly: bool,
    pub score_below_threshold: bool,
    pub is_cpu_high: bool,
    pub is_ram_high: bool,
    pub is_cpu_spike: bool,
    pub is_ram_spike: bool,
}

impl Classification {
    pub fn resource_anomaly(&self) -> bool {
        self.is_cpu_high || self.is_ram_high || self.is_cpu_spike || self.is_ram_spike
    }
}

/// Fuses the outlier score with baseline-relative thresholds
#[derive(Debug, Clone, Copy)]
pub struct HybridClassifier {
    pub cpu_ceiling: f64,
    pub ram_ceiling: f64,
}

impl HybridClassifier {
    pub fn new() -> Self {
        Self {
            cpu_ceiling: FIXED_CPU_THRESHOLD,
            ram_ceiling: FIXED_RAM_THRESHOLD,
        }
    }

    /// Classify a reading against the learned baseline
    ///
    /// Without a baseline the engine is still learning and nothing is
    /// anomalous, whatever the inputs.
    pub fn classify(
        &self,
        cpu_percent: f64,
        ram_percent: f64,
        score: f64,
        baseline: Option<&Baseline>,
    ) -> Classification {
        let Some(baseline) = baseline else {
            return Classification::default();
        };

        let cpu_dyn_threshold = self.cpu_ceiling.min(baseline.mean_cpu * 2.0);
        let ram_dyn_threshold = self.ram_ceiling.min(baseline.mean_ram * 2.0);

        let mut c = Classification {
            is_anomaly: false,
            score_below_threshold: score < baseline.anomaly_threshold,
            is_cpu_high: cpu_percent > cpu_dyn_threshold,
            is_ram_high: ram_percent > ram_dyn_threshold,
            is_cpu_spike: cpu_percent > baseline.mean_cpu + SPIKE_STD_DEVS * baseline.std_cpu,
            is_ram_spike: ram_percent > baseline.mean_ram + SPIKE_STD_DEVS * baseline.std_ram,
        };
        c.is_anomaly = c.score_below_threshold && c.resource_anomaly();
        c
    }
}

impl Default for HybridClassifier {
    fn default() -> Self {
        Self::new()
    }
}

/// Human label for an outlier score; display only
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreBand {
    Normal,
    SlightlyUnusual,
    Unusual,
    VeryUnusual,
    ExtremelyAbnormal,
}

impl ScoreBand {
    pub fn from_score(score: f64) -> Self {
        if score >= -0.05 {
            ScoreBand::Normal
        } else if score > -0.15 {
            ScoreBand::SlightlyUnusual
        } else if score > -0.3 {
            ScoreBand::Unusual
        } else if score > -0.5 {
            ScoreBand::VeryUnusual
        } else {
            ScoreBand::ExtremelyAbnormal
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ScoreBand::Normal => "normal",
            ScoreBand::SlightlyUnusual => "slightly unusual",
            ScoreBand::Unusual => "unusual",
            ScoreBand::VeryUnusual => "very unusual",
            ScoreBand::ExtremelyAbnormal => "extremely abnormal",
        }
    }
}

impl std::fmt::Display for ScoreBand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}
