//! Baseline learning over the warm-up window
//!
//! The first ten samples form the learning set. When the tenth arrives the
//! baseline is computed once and frozen; the learner never re-enters the
//! learning state.

use serde::{Deserialize, Serialize};

use crate::history::BoundedHistory;
use crate::models::Sample;

/// Number of samples collected before detection starts
pub const LEARNING_PERIOD: usize = 10;

/// Standard deviation used when too few samples contributed
pub const DEFAULT_STD: f64 = 5.0;

/// Anomaly score threshold before volatility scaling
pub const BASE_ANOMALY_THRESHOLD: f64 = -0.15;

/// Per-host statistical reference
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Baseline {
    pub mean_cpu: f64,
    pub mean_ram: f64,
    pub std_cpu: f64,
    pub std_ram: f64,
    /// Scores below this value count as statistically rare
    pub anomaly_threshold: f64,
}

impl Baseline {
    /// Compute a baseline from (cpu, ram) readings
    pub fn from_readings(readings: &[(f64, f64)]) -> Self {
        let cpu: Vec<f64> = readings.iter().map(|(c, _)| *c).collect();
        let ram: Vec<f64> = readings.iter().map(|(_, r)| *r).collect();

        let std_cpu = population_std(&cpu);
        let std_ram = population_std(&ram);

        // Noisy hosts get a smaller threshold magnitude. A zero deviation
        // divides to +inf and clamps to 1.0.
        let variance_factor = (0.5 / (std_cpu / 10.0)).clamp(0.1, 1.0);

        Self {
            mean_cpu: mean(&cpu),
            mean_ram: mean(&ram),
            std_cpu,
            std_ram,
            anomaly_threshold: BASE_ANOMALY_THRESHOLD * variance_factor,
        }
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn population_std(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return DEFAULT_STD;
    }
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// Collects the learning set and produces the baseline exactly once
#[derive(Debug, Clone)]
pub struct BaselineLearner {
    learning_set: BoundedHistory<(f64, f64)>,
    baseline: Option<Baseline>,
}

impl BaselineLearner {
    pub fn new() -> Self {
        Self {
            learning_set: BoundedHistory::new(LEARNING_PERIOD),
            baseline: None,
        }
    }

    /// Feed a sample; returns the baseline on the cycle it gets learned
    pub fn observe(&mut self, sample: &Sample) -> Option<Baseline> {
        if self.learning_set.is_full() {
            return None;
        }

        self.learning_set
            .record((sample.cpu_percent, sample.ram_percent));

        if self.learning_set.len() == LEARNING_PERIOD {
            let baseline = Baseline::from_readings(&self.learning_set.to_vec());
            self.baseline = Some(baseline);
            return Some(baseline);
        }
        None
    }

    pub fn is_learning(&self) -> bool {
        self.baseline.is_none()
    }

    pub fn baseline(&self) -> Option<&Baseline> {
        self.baseline.as_ref()
    }

    /// Number of samples collected towards the baseline
    pub fn collected(&self) -> usize {
        self.learning_set.len()
    }
}

impl Default for BaselineLearner {
    fn default() -> Self {
        Self::new()
    }
}
