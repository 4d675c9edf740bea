//! Sampler backed by the `sysinfo` crate

use std::time::Duration;

use chrono::Local;
use sysinfo::System;
use tracing::debug;

use super::{async_trait, Sampler};
use crate::error::Result;
use crate::models::{round_percent, select_active_processes, ProcessSnapshot, Sample};

/// Time between the two refreshes that bracket a measurement
pub const MEASUREMENT_WINDOW: Duration = Duration::from_secs(1);

const BYTES_PER_GB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Returns `(numerator / denominator) * 100.0`, or `0.0` when `denominator` is zero
fn safe_percent(numerator: u64, denominator: u64) -> f64 {
    if denominator > 0 {
        (numerator as f64 / denominator as f64) * 100.0
    } else {
        0.0
    }
}

/// Arithmetic mean of per-core usages, `0.0` when there are no cores
fn avg_cpu_usage(per_core: &[f64]) -> f64 {
    if per_core.is_empty() {
        0.0
    } else {
        per_core.iter().sum::<f64>() / per_core.len() as f64
    }
}

/// Samples the local host through `sysinfo`
pub struct SysinfoSampler {
    sys: System,
    window: Duration,
}

impl SysinfoSampler {
    pub fn new() -> Self {
        Self {
            sys: System::new_all(),
            window: MEASUREMENT_WINDOW,
        }
    }

    /// Set a custom measurement window
    pub fn with_window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }

    fn read(&self) -> Sample {
        let per_core: Vec<f64> = self
            .sys
            .cpus()
            .iter()
            .map(|c| f64::from(c.cpu_usage()))
            .collect();

        let total = self.sys.total_memory();
        let used = self.sys.used_memory();

        // Processes that vanished between refreshes are simply absent
        let processes = self
            .sys
            .processes()
            .values()
            .map(|p| ProcessSnapshot {
                pid: p.pid().as_u32(),
                name: p.name().to_string_lossy().to_string(),
                cpu_percent: round_percent(f64::from(p.cpu_usage())),
                ram_percent: round_percent(safe_percent(p.memory(), total)),
            })
            .collect();

        Sample {
            timestamp: Local::now(),
            cpu_percent: round_percent(avg_cpu_usage(&per_core)),
            ram_percent: round_percent(safe_percent(used, total)),
            per_core_cpu: per_core.into_iter().map(round_percent).collect(),
            ram_used_gb: used as f64 / BYTES_PER_GB,
            ram_total_gb: total as f64 / BYTES_PER_GB,
            active_processes: select_active_processes(processes),
        }
    }
}

impl Default for SysinfoSampler {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Sampler for SysinfoSampler {
    async fn sample(&mut self) -> Result<Sample> {
        // CPU usage is a delta between two refreshes
        self.sys.refresh_all();
        tokio::time::sleep(self.window).await;
        self.sys.refresh_all();

        let sample = self.read();
        debug!(
            cpu_percent = sample.cpu_percent,
            ram_percent = sample.ram_percent,
            cores = sample.per_core_cpu.len(),
            processes = sample.active_processes.len(),
            "Host sampled"
        );
        Ok(sample)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_percent() {
        assert_eq!(safe_percent(50, 200), 25.0);
        assert_eq!(safe_percent(1, 0), 0.0);
    }

    #[test]
    fn test_avg_cpu_usage() {
        assert_eq!(avg_cpu_usage(&[10.0, 20.0, 30.0]), 20.0);
        assert_eq!(avg_cpu_usage(&[]), 0.0);
    }

    #[tokio::test]
    async fn test_sysinfo_sampler_reads_host() {
        let mut sampler = SysinfoSampler::new().with_window(Duration::from_millis(200));
        let sample = sampler.sample().await.unwrap();

        assert!((0.0..=100.0).contains(&sample.ram_percent));
        assert!(sample.cpu_percent >= 0.0);
        assert!(sample.active_processes.len() <= crate::models::MAX_ACTIVE_PROCESSES);
    }
}
