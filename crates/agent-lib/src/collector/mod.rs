//! Host utilization sampling and the monitoring loop
//!
//! This module provides the sampler that reads CPU, memory and the process
//! table, the CSV telemetry store, and the loop that drives the engine.

mod host;
mod r#loop;
mod telemetry;

pub use host::{SysinfoSampler, MEASUREMENT_WINDOW};
pub use r#loop::MonitorLoop;
pub use telemetry::{
    read_records, ColumnStats, TelemetryRecord, TelemetryStore, TelemetrySummary,
    TELEMETRY_HEADER, TIMESTAMP_FORMAT,
};

use crate::error::Result;
use crate::models::Sample;

pub use async_trait::async_trait;

/// Trait for host sampling implementations
#[async_trait]
pub trait Sampler: Send {
    /// Take one sample; may wait for a measurement window
    async fn sample(&mut self) -> Result<Sample>;
}
