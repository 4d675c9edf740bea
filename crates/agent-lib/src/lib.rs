//! Host monitoring library
//!
//! This crate provides the core functionality for:
//! - Sampling host CPU, memory and process usage
//! - Baseline learning and hybrid anomaly classification
//! - Outlier scoring with a pre-trained ONNX model
//! - Alert delivery with cooldown
//! - Telemetry recording and observability

pub mod anomaly;
pub mod collector;
pub mod engine;
pub mod error;
pub mod history;
pub mod models;
pub mod observability;
pub mod predictor;

pub use engine::{CycleOutcome, Engine, EngineSnapshot, ScoredValue, Verdict};
pub use error::{MonitorError, Result};
pub use models::*;
pub use observability::{MonitorMetrics, StructuredLogger};
