//! Observability infrastructure for the host monitor
//!
//! Provides:
//! - Prometheus metrics (cycle latency, sampling latency, alert counters, engine state)
//! - Structured JSON logging with tracing

use prometheus::{
    register_gauge, register_histogram, register_int_counter, register_int_gauge, Encoder, Gauge,
    Histogram, IntCounter, IntGauge, TextEncoder,
};
use std::sync::OnceLock;
use tracing::{debug, info, warn};

use crate::anomaly::{Attribution, Baseline, Classification, DispatchOutcome};

/// Histogram buckets for latency measurements (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 1.5, 2.0, 5.0,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<MonitorMetricsInner> = OnceLock::new();

/// Inner metrics structure that holds the actual Prometheus metrics
struct MonitorMetricsInner {
    cycle_latency_seconds: Histogram,
    sample_latency_seconds: Histogram,
    cycles: IntCounter,
    anomalies_detected: IntCounter,
    alerts_dispatched: IntCounter,
    alerts_suppressed: IntCounter,
    alerts_failed: IntCounter,
    launches_attributed: IntCounter,
    scoring_errors: IntCounter,
    known_apps: IntGauge,
    learning: IntGauge,
    last_score: Gauge,
}

impl MonitorMetricsInner {
    fn new() -> Self {
        Self {
            cycle_latency_seconds: register_histogram!(
                "hostwatch_cycle_latency_seconds",
                "Time spent running one detection cycle",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register cycle_latency_seconds"),

            sample_latency_seconds: register_histogram!(
                "hostwatch_sample_latency_seconds",
                "Time spent sampling host utilization, measurement window included",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register sample_latency_seconds"),

            cycles: register_int_counter!(
                "hostwatch_cycles_total",
                "Total number of detection cycles run"
            )
            .expect("Failed to register cycles"),

            anomalies_detected: register_int_counter!(
                "hostwatch_anomalies_detected_total",
                "Total number of samples classified as anomalous"
            )
            .expect("Failed to register anomalies_detected"),

            alerts_dispatched: register_int_counter!(
                "hostwatch_alerts_dispatched_total",
                "Total number of alerts delivered"
            )
            .expect("Failed to register alerts_dispatched"),

            alerts_suppressed: register_int_counter!(
                "hostwatch_alerts_suppressed_total",
                "Total number of alerts suppressed by the cooldown"
            )
            .expect("Failed to register alerts_suppressed"),

            alerts_failed: register_int_counter!(
                "hostwatch_alerts_failed_total",
                "Total number of alerts whose delivery failed"
            )
            .expect("Failed to register alerts_failed"),

            launches_attributed: register_int_counter!(
                "hostwatch_launches_attributed_total",
                "Total number of load jumps attributed to application launches"
            )
            .expect("Failed to register launches_attributed"),

            scoring_errors: register_int_counter!(
                "hostwatch_scoring_errors_total",
                "Total number of failed outlier scoring calls"
            )
            .expect("Failed to register scoring_errors"),

            known_apps: register_int_gauge!(
                "hostwatch_known_apps",
                "Number of applications with a recorded launch impact"
            )
            .expect("Failed to register known_apps"),

            learning: register_int_gauge!(
                "hostwatch_learning",
                "1 while the baseline is being learned, 0 afterwards"
            )
            .expect("Failed to register learning"),

            last_score: register_gauge!(
                "hostwatch_last_outlier_score",
                "Most recent outlier score"
            )
            .expect("Failed to register last_outlier_score"),
        }
    }
}

/// Monitor metrics for Prometheus exposition
///
/// This is a lightweight handle to the global metrics instance.
/// Multiple clones share the same underlying metrics.
#[derive(Clone)]
pub struct MonitorMetrics {
    _private: (),
}

impl Default for MonitorMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl MonitorMetrics {
    /// Create a new metrics handle (initializes global metrics if needed)
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(MonitorMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &MonitorMetricsInner {
        GLOBAL_METRICS.get_or_init(MonitorMetricsInner::new)
    }

    pub fn observe_cycle_latency(&self, duration_secs: f64) {
        self.inner().cycle_latency_seconds.observe(duration_secs);
    }

    pub fn observe_sample_latency(&self, duration_secs: f64) {
        self.inner().sample_latency_seconds.observe(duration_secs);
    }

    pub fn inc_cycles(&self) {
        self.inner().cycles.inc();
    }

    pub fn inc_anomalies_detected(&self) {
        self.inner().anomalies_detected.inc();
    }

    pub fn inc_launches_attributed(&self) {
        self.inner().launches_attributed.inc();
    }

    pub fn inc_scoring_errors(&self) {
        self.inner().scoring_errors.inc();
    }

    /// Count an alert by what happened to it
    pub fn record_dispatch(&self, outcome: &DispatchOutcome) {
        match outcome {
            DispatchOutcome::Dispatched => self.inner().alerts_dispatched.inc(),
            DispatchOutcome::SuppressedByCooldown => self.inner().alerts_suppressed.inc(),
            DispatchOutcome::DeliveryFailed(_) => self.inner().alerts_failed.inc(),
        }
    }

    pub fn set_known_apps(&self, count: usize) {
        self.inner().known_apps.set(count as i64);
    }

    pub fn set_learning(&self, learning: bool) {
        self.inner().learning.set(i64::from(learning));
    }

    pub fn set_last_score(&self, score: f64) {
        self.inner().last_score.set(score);
    }

    /// Render every registered metric in the Prometheus text format
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&prometheus::gather(), &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

/// Structured logger for monitor events
///
/// Provides consistent JSON-formatted logging for classifications,
/// anomalies, and other significant events.
#[derive(Clone)]
pub struct StructuredLogger {
    host_name: String,
}

impl StructuredLogger {
    pub fn new(host_name: impl Into<String>) -> Self {
        Self {
            host_name: host_name.into(),
        }
    }

    pub fn host_name(&self) -> &str {
        &self.host_name
    }

    /// Log monitor startup
    pub fn log_startup(&self, version: &str, model_sha256: &str, interval_secs: u64) {
        info!(
            event = "agent_started",
            host = %self.host_name,
            agent_version = %version,
            model_sha256 = %model_sha256,
            interval_secs = interval_secs,
            "Host monitor started"
        );
    }

    /// Log monitor shutdown
    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "agent_shutdown",
            host = %self.host_name,
            reason = %reason,
            "Host monitor shutting down"
        );
    }

    /// Log the end of the learning phase
    pub fn log_baseline_learned(&self, baseline: &Baseline) {
        info!(
            event = "baseline_learned",
            host = %self.host_name,
            mean_cpu = baseline.mean_cpu,
            mean_ram = baseline.mean_ram,
            std_cpu = baseline.std_cpu,
            std_ram = baseline.std_ram,
            anomaly_threshold = baseline.anomaly_threshold,
            "Baseline learned, detection active"
        );
    }

    /// Log the classification of a sample, every intermediate flag included
    pub fn log_classification(
        &self,
        cpu_percent: f64,
        ram_percent: f64,
        score: f64,
        classification: &Classification,
    ) {
        debug!(
            event = "sample_classified",
            host = %self.host_name,
            cpu_percent = cpu_percent,
            ram_percent = ram_percent,
            score = score,
            is_anomaly = classification.is_anomaly,
            score_below_threshold = classification.score_below_threshold,
            is_cpu_high = classification.is_cpu_high,
            is_ram_high = classification.is_ram_high,
            is_cpu_spike = classification.is_cpu_spike,
            is_ram_spike = classification.is_ram_spike,
            "Sample classified"
        );
    }

    /// Log an anomaly detection event
    pub fn log_anomaly(&self, cpu_percent: f64, ram_percent: f64, score: f64, band: &str) {
        warn!(
            event = "anomaly_detected",
            host = %self.host_name,
            cpu_percent = cpu_percent,
            ram_percent = ram_percent,
            score = score,
            band = %band,
            "Anomaly detected"
        );
    }

    /// Log a load jump attributed to an application launch
    pub fn log_attribution(&self, attribution: &Attribution) {
        info!(
            event = "application_attributed",
            host = %self.host_name,
            app = %attribution.app,
            cpu_impact = attribution.cpu_impact,
            ram_impact = attribution.ram_impact,
            "Load change attributed to application launch"
        );
    }

    /// Log what happened to an alert
    pub fn log_dispatch(&self, outcome: &DispatchOutcome) {
        match outcome {
            DispatchOutcome::Dispatched => {
                info!(
                    event = "alert_dispatched",
                    host = %self.host_name,
                    "Alert dispatched"
                );
            }
            DispatchOutcome::SuppressedByCooldown => {
                info!(
                    event = "alert_suppressed",
                    host = %self.host_name,
                    "Alert suppressed by cooldown"
                );
            }
            DispatchOutcome::DeliveryFailed(reason) => {
                warn!(
                    event = "alert_delivery_failed",
                    host = %self.host_name,
                    reason = %reason,
                    "Alert delivery failed"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monitor_metrics_creation() {
        let metrics = MonitorMetrics::new();

        metrics.observe_cycle_latency(0.002);
        metrics.observe_sample_latency(1.01);
        metrics.inc_cycles();
        metrics.inc_anomalies_detected();
        metrics.record_dispatch(&DispatchOutcome::Dispatched);
        metrics.record_dispatch(&DispatchOutcome::SuppressedByCooldown);
        metrics.set_known_apps(3);
        metrics.set_learning(false);
        metrics.set_last_score(-0.2);

        let text = metrics.render().unwrap();
        assert!(text.contains("hostwatch_cycles_total"));
        assert!(text.contains("hostwatch_known_apps"));
        assert!(text.contains("hostwatch_alerts_suppressed_total"));
    }

    #[test]
    fn test_handles_share_global_metrics() {
        let a = MonitorMetrics::new();
        let b = a.clone();
        let before = a.inner().alerts_failed.get();
        b.record_dispatch(&DispatchOutcome::DeliveryFailed("boom".into()));
        assert!(a.inner().alerts_failed.get() > before);
    }

    #[test]
    fn test_structured_logger_creation() {
        let logger = StructuredLogger::new("test-host");
        assert_eq!(logger.host_name(), "test-host");
    }
}
