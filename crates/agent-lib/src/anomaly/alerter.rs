//! Alert composition and cooldown-gated delivery
//!
//! Handles:
//! - Building the alert payload (readings, score, trend, top processes)
//! - Suppressing alerts inside the cooldown window
//! - Fire-and-forget delivery through a notification sink

use std::fmt;
use std::time::{Duration, Instant};

use chrono::{DateTime, Local};
use serde::Serialize;
use tracing::{info, warn};

use super::{ScoreBand, TrendReport};
use crate::error::Result;
use crate::models::{ProcessSnapshot, Sample};

/// Default minimum time between two dispatched alerts
pub const DEFAULT_ALERT_COOLDOWN: Duration = Duration::from_secs(60);

/// How long a desktop notification stays visible
pub const NOTIFICATION_TIMEOUT: Duration = Duration::from_secs(10);

/// Tag identifying this monitor to the notification system
pub const SOURCE_TAG: &str = "hostwatch";

/// Number of processes listed in an alert
pub const ALERT_TOP_PROCESSES: usize = 3;

const ALERT_TITLE: &str = "hostwatch: anomaly detected";

/// Destination for alert notifications
pub trait NotificationSink: Send + Sync {
    /// Deliver one notification; the caller never retries
    fn notify(&self, title: &str, message: &str, source_tag: &str, timeout: Duration)
        -> Result<()>;
}

/// Everything an alert reports about the anomalous sample
#[derive(Debug, Clone, Serialize)]
pub struct AlertPayload {
    pub title: String,
    pub timestamp: DateTime<Local>,
    pub cpu_percent: f64,
    pub ram_percent: f64,
    pub score: f64,
    pub band: ScoreBand,
    pub trend: TrendReport,
    pub top_processes: Vec<ProcessSnapshot>,
}

impl AlertPayload {
    pub fn new(sample: &Sample, score: f64, trend: TrendReport) -> Self {
        Self {
            title: ALERT_TITLE.to_string(),
            timestamp: sample.timestamp,
            cpu_percent: sample.cpu_percent,
            ram_percent: sample.ram_percent,
            score,
            band: ScoreBand::from_score(score),
            trend,
            top_processes: sample
                .active_processes
                .iter()
                .take(ALERT_TOP_PROCESSES)
                .cloned()
                .collect(),
        }
    }

    /// Compact body used for desktop notifications
    pub fn short_message(&self) -> String {
        format!(
            "CPU: {:.1}%, RAM: {:.1}%\nScore: {:.4}",
            self.cpu_percent, self.ram_percent, self.score
        )
    }
}

impl fmt::Display for AlertPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "CPU: {:.1}%, RAM: {:.1}%", self.cpu_percent, self.ram_percent)?;
        writeln!(f, "Anomaly score: {:.4} ({})", self.score, self.band)?;
        writeln!(f, "{}", self.trend)?;
        writeln!(f)?;
        write!(f, "Top processes:")?;
        for p in &self.top_processes {
            write!(
                f,
                "\n{} (PID: {}): CPU {:.1}%, MEM {:.1}%",
                p.name, p.pid, p.cpu_percent, p.ram_percent
            )?;
        }
        Ok(())
    }
}

/// What happened to an anomaly handed to the dispatcher
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum DispatchOutcome {
    Dispatched,
    DeliveryFailed(String),
    SuppressedByCooldown,
}

/// Cooldown-gated alert delivery
pub struct AlertDispatcher {
    sink: Box<dyn NotificationSink>,
    cooldown: Duration,
    last_alert: Option<Instant>,
}

impl AlertDispatcher {
    /// Create a dispatcher with the default 60 second cooldown
    pub fn new(sink: Box<dyn NotificationSink>) -> Self {
        Self {
            sink,
            cooldown: DEFAULT_ALERT_COOLDOWN,
            last_alert: None,
        }
    }

    /// Set custom cooldown
    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }

    /// Check if an alert at `now` falls inside the cooldown window
    pub fn should_suppress(&self, now: Instant) -> bool {
        match self.last_alert {
            Some(last) => now.saturating_duration_since(last) < self.cooldown,
            None => false,
        }
    }

    /// Deliver an alert unless the cooldown suppresses it
    ///
    /// The cooldown is re-armed after every delivery attempt, failed or not.
    pub fn dispatch(&mut self, alert: &AlertPayload, now: Instant) -> DispatchOutcome {
        if self.should_suppress(now) {
            return DispatchOutcome::SuppressedByCooldown;
        }

        warn!(
            event = "alert",
            cpu_percent = alert.cpu_percent,
            ram_percent = alert.ram_percent,
            score = alert.score,
            "{}\n{}",
            alert.title,
            alert
        );

        let result = self.sink.notify(
            &alert.title,
            &alert.short_message(),
            SOURCE_TAG,
            NOTIFICATION_TIMEOUT,
        );
        self.last_alert = Some(now);

        match result {
            Ok(()) => {
                info!("Alert delivered");
                DispatchOutcome::Dispatched
            }
            Err(e) => {
                warn!(error = %e, "Alert delivery failed");
                DispatchOutcome::DeliveryFailed(e.to_string())
            }
        }
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    pub fn last_alert(&self) -> Option<Instant> {
        self.last_alert
    }
}
