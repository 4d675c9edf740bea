//! Anomaly detection for host resource usage
//!
//! This module provides:
//! - Baseline learning over the warm-up window
//! - Attribution of load jumps to newly launched applications
//! - Hybrid classification (outlier score + dynamic thresholds + spikes)
//! - Trend reporting over the retained history
//! - Cooldown-gated alert delivery

mod alerter;
mod attribution;
mod baseline;
mod classifier;
mod notifier;
mod trend;

pub use alerter::{
    AlertDispatcher, AlertPayload, DispatchOutcome, NotificationSink, ALERT_TOP_PROCESSES,
    DEFAULT_ALERT_COOLDOWN, NOTIFICATION_TIMEOUT, SOURCE_TAG,
};
pub use attribution::{
    AppTracker, Attribution, LAUNCH_CPU_PERCENT, SIGNIFICANT_CPU_IMPACT, SIGNIFICANT_RAM_IMPACT,
};
pub use baseline::{Baseline, BaselineLearner, BASE_ANOMALY_THRESHOLD, DEFAULT_STD, LEARNING_PERIOD};
pub use classifier::{
    Classification, HybridClassifier, ScoreBand, FIXED_CPU_THRESHOLD, FIXED_RAM_THRESHOLD,
    SPIKE_STD_DEVS,
};
pub use notifier::{create_notifier, DesktopNotifier, LogNotifier, NotifierKind};
pub use trend::{Delta, Direction, TrendReport};

#[cfg(test)]
pub(crate) use alerter::tests::RecordingSink;
