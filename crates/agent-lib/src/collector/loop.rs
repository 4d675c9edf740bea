//! Monitoring loop
//!
//! Drives the engine: sample the host, run one detection cycle, then wait
//! for the configured interval. Cycles never overlap; shutdown is observed
//! before sampling and during the wait.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, Mutex};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use super::{Sampler, TelemetryStore};
use crate::engine::{CycleOutcome, Engine, Verdict};
use crate::error::{MonitorError, Result};
use crate::models::Sample;
use crate::observability::{MonitorMetrics, StructuredLogger};

/// Periodic sampling and detection loop
pub struct MonitorLoop {
    sampler: Box<dyn Sampler>,
    engine: Arc<Mutex<Engine>>,
    interval: Duration,
    telemetry: Option<TelemetryStore>,
    metrics: MonitorMetrics,
    logger: StructuredLogger,
}

impl MonitorLoop {
    pub fn new(
        sampler: Box<dyn Sampler>,
        engine: Arc<Mutex<Engine>>,
        interval: Duration,
        metrics: MonitorMetrics,
        logger: StructuredLogger,
    ) -> Self {
        Self {
            sampler,
            engine,
            interval,
            telemetry: None,
            metrics,
            logger,
        }
    }

    /// Append every sample to a telemetry store
    pub fn with_telemetry(mut self, store: TelemetryStore) -> Self {
        self.telemetry = Some(store);
        self
    }

    /// Run until shutdown or the first sampling/scoring failure
    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) -> Result<()> {
        info!(
            interval_secs = self.interval.as_secs(),
            "Starting monitoring loop"
        );

        loop {
            if shutdown_requested(&mut shutdown) {
                info!("Shutting down monitoring loop");
                return Ok(());
            }

            let start = Instant::now();
            let sample = match self.sampler.sample().await {
                Ok(sample) => sample,
                Err(e) => {
                    error!(error = %e, "Sampling failed, stopping monitoring loop");
                    return Err(e);
                }
            };
            self.metrics
                .observe_sample_latency(start.elapsed().as_secs_f64());

            self.record_telemetry(&sample);

            let outcome = run_cycle(&self.engine, &self.metrics, sample).await?;
            self.report(&outcome);

            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                _ = shutdown.recv() => {
                    info!("Shutting down monitoring loop");
                    return Ok(());
                }
            }
        }
    }

    fn record_telemetry(&mut self, sample: &Sample) {
        if let Some(store) = self.telemetry.as_mut() {
            if let Err(e) = store.append(sample) {
                warn!(
                    path = %store.path().display(),
                    error = %e,
                    "Failed to append telemetry"
                );
            }
        }
    }

    fn report(&self, outcome: &CycleOutcome) {
        if let Some(baseline) = &outcome.learned_baseline {
            self.logger.log_baseline_learned(baseline);
        }
        if let Some(score) = outcome.score {
            self.metrics.set_last_score(score);
        }
        if let (Some(score), Some(classification)) = (outcome.score, &outcome.classification) {
            self.logger.log_classification(
                outcome.cpu_percent,
                outcome.ram_percent,
                score,
                classification,
            );
        }

        match &outcome.verdict {
            Verdict::Learning { collected, required } => {
                info!(
                    cpu_percent = outcome.cpu_percent,
                    ram_percent = outcome.ram_percent,
                    collected = collected,
                    required = required,
                    "Learning baseline"
                );
            }
            Verdict::Normal => {
                debug!(
                    cpu_percent = outcome.cpu_percent,
                    ram_percent = outcome.ram_percent,
                    score = ?outcome.score,
                    "Sample normal"
                );
            }
            Verdict::LaunchAttributed {
                app,
                cpu_impact,
                ram_impact,
            } => {
                self.metrics.inc_launches_attributed();
                self.logger.log_attribution(&crate::anomaly::Attribution {
                    app: app.clone(),
                    cpu_impact: *cpu_impact,
                    ram_impact: *ram_impact,
                });
            }
            Verdict::Anomaly => {
                self.metrics.inc_anomalies_detected();
                let band = outcome.band.map(|b| b.label()).unwrap_or("unknown");
                self.logger.log_anomaly(
                    outcome.cpu_percent,
                    outcome.ram_percent,
                    outcome.score.unwrap_or_default(),
                    band,
                );
                if let Some(dispatch) = &outcome.alert {
                    self.metrics.record_dispatch(dispatch);
                    self.logger.log_dispatch(dispatch);
                }
            }
        }
    }
}

/// Run one cycle under the engine lock
///
/// Borrows only the shared handles; the sampler is `Send` but not `Sync`.
async fn run_cycle(
    engine: &Mutex<Engine>,
    metrics: &MonitorMetrics,
    sample: Sample,
) -> Result<CycleOutcome> {
    let start = Instant::now();
    let mut engine = engine.lock().await;

    let outcome = match engine.cycle(sample, start.into_std()) {
        Ok(outcome) => outcome,
        Err(e) => {
            if matches!(e, MonitorError::Scoring(_)) {
                metrics.inc_scoring_errors();
            }
            error!(error = %e, "Detection cycle failed, stopping monitoring loop");
            return Err(e);
        }
    };

    metrics.inc_cycles();
    metrics.set_learning(engine.is_learning());
    metrics.set_known_apps(engine.known_apps().len());
    drop(engine);

    metrics.observe_cycle_latency(start.elapsed().as_secs_f64());
    Ok(outcome)
}

/// Non-blocking check for a pending or closed shutdown signal
fn shutdown_requested(shutdown: &mut broadcast::Receiver<()>) -> bool {
    !matches!(
        shutdown.try_recv(),
        Err(broadcast::error::TryRecvError::Empty)
    )
}
