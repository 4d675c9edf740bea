//! hostwatch - adaptive host anomaly monitor
//!
//! Samples CPU and memory on a fixed cadence, learns a per-host baseline,
//! and alerts when the outlier model and the resource thresholds agree.

use std::sync::Arc;

use anyhow::{Context, Result};
use hostwatch_lib::{
    anomaly::{create_notifier, AlertDispatcher},
    collector::{MonitorLoop, SysinfoSampler, TelemetryStore},
    predictor::{FeatureNames, OnnxScorer},
    Engine, MonitorMetrics, StructuredLogger,
};
use sysinfo::System;
use tokio::sync::{broadcast, Mutex};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod api;
mod config;

use config::{AgentConfig, LogFormat};

const AGENT_VERSION: &str = env!("CARGO_PKG_VERSION");

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Json => registry.with(fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(fmt::layer()).init(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration before logging so the format can be honored
    let config = AgentConfig::load()?;
    init_tracing(config.log_format);

    info!("Starting hostwatch");

    // The model is mandatory; any artifact problem aborts startup
    let feature_names = FeatureNames::load_or_default(&config.feature_names_path)
        .context("Failed to load feature names")?;
    let scorer = OnnxScorer::from_path(
        &config.model_path,
        feature_names,
        config.model_sha256.as_deref(),
    )
    .context("Failed to load outlier model")?;
    let model_sha256 = scorer.checksum().to_string();

    let dispatcher = AlertDispatcher::new(create_notifier(config.notifier))
        .with_cooldown(config.alert_cooldown());
    let engine = Engine::new(Box::new(scorer), dispatcher).with_interval(config.interval());
    let engine = Arc::new(Mutex::new(engine));

    // Initialize metrics
    let metrics = MonitorMetrics::new();
    metrics.set_learning(true);

    // Initialize structured logger
    let host_name = System::host_name().unwrap_or_else(|| "unknown".to_string());
    let logger = StructuredLogger::new(host_name);
    logger.log_startup(AGENT_VERSION, &model_sha256, config.interval_secs);

    let mut monitor = MonitorLoop::new(
        Box::new(SysinfoSampler::new()),
        engine.clone(),
        config.interval(),
        metrics.clone(),
        logger.clone(),
    );
    if let Some(path) = &config.telemetry_path {
        let store = TelemetryStore::open(path)
            .with_context(|| format!("Failed to open telemetry file {}", path.display()))?;
        monitor = monitor.with_telemetry(store);
    }

    // Start health, metrics and status server
    let app_state = Arc::new(api::AppState::new(engine, metrics));
    let api_handle = tokio::spawn(api::serve(config.api_port, app_state));

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let mut monitor_handle = tokio::spawn(monitor.run(shutdown_rx));

    let result = tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            signal.context("Failed to listen for shutdown signal")?;
            logger.log_shutdown("SIGINT received");
            let _ = shutdown_tx.send(());
            monitor_handle.await.context("Monitoring task panicked")?
        }
        finished = &mut monitor_handle => {
            let result = finished.context("Monitoring task panicked")?;
            if let Err(e) = &result {
                error!(error = %e, "Monitoring stopped");
                logger.log_shutdown("monitoring failed");
            }
            result
        }
    };

    api_handle.abort();
    info!("Shutting down");

    result.context("Monitoring loop failed")
}
