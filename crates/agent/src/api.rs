//! HTTP API for health checks, Prometheus metrics and engine status

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use hostwatch_lib::{Engine, KnownApp, MonitorMetrics};
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{error, info};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Mutex<Engine>>,
    pub metrics: MonitorMetrics,
}

impl AppState {
    pub fn new(engine: Arc<Mutex<Engine>>, metrics: MonitorMetrics) -> Self {
        Self { engine, metrics }
    }
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    learning: bool,
}

#[derive(Debug, Serialize)]
struct ReadinessResponse {
    ready: bool,
    collected: usize,
    required: usize,
}

/// Liveness: the process is up and the engine lock is reachable
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let learning = state.engine.lock().await.is_learning();
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "healthy",
            learning,
        }),
    )
}

/// Readiness check response - returns 200 once the baseline is learned, 503 before
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let snapshot = state.engine.lock().await.snapshot();
    let readiness = ReadinessResponse {
        ready: !snapshot.learning,
        collected: snapshot.learning_collected,
        required: snapshot.learning_required,
    };

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

/// Prometheus metrics endpoint
async fn metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.metrics.render() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; charset=utf-8")],
            body,
        ),
        Err(e) => {
            error!(error = %e, "Failed to encode metrics");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [("content-type", "text/plain; charset=utf-8")],
                String::new(),
            )
        }
    }
}

/// Full engine snapshot
async fn status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let snapshot = state.engine.lock().await.snapshot();
    Json(snapshot)
}

/// Applications whose launch impact has been recorded
async fn known_apps(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let known_apps: BTreeMap<String, KnownApp> = state
        .engine
        .lock()
        .await
        .known_apps()
        .iter()
        .map(|(name, app)| (name.clone(), app.clone()))
        .collect();
    Json(known_apps)
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .route("/api/v1/status", get(status))
        .route("/api/v1/known-apps", get(known_apps))
        .with_state(state)
}

/// Start the API server
pub async fn serve(port: u16, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
