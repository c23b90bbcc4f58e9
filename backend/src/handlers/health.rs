use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use std::sync::Arc;
use vitals_shared::{BasicHealth, DetailedHealth, Liveness, MetricsSnapshot, Readiness};

use crate::error::AppError;
use crate::AppState;

pub fn health_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(basic))
        .route("/health/", get(basic))
        .route("/health/live", get(liveness))
        .route("/health/ready", get(readiness))
        .route("/health/detailed", get(detailed))
        .route("/health/metrics", get(metrics))
}

fn status_code(code: u16) -> StatusCode {
    StatusCode::from_u16(code).unwrap_or(StatusCode::SERVICE_UNAVAILABLE)
}

async fn basic(State(state): State<Arc<AppState>>) -> Json<BasicHealth> {
    Json(state.health.basic())
}

async fn liveness(State(state): State<Arc<AppState>>) -> Json<Liveness> {
    Json(state.health.liveness())
}

async fn readiness(State(state): State<Arc<AppState>>) -> (StatusCode, Json<Readiness>) {
    let readiness = state.health.readiness().await;
    (status_code(readiness.status_code()), Json(readiness))
}

/// Read-only: failures go to the log, never to the activity store
async fn detailed(State(state): State<Arc<AppState>>) -> (StatusCode, Json<DetailedHealth>) {
    let health = state.health.detailed().await;

    if !health.report.is_healthy() {
        tracing::warn!(
            failing_checks = ?health.report.failing_checks(),
            "Detailed health check reported unhealthy dependencies"
        );
    }

    (status_code(health.report.status_code()), Json(health))
}

/// Process sampling reads procfs, so it runs on the blocking pool
async fn metrics(State(state): State<Arc<AppState>>) -> Result<Json<MetricsSnapshot>, AppError> {
    let snapshot = tokio::task::spawn_blocking(move || state.health.metrics())
        .await
        .map_err(|e| AppError::InternalError(format!("metrics sampling failed: {}", e)))?;

    Ok(Json(snapshot))
}
