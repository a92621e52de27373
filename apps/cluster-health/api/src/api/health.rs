//! Health endpoints
//!
//! `/health` answers as long as the process runs. `/health/cassandra` runs the
//! diagnostic check and always answers 200; cluster trouble is reported as a
//! DOWN status in the body.

use axum::{Json, Router, extract::State, routing::get};
use cluster_probe::HealthReport;
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    name: &'static str,
    version: &'static str,
}

/// Create the health router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/health/cassandra", get(cassandra_health))
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        name: state.app.name,
        version: state.app.version,
    })
}

async fn cassandra_health(State(state): State<AppState>) -> Json<HealthReport> {
    Json(state.cassandra.check().await)
}
