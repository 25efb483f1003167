//! Liveness and readiness probes.

use axum::{Json, Router, extract::State, http::StatusCode, routing::get};
use serde::Serialize;
use tracing::warn;

use crate::AppState;

/// Probe response body.
#[derive(Serialize)]
pub struct HealthResponse {
    /// `healthy`, `ready` or `unavailable`.
    pub status: &'static str,
    /// Service version.
    pub version: &'static str,
}

impl HealthResponse {
    const fn new(status: &'static str) -> Self {
        Self {
            status,
            version: env!("CARGO_PKG_VERSION"),
        }
    }
}

async fn liveness() -> Json<HealthResponse> {
    Json(HealthResponse::new("healthy"))
}

/// Ready once the ledger store answers; 503 otherwise.
async fn readiness(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    match state.store.ping().await {
        Ok(()) => (StatusCode::OK, Json(HealthResponse::new("ready"))),
        Err(e) => {
            warn!(error = %e, "Readiness check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse::new("unavailable")),
            )
        }
    }
}

/// Creates the probe routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(liveness))
        .route("/health/ready", get(readiness))
}
