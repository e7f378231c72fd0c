use crate::models::HealthStatus;
use axum::{extract::State, Json};
use chrono::Utc;
use std::time::Instant;

#[derive(Clone)]
pub struct HealthState {
    pub gateway_configured: bool,
    pub started_at: Instant,
}

pub async fn health_check(State(state): State<HealthState>) -> Json<HealthStatus> {
    // Degraded means the server is up but pushes cannot be initiated until
    // gateway credentials are configured.
    let status = if state.gateway_configured {
        "healthy"
    } else {
        "degraded"
    };

    Json(HealthStatus {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        gateway_configured: state.gateway_configured,
        uptime_seconds: state.started_at.elapsed().as_secs(),
        timestamp: Utc::now(),
    })
}
