pub mod health;
pub mod payments;

pub use health::*;
pub use payments::*;

use axum::{
    routing::{get, post},
    Router,
};

// Layers (tracing, CORS) are applied by the binary; tests mount this
// router directly.
pub fn build_router(payments: PaymentsState, health: HealthState) -> Router {
    Router::new()
        .route("/payments/initiate", post(initiate_payment))
        .route("/payments/status", post(check_status))
        .route(
            "/payments/validate",
            post(validate_receipt).get(lookup_receipt),
        )
        .with_state(payments)
        .route("/health", get(health_check))
        .with_state(health)
}
