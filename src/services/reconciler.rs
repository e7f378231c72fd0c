use std::sync::Arc;

use crate::models::{PaymentStatus, StatusResponse};
use crate::services::gateway::GatewayClient;

pub struct StatusReconciler {
    gateway: Arc<GatewayClient>,
}

impl StatusReconciler {
    pub fn new(gateway: Arc<GatewayClient>) -> Self {
        Self { gateway }
    }

    // Infallible on purpose: the worst answer a poller receives is
    // pending, never an error.
    pub async fn check(&self, checkout_request_id: &str) -> StatusResponse {
        match self.gateway.fetch_status(checkout_request_id).await {
            Ok(payload) if payload.success => {
                // Only the closed vocabulary passes through; any other
                // provider status string means the push has not settled.
                let status = payload
                    .status
                    .as_deref()
                    .and_then(PaymentStatus::from_provider)
                    .unwrap_or(PaymentStatus::Pending);
                let message = payload
                    .message
                    .unwrap_or_else(|| default_message(status).to_string());

                tracing::info!(
                    checkout_request_id = %checkout_request_id,
                    status = ?status,
                    "Payment status reconciled"
                );

                StatusResponse {
                    status,
                    transaction_code: payload.transaction_code,
                    amount: payload.amount,
                    phone: payload.phone,
                    message,
                }
            }
            Ok(payload) => {
                // A 2xx reply carrying success=false is the provider's
                // definitive no.
                let message = payload
                    .message
                    .or(payload.error)
                    .unwrap_or_else(|| default_message(PaymentStatus::Failed).to_string());

                tracing::info!(
                    checkout_request_id = %checkout_request_id,
                    reason = %message,
                    "Provider reports the payment failed"
                );

                StatusResponse {
                    status: PaymentStatus::Failed,
                    transaction_code: payload.transaction_code,
                    amount: payload.amount,
                    phone: payload.phone,
                    message,
                }
            }
            Err(e) => {
                // A transport failure or gateway 5xx during a poll is not
                // a payment verdict. Pollers treat pending as retry-later,
                // so transient failures come back as pending instead of an
                // error. This is the only place that coercion happens.
                tracing::warn!(
                    checkout_request_id = %checkout_request_id,
                    error = %e,
                    "Gateway unavailable during status check, reporting pending"
                );

                StatusResponse {
                    status: PaymentStatus::Pending,
                    transaction_code: None,
                    amount: None,
                    phone: None,
                    message: "Payment status not yet available, please try again shortly"
                        .to_string(),
                }
            }
        }
    }
}

fn default_message(status: PaymentStatus) -> &'static str {
    match status {
        PaymentStatus::Success => "Payment completed successfully",
        PaymentStatus::Pending => "Payment is pending confirmation",
        PaymentStatus::Failed => "Payment failed",
    }
}
