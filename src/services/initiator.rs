use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::config::GatewayConfig;
use crate::error::PaymentError;
use crate::models::InitiateRequest;
use crate::services::gateway::{GatewayClient, GatewayError};
use crate::validation;

const REFERENCE_PREFIX: &str = "PSH";

pub struct PaymentInitiator {
    gateway: Arc<GatewayClient>,
    config: GatewayConfig,
}

#[derive(Debug, Clone)]
pub struct InitiatedPayment {
    pub checkout_request_id: String,
    pub reference: String,
}

impl PaymentInitiator {
    pub fn new(gateway: Arc<GatewayClient>, config: GatewayConfig) -> Self {
        Self { gateway, config }
    }

    // Submits exactly one STK push. No retries here; retrying is the
    // caller's decision.
    pub async fn initiate(&self, req: &InitiateRequest) -> Result<InitiatedPayment, PaymentError> {
        let phone = validation::non_empty(req.phone.as_deref());
        let app_name = validation::non_empty(req.app_name.as_deref());

        // Fail fast, first violation wins. Nothing below touches the
        // network until every check has passed.
        let (phone, amount, app_name) = match (phone, req.amount, app_name) {
            (Some(phone), Some(amount), Some(app_name)) => (phone, amount, app_name),
            _ => {
                return Err(PaymentError::Validation(
                    "phone, amount and appName are required".to_string(),
                ))
            }
        };

        if !validation::is_valid_phone(phone) {
            return Err(PaymentError::Validation(
                "phone must be in the format 254XXXXXXXXX, e.g. 254712345678".to_string(),
            ));
        }

        if !validation::is_valid_amount(amount) {
            return Err(PaymentError::Validation(format!(
                "amount must be a number of at least {}",
                validation::MIN_AMOUNT
            )));
        }

        self.config.require_credentials()?;

        let reference = generate_reference();
        tracing::info!(
            phone = %phone,
            amount = amount,
            app = %app_name,
            reference = %reference,
            "Initiating STK push"
        );

        match self
            .gateway
            .initiate_push(phone, amount, &reference, app_name)
            .await
        {
            Ok(ack) if ack.success => match ack.checkout_request_id {
                Some(checkout_request_id) => {
                    tracing::info!(
                        checkout_request_id = %checkout_request_id,
                        reference = %reference,
                        "STK push accepted by gateway"
                    );
                    Ok(InitiatedPayment {
                        checkout_request_id,
                        reference,
                    })
                }
                None => Err(PaymentError::Gateway(
                    "gateway did not return a checkout request ID".to_string(),
                )),
            },
            Ok(ack) => {
                let reason = ack
                    .message
                    .or(ack.error)
                    .unwrap_or_else(|| "push rejected by provider".to_string());
                tracing::warn!(reference = %reference, reason = %reason, "Gateway rejected STK push");
                Err(PaymentError::Gateway(reason))
            }
            Err(e) => {
                let reason = match &e {
                    GatewayError::Status { .. } => e.to_string(),
                    GatewayError::Transport(_) if e.is_timeout() => {
                        format!("request timed out after {}s", self.config.timeout_secs)
                    }
                    GatewayError::Transport(_) => "could not reach payment gateway".to_string(),
                };
                tracing::warn!(reference = %reference, error = %e, "STK push did not reach the provider");
                Err(PaymentError::Gateway(reason))
            }
        }
    }
}

// Merchant-side reference for tracing a push through logs; the
// authoritative handle remains the gateway's checkout request ID.
pub fn generate_reference() -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!(
        "{}_{}_{}",
        REFERENCE_PREFIX,
        Utc::now().timestamp_millis(),
        &suffix[..8]
    )
}
