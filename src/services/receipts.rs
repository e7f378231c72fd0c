use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::config::GatewayConfig;
use crate::error::PaymentError;
use crate::models::{ValidateRequest, ValidatedTransaction};
use crate::validation;

// A durable backend slots in behind this trait without touching the
// validation flow.
#[async_trait]
pub trait ReceiptStore: Send + Sync {
    async fn put(&self, key: String, record: ValidatedTransaction);
    async fn get(&self, key: &str) -> Option<ValidatedTransaction>;
}

// Process-lifetime ledger. Nothing evicts entries, and writing an existing
// key overwrites it: last write wins.
#[derive(Default)]
pub struct InMemoryReceiptStore {
    entries: RwLock<HashMap<String, ValidatedTransaction>>,
}

#[async_trait]
impl ReceiptStore for InMemoryReceiptStore {
    async fn put(&self, key: String, record: ValidatedTransaction) {
        self.entries.write().await.insert(key, record);
    }

    async fn get(&self, key: &str) -> Option<ValidatedTransaction> {
        self.entries.read().await.get(key).cloned()
    }
}

pub fn ledger_key(phone: &str, checkout_request_id: &str) -> String {
    format!("{}_{}", phone, checkout_request_id)
}

pub struct ReceiptValidator {
    config: GatewayConfig,
    store: Arc<dyn ReceiptStore>,
}

impl ReceiptValidator {
    pub fn new(config: GatewayConfig, store: Arc<dyn ReceiptStore>) -> Self {
        Self { config, store }
    }

    // No gateway confirmation happens here, so the record is stored with
    // verified: false.
    pub async fn validate(
        &self,
        req: &ValidateRequest,
    ) -> Result<ValidatedTransaction, PaymentError> {
        let phone = validation::non_empty(req.phone.as_deref());
        let code = validation::non_empty(req.transaction_code.as_deref());
        let checkout_request_id = validation::non_empty(req.checkout_request_id.as_deref());

        let (phone, code, checkout_request_id) = match (phone, code, checkout_request_id) {
            (Some(phone), Some(code), Some(id)) => (phone, code, id),
            _ => {
                return Err(PaymentError::Validation(
                    "phone, transactionCode and checkoutRequestId are required".to_string(),
                ))
            }
        };

        if !validation::is_valid_phone(phone) {
            return Err(PaymentError::Validation(
                "phone must be in the format 254XXXXXXXXX, e.g. 254712345678".to_string(),
            ));
        }

        let transaction_code = validation::normalize_receipt_code(code).ok_or_else(|| {
            PaymentError::Validation(
                "transactionCode must be 6 to 15 letters or digits".to_string(),
            )
        })?;

        self.config.require_credentials()?;

        let record = ValidatedTransaction {
            phone: phone.to_string(),
            transaction_code,
            checkout_request_id: checkout_request_id.to_string(),
            app_name: validation::non_empty(req.app_name.as_deref()).map(String::from),
            recorded_at: Utc::now().timestamp_millis(),
            verified: false,
        };

        tracing::info!(
            phone = %record.phone,
            transaction_code = %record.transaction_code,
            checkout_request_id = %record.checkout_request_id,
            "Recording validated receipt"
        );

        let key = ledger_key(&record.phone, &record.checkout_request_id);
        self.store.put(key, record.clone()).await;

        Ok(record)
    }

    pub async fn lookup(
        &self,
        phone: &str,
        checkout_request_id: &str,
    ) -> Option<ValidatedTransaction> {
        self.store.get(&ledger_key(phone, checkout_request_id)).await
    }
}
