use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateRequest {
    pub phone: Option<String>,
    pub transaction_code: Option<String>,
    pub checkout_request_id: Option<String>,
    pub app_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateResponse {
    pub success: bool,
    pub message: String,
    pub transaction_code: String,
    pub phone: String,
    pub verified: bool,
}

// `verified` stays false: the code passed the shape check only, no
// gateway-side confirmation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidatedTransaction {
    pub phone: String,
    pub transaction_code: String,
    pub checkout_request_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_name: Option<String>,
    pub recorded_at: i64,
    pub verified: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LookupParams {
    pub phone: Option<String>,
    pub checkout_request_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LookupResponse {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction: Option<ReceiptSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptSummary {
    pub phone: String,
    pub transaction_code: String,
    pub timestamp: i64,
}

impl From<ValidatedTransaction> for ReceiptSummary {
    fn from(tx: ValidatedTransaction) -> Self {
        Self {
            phone: tx.phone,
            transaction_code: tx.transaction_code,
            timestamp: tx.recorded_at,
        }
    }
}
