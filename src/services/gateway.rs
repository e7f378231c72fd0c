use anyhow::Result;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use thiserror::Error;

use crate::config::GatewayConfig;

// Never crosses the HTTP surface directly: the initiation path folds it
// into a gateway error response, the status path coerces it to pending.
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("gateway request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("gateway returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
}

impl GatewayError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, GatewayError::Transport(e) if e.is_timeout())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PushResponse {
    pub success: bool,
    #[serde(default)]
    pub checkout_request_id: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatusPayload {
    pub success: bool,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub transaction_code: Option<String>,
    #[serde(default)]
    pub amount: Option<f64>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

// Stateless apart from the shared connection pool, so one instance serves
// all concurrent requests. Every call is bounded by the configured timeout.
pub struct GatewayClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    api_secret: Option<String>,
    account_id: Option<String>,
}

impl GatewayClient {
    pub fn new(config: &GatewayConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            api_secret: config.api_secret.clone(),
            account_id: config.account_id.clone(),
        })
    }

    pub async fn initiate_push(
        &self,
        phone: &str,
        amount: f64,
        reference: &str,
        description: &str,
    ) -> Result<PushResponse, GatewayError> {
        let url = format!("{}/payments", self.base_url);
        // account_id presence is enforced upstream by the credential check
        let body = json!({
            "account_id": self.account_id.as_deref().unwrap_or_default(),
            "phone_number": phone,
            "amount": amount,
            "reference": reference,
            "description": description,
        });

        tracing::debug!(reference = %reference, "Sending STK push to gateway");

        let request = self.with_credentials(self.http.post(&url)).json(&body);
        self.execute(request).await
    }

    // A 2xx body carrying success:false is a definitive provider answer,
    // not an error here.
    pub async fn fetch_status(
        &self,
        checkout_request_id: &str,
    ) -> Result<StatusPayload, GatewayError> {
        let url = format!("{}/payments/status", self.base_url);
        let request = self
            .with_credentials(self.http.get(&url))
            .query(&[("checkout_request_id", checkout_request_id)]);
        self.execute(request).await
    }

    fn with_credentials(&self, mut request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if let Some(key) = &self.api_key {
            request = request.header("x-api-key", key);
        }
        if let Some(secret) = &self.api_secret {
            request = request.header("x-api-secret", secret);
        }
        request
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, GatewayError> {
        match request.send().await {
            Ok(resp) if resp.status().is_success() => Ok(resp.json::<T>().await?),
            Ok(resp) => {
                let status = resp.status().as_u16();
                let body = resp.text().await.unwrap_or_default();
                Err(GatewayError::Status {
                    status,
                    body: body.chars().take(200).collect(),
                })
            }
            Err(e) => Err(GatewayError::Transport(e)),
        }
    }
}
