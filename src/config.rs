use anyhow::{bail, Context, Result};

use crate::error::PaymentError;

#[derive(Debug, Clone)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub environment: Environment,
    pub host: String,
    pub port: u16,

    pub gateway: GatewayConfig,
}

// The three credential values are optional at boot: the server starts
// without them and the endpoints that need them answer with a
// configuration error per request instead.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub api_secret: Option<String>,
    pub account_id: Option<String>,
    pub timeout_secs: u64,
}

impl GatewayConfig {
    pub fn credentials_configured(&self) -> bool {
        self.api_key.is_some() && self.api_secret.is_some() && self.account_id.is_some()
    }

    // Request-time check for the initiation and receipt paths. The status
    // path never calls this.
    pub fn require_credentials(&self) -> Result<(), PaymentError> {
        let mut missing = Vec::new();
        if self.api_key.is_none() {
            missing.push("GATEWAY_API_KEY");
        }
        if self.api_secret.is_none() {
            missing.push("GATEWAY_API_SECRET");
        }
        if self.account_id.is_none() {
            missing.push("GATEWAY_ACCOUNT_ID");
        }

        if missing.is_empty() {
            Ok(())
        } else {
            Err(PaymentError::Configuration(format!(
                "Payment gateway credentials not configured: {}",
                missing.join(", ")
            )))
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            environment: Self::parse_environment()?,
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .context("Invalid PORT")?,

            gateway: GatewayConfig {
                base_url: std::env::var("GATEWAY_BASE_URL")
                    .context("GATEWAY_BASE_URL required")?,
                api_key: optional_var("GATEWAY_API_KEY"),
                api_secret: optional_var("GATEWAY_API_SECRET"),
                account_id: optional_var("GATEWAY_ACCOUNT_ID"),
                timeout_secs: std::env::var("GATEWAY_TIMEOUT_SECS")
                    .unwrap_or_else(|_| "10".to_string())
                    .parse()
                    .context("Invalid GATEWAY_TIMEOUT_SECS")?,
            },
        };

        config.validate()?;
        Ok(config)
    }

    fn parse_environment() -> Result<Environment> {
        let env = std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

        match env.to_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "staging" | "stage" => Ok(Environment::Staging),
            "production" | "prod" => Ok(Environment::Production),
            _ => bail!("Unknown environment: {}", env),
        }
    }

    fn validate(&self) -> Result<()> {
        if !self.gateway.base_url.starts_with("http") {
            bail!("GATEWAY_BASE_URL must be HTTP(S) URL");
        }
        if self.gateway.timeout_secs == 0 {
            bail!("GATEWAY_TIMEOUT_SECS must be at least 1");
        }

        tracing::info!(
            "Configuration validated for {:?} environment",
            self.environment
        );

        Ok(())
    }
}

// Empty values in .env files count as unset.
fn optional_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}
