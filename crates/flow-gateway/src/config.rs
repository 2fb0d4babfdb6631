//! # Gateway Configuration
//!
//! Configuration for the payment gateway integration. All secrets are
//! loaded from environment variables and injected at construction; the
//! client and verifier never read ambient state.

use flow_core::PaymentError;
use std::env;

/// Payment gateway API configuration
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Secret API key (gk_test_... or gk_live_...)
    pub api_key: String,

    /// Webhook signing secret (ghs_...)
    pub webhook_secret: String,

    /// API base URL (for testing/mocking)
    pub api_base_url: String,
}

impl GatewayConfig {
    /// Load configuration from environment variables.
    ///
    /// Required env vars:
    /// - `GATEWAY_API_KEY`
    /// - `GATEWAY_WEBHOOK_SECRET`
    ///
    /// Optional:
    /// - `GATEWAY_API_BASE_URL`
    pub fn from_env() -> Result<Self, PaymentError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let api_key = env::var("GATEWAY_API_KEY")
            .map_err(|_| PaymentError::Configuration("GATEWAY_API_KEY not set".to_string()))?;

        let webhook_secret = env::var("GATEWAY_WEBHOOK_SECRET").map_err(|_| {
            PaymentError::Configuration("GATEWAY_WEBHOOK_SECRET not set".to_string())
        })?;

        let api_base_url = env::var("GATEWAY_API_BASE_URL")
            .unwrap_or_else(|_| "https://api.gateway.example.com".to_string());

        // Validate key formats
        if !api_key.starts_with("gk_test_") && !api_key.starts_with("gk_live_") {
            return Err(PaymentError::Configuration(
                "GATEWAY_API_KEY must start with gk_test_ or gk_live_".to_string(),
            ));
        }

        if !webhook_secret.starts_with("ghs_") {
            return Err(PaymentError::Configuration(
                "GATEWAY_WEBHOOK_SECRET must start with ghs_".to_string(),
            ));
        }

        Ok(Self {
            api_key,
            webhook_secret,
            api_base_url,
        })
    }

    /// Create config with explicit values (for testing)
    pub fn new(api_key: impl Into<String>, webhook_secret: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            webhook_secret: webhook_secret.into(),
            api_base_url: "https://api.gateway.example.com".to_string(),
        }
    }

    /// Check if using test keys
    pub fn is_test_mode(&self) -> bool {
        self.api_key.starts_with("gk_test_")
    }

    /// Get authorization header value
    pub fn auth_header(&self) -> String {
        format!("Bearer {}", self.api_key)
    }

    /// Builder: set custom API base URL (for testing)
    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }
}
