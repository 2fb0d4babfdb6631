//! # Application State
//!
//! Shared state for the Axum application: the payment lifecycle, the
//! webhook verifier, and server configuration.

use flow_core::{OrderStore, PaymentLifecycle, SharedGateway, DEFAULT_MAX_ATTEMPTS};
use flow_gateway::{GatewayConfig, HttpGateway, WebhookVerifier};
use std::sync::Arc;

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Base URL for callbacks
    pub base_url: String,
    /// Environment (development, staging, production)
    pub environment: String,
    /// Per-order payment attempt ceiling
    pub max_payment_attempts: u32,
}

impl AppConfig {
    /// Load from environment variables
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            base_url: std::env::var("BASE_URL")
                .unwrap_or_else(|_| "http://localhost:8080".to_string()),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
            max_payment_attempts: std::env::var("MAX_PAYMENT_ATTEMPTS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_MAX_ATTEMPTS),
        }
    }

    /// Get the socket address to bind to
    pub fn socket_addr(&self) -> std::net::SocketAddr {
        format!("{}:{}", self.host, self.port)
            .parse()
            .expect("Invalid socket address")
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// The payment state machine (single mutation entry point)
    pub lifecycle: PaymentLifecycle,
    /// Webhook signature verifier
    pub verifier: WebhookVerifier,
    /// Application config
    pub config: AppConfig,
}

impl AppState {
    /// Create AppState against the real HTTP gateway, configured from env
    pub fn new() -> anyhow::Result<Self> {
        let config = AppConfig::from_env();

        let gateway_config = GatewayConfig::from_env()
            .map_err(|e| anyhow::anyhow!("Failed to initialize gateway: {}", e))?;
        let verifier = WebhookVerifier::new(gateway_config.webhook_secret.clone());
        let gateway = Arc::new(HttpGateway::new(gateway_config)?) as SharedGateway;

        Ok(Self::with_gateway(config, gateway, verifier))
    }

    /// Create AppState over an arbitrary gateway (tests inject a fake)
    pub fn with_gateway(
        config: AppConfig,
        gateway: SharedGateway,
        verifier: WebhookVerifier,
    ) -> Self {
        let lifecycle = PaymentLifecycle::new(OrderStore::new(), gateway)
            .with_max_attempts(config.max_payment_attempts);
        Self {
            lifecycle,
            verifier,
            config,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_config_defaults() {
        // Clear env vars for test
        std::env::remove_var("HOST");
        std::env::remove_var("PORT");
        std::env::remove_var("BASE_URL");
        std::env::remove_var("MAX_PAYMENT_ATTEMPTS");

        let config = AppConfig::from_env();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 8080);
        assert_eq!(config.max_payment_attempts, DEFAULT_MAX_ATTEMPTS);
    }

    #[test]
    fn test_socket_addr() {
        let config = AppConfig {
            host: "0.0.0.0".to_string(),
            port: 3000,
            base_url: "http://localhost:3000".to_string(),
            environment: "test".to_string(),
            max_payment_attempts: 5,
        };

        let addr = config.socket_addr();
        assert_eq!(addr.to_string(), "0.0.0.0:3000");
    }
}
