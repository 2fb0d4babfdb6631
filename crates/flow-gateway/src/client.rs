//! # HTTP Gateway Client
//!
//! reqwest-based implementation of the `PaymentGateway` contract against
//! the processor's REST API. Translates wire responses into internal
//! result types and mutates no local state.

use crate::config::GatewayConfig;
use async_trait::async_trait;
use flow_core::{AttemptOutcome, IntentReceipt, Order, PaymentError, PaymentGateway, PaymentResult};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, error, info, instrument};

/// HTTP client for the external payment processor
pub struct HttpGateway {
    config: GatewayConfig,
    client: Client,
}

impl HttpGateway {
    /// Create a new gateway client
    pub fn new(config: GatewayConfig) -> PaymentResult<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| PaymentError::Configuration(format!("HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    /// Create from environment variables
    pub fn from_env() -> PaymentResult<Self> {
        let config = GatewayConfig::from_env()?;
        Self::new(config)
    }

    fn intents_url(&self) -> String {
        format!("{}/v1/payment_intents", self.config.api_base_url)
    }

    /// Map a gateway status string to an internal outcome.
    /// Anything unrecognized stays pending; only a terminal answer from
    /// the processor is treated as authoritative.
    fn map_status(status: &str) -> AttemptOutcome {
        match status {
            "succeeded" => AttemptOutcome::Succeeded,
            "failed" | "payment_failed" => AttemptOutcome::Failed,
            "canceled" | "cancelled" => AttemptOutcome::Cancelled,
            _ => AttemptOutcome::Pending,
        }
    }

    fn parse_error_message(body: &str) -> String {
        serde_json::from_str::<GatewayErrorResponse>(body)
            .map(|e| e.error.message)
            .unwrap_or_else(|_| body.to_string())
    }
}

#[async_trait]
impl PaymentGateway for HttpGateway {
    #[instrument(skip(self, order), fields(order_id = %order.id))]
    async fn create_intent(&self, order: &Order) -> PaymentResult<IntentReceipt> {
        let body = json!({
            "amount": order.amount.amount,
            "currency": order.amount.currency.as_str(),
            "metadata": { "order_id": order.id },
        });

        debug!(amount = order.amount.amount, "creating payment intent");

        let response = self
            .client
            .post(self.intents_url())
            .header("Authorization", self.config.auth_header())
            .json(&body)
            .send()
            .await
            .map_err(|e| PaymentError::GatewayUnavailable(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| PaymentError::GatewayUnavailable(e.to_string()))?;

        if status.is_server_error() {
            error!(%status, "gateway server error");
            return Err(PaymentError::GatewayUnavailable(format!(
                "HTTP {}: {}",
                status,
                Self::parse_error_message(&body)
            )));
        }
        if !status.is_success() {
            error!(%status, body, "gateway rejected intent");
            return Err(PaymentError::GatewayRejected {
                message: Self::parse_error_message(&body),
            });
        }

        let intent: IntentResponse = serde_json::from_str(&body).map_err(|e| {
            PaymentError::Serialization(format!("failed to parse intent response: {}", e))
        })?;

        info!(gateway_reference = %intent.id, "created payment intent");

        Ok(IntentReceipt {
            gateway_reference: intent.id,
            client_token: intent.client_secret,
        })
    }

    #[instrument(skip(self))]
    async fn query_status(&self, gateway_reference: &str) -> PaymentResult<AttemptOutcome> {
        let url = format!("{}/{}", self.intents_url(), gateway_reference);

        let response = self
            .client
            .get(&url)
            .header("Authorization", self.config.auth_header())
            .send()
            .await
            .map_err(|e| PaymentError::GatewayUnavailable(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(PaymentError::AttemptUnknownToGateway {
                gateway_reference: gateway_reference.to_string(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| PaymentError::GatewayUnavailable(e.to_string()))?;

        if status.is_server_error() {
            return Err(PaymentError::GatewayUnavailable(format!(
                "HTTP {}: {}",
                status,
                Self::parse_error_message(&body)
            )));
        }
        if !status.is_success() {
            return Err(PaymentError::GatewayRejected {
                message: Self::parse_error_message(&body),
            });
        }

        let intent: IntentStatusResponse = serde_json::from_str(&body).map_err(|e| {
            PaymentError::Serialization(format!("failed to parse status response: {}", e))
        })?;

        let outcome = Self::map_status(&intent.status);
        debug!(gateway_reference, status = %intent.status, ?outcome, "queried intent status");
        Ok(outcome)
    }

    fn provider_name(&self) -> &'static str {
        "gateway"
    }
}

// =============================================================================
// Gateway API Types
// =============================================================================

#[derive(Debug, Deserialize)]
struct IntentResponse {
    id: String,
    client_secret: String,
    #[serde(default)]
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IntentStatusResponse {
    id: String,
    status: String,
}

#[derive(Debug, Deserialize)]
struct GatewayErrorResponse {
    error: GatewayErrorBody,
}

#[derive(Debug, Deserialize)]
struct GatewayErrorBody {
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use flow_core::{Currency, Price};
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_order() -> Order {
        Order::new(Price::new(49.99, Currency::USD))
    }

    async fn gateway_against(server: &MockServer) -> HttpGateway {
        let config =
            GatewayConfig::new("gk_test_abc", "ghs_secret").with_api_base_url(server.uri());
        HttpGateway::new(config).unwrap()
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(HttpGateway::map_status("succeeded"), AttemptOutcome::Succeeded);
        assert_eq!(HttpGateway::map_status("payment_failed"), AttemptOutcome::Failed);
        assert_eq!(HttpGateway::map_status("canceled"), AttemptOutcome::Cancelled);
        assert_eq!(HttpGateway::map_status("requires_action"), AttemptOutcome::Pending);
    }

    #[tokio::test]
    async fn test_create_intent_ok() {
        let server = MockServer::start().await;
        let order = test_order();

        Mock::given(method("POST"))
            .and(path("/v1/payment_intents"))
            .and(header("Authorization", "Bearer gk_test_abc"))
            .and(body_partial_json(serde_json::json!({
                "amount": 4999,
                "currency": "usd",
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "pi_123",
                "client_secret": "pi_123_secret_xyz",
                "status": "requires_payment_method",
            })))
            .mount(&server)
            .await;

        let gateway = gateway_against(&server).await;
        let receipt = gateway.create_intent(&order).await.unwrap();
        assert_eq!(receipt.gateway_reference, "pi_123");
        assert_eq!(receipt.client_token, "pi_123_secret_xyz");
    }

    #[tokio::test]
    async fn test_create_intent_5xx_is_retryable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/payment_intents"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let gateway = gateway_against(&server).await;
        let err = gateway.create_intent(&test_order()).await.unwrap_err();
        assert!(matches!(err, PaymentError::GatewayUnavailable(_)));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_create_intent_4xx_is_not_retryable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/payment_intents"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": { "message": "amount must be positive" }
            })))
            .mount(&server)
            .await;

        let gateway = gateway_against(&server).await;
        let err = gateway.create_intent(&test_order()).await.unwrap_err();
        match err {
            PaymentError::GatewayRejected { message } => {
                assert_eq!(message, "amount must be positive");
            }
            other => panic!("expected GatewayRejected, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_query_status_maps_outcome() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/payment_intents/pi_123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "pi_123",
                "status": "succeeded",
            })))
            .mount(&server)
            .await;

        let gateway = gateway_against(&server).await;
        let outcome = gateway.query_status("pi_123").await.unwrap();
        assert_eq!(outcome, AttemptOutcome::Succeeded);
    }

    #[tokio::test]
    async fn test_query_status_unknown_reference() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/payment_intents/pi_missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let gateway = gateway_against(&server).await;
        let err = gateway.query_status("pi_missing").await.unwrap_err();
        assert!(matches!(err, PaymentError::AttemptUnknownToGateway { .. }));
    }
}
