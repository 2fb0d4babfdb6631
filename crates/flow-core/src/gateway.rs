//! # Payment Gateway Contract
//!
//! Narrow trait wrapping the external payment processor. Implementations
//! issue the outbound calls and translate responses into internal result
//! types; they never mutate local order state. All local mutation flows
//! through [`crate::lifecycle::PaymentLifecycle`].

use crate::error::PaymentResult;
use crate::order::{AttemptOutcome, Order};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Result of creating a payment intent gateway-side.
///
/// The client token is handed to the storefront so the gateway's hosted
/// element can complete payment; card data never touches this system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentReceipt {
    /// Opaque identifier the gateway assigned to this attempt
    pub gateway_reference: String,

    /// Client secret or redirect target for the hosted payment UI
    pub client_token: String,
}

/// Core trait for payment gateway implementations.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Create a payment intent for the order's amount and currency.
    ///
    /// # Errors
    /// * `GatewayUnavailable` on network errors or 5xx (retryable)
    /// * `GatewayRejected` on malformed amount/currency (non-retryable)
    async fn create_intent(&self, order: &Order) -> PaymentResult<IntentReceipt>;

    /// Query the authoritative status of an attempt.
    ///
    /// Fallback reconciliation path for attempts left pending past the
    /// webhook delivery window.
    ///
    /// # Errors
    /// * `AttemptUnknownToGateway` if the reference is unknown
    /// * `GatewayUnavailable` on network errors or 5xx
    async fn query_status(&self, gateway_reference: &str) -> PaymentResult<AttemptOutcome>;

    /// Get the gateway name (for logging)
    fn provider_name(&self) -> &'static str;
}

/// Type alias for a shared gateway handle (dynamic dispatch)
pub type SharedGateway = Arc<dyn PaymentGateway>;
