//! # Payment Error Types
//!
//! Typed error handling for the payflow payment lifecycle.
//! All lifecycle and gateway operations return `Result<T, PaymentError>`.

use thiserror::Error;

/// Core error type for all payment operations
#[derive(Debug, Error)]
pub enum PaymentError {
    /// Configuration errors (missing keys, invalid config)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Invalid request data (bad amount, unsupported currency, malformed body)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Order not found in the store
    #[error("Order not found: {order_id}")]
    OrderNotFound { order_id: String },

    /// No payment attempt matches the gateway reference
    #[error("Unknown payment attempt: {gateway_reference}")]
    UnknownAttempt { gateway_reference: String },

    /// Order is not in a state that allows the requested transition
    #[error("Order not eligible: {reason}")]
    OrderNotEligible { reason: String },

    /// A second succeeded outcome arrived for an order under a different attempt
    #[error("Conflicting payment for order {order_id}: attempt {attempt_id} already succeeded")]
    ConflictingPayment {
        order_id: String,
        attempt_id: String,
    },

    /// Retry ceiling reached for the order
    #[error("Too many payment attempts for order {order_id} (limit {limit})")]
    TooManyAttempts { order_id: String, limit: u32 },

    /// Gateway rejected the request (4xx, non-retryable)
    #[error("Gateway rejected request: {message}")]
    GatewayRejected { message: String },

    /// Gateway unreachable or returned 5xx (retryable)
    #[error("Gateway unavailable: {0}")]
    GatewayUnavailable(String),

    /// The gateway does not know the queried reference
    #[error("Reference unknown to gateway: {gateway_reference}")]
    AttemptUnknownToGateway { gateway_reference: String },

    /// Webhook signature verification failed
    #[error("Webhook signature invalid: {0}")]
    SignatureInvalid(String),

    /// Webhook payload parsing error
    #[error("Webhook parse error: {0}")]
    WebhookParse(String),

    /// Internal error (should not happen)
    #[error("Internal error: {0}")]
    Internal(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl PaymentError {
    /// Returns true if this error is retryable by the caller
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PaymentError::GatewayUnavailable(_) | PaymentError::Internal(_)
        )
    }

    /// Returns the HTTP status code appropriate for this error
    pub fn status_code(&self) -> u16 {
        match self {
            PaymentError::Configuration(_) => 500,
            PaymentError::InvalidRequest(_) => 400,
            PaymentError::OrderNotFound { .. } => 404,
            PaymentError::UnknownAttempt { .. } => 404,
            PaymentError::OrderNotEligible { .. } => 409,
            PaymentError::ConflictingPayment { .. } => 409,
            PaymentError::TooManyAttempts { .. } => 429,
            PaymentError::GatewayRejected { .. } => 402,
            PaymentError::GatewayUnavailable(_) => 503,
            PaymentError::AttemptUnknownToGateway { .. } => 404,
            PaymentError::SignatureInvalid(_) => 401,
            PaymentError::WebhookParse(_) => 400,
            PaymentError::Internal(_) => 500,
            PaymentError::Serialization(_) => 500,
        }
    }
}

/// Result type alias for payment operations
pub type PaymentResult<T> = Result<T, PaymentError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_errors() {
        assert!(PaymentError::GatewayUnavailable("timeout".into()).is_retryable());
        assert!(!PaymentError::GatewayRejected {
            message: "bad amount".into()
        }
        .is_retryable());
        assert!(!PaymentError::InvalidRequest("bad data".into()).is_retryable());
        assert!(!PaymentError::SignatureInvalid("mismatch".into()).is_retryable());
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            PaymentError::OrderNotFound {
                order_id: "x".into()
            }
            .status_code(),
            404
        );
        assert_eq!(
            PaymentError::OrderNotEligible {
                reason: "pending attempt".into()
            }
            .status_code(),
            409
        );
        assert_eq!(
            PaymentError::TooManyAttempts {
                order_id: "x".into(),
                limit: 5
            }
            .status_code(),
            429
        );
        assert_eq!(PaymentError::SignatureInvalid("t".into()).status_code(), 401);
        assert_eq!(PaymentError::GatewayUnavailable("t".into()).status_code(), 503);
    }
}
