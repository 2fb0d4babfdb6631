//! # Request Handlers
//!
//! Axum request handlers for the payment API. Loosely-typed request
//! bodies are mapped to the typed contract here, before anything reaches
//! the state machine.

use crate::state::AppState;
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use flow_core::{ApplyDisposition, Currency, PaymentError, PaymentStanding, Price};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};

// =============================================================================
// Request/Response Types
// =============================================================================

/// Create order request
#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    /// Decimal amount (e.g. 49.99)
    pub amount: f64,
    /// ISO 4217 currency code
    #[serde(default = "default_currency")]
    pub currency: String,
}

fn default_currency() -> String {
    "usd".to_string()
}

/// Initiate/retry payment response
#[derive(Debug, Serialize)]
pub struct InitiateResponse {
    /// Gateway-side identifier for the attempt
    pub gateway_reference: String,
    /// Client secret / redirect token for the hosted payment element
    pub client_token: String,
}

/// Client-facing payment status (post-redirect reconciliation)
#[derive(Debug, Serialize)]
pub struct StandingResponse {
    pub status: PaymentStanding,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, code: u16) -> Self {
        Self {
            error: error.into(),
            code,
            details: None,
        }
    }
}

fn payment_error_to_response(err: PaymentError) -> (StatusCode, Json<ErrorResponse>) {
    let code = err.status_code();
    let response = ErrorResponse::new(err.to_string(), code);
    (
        StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        Json(response),
    )
}

// =============================================================================
// Handlers
// =============================================================================

/// Health check endpoint
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "payflow",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Create an order awaiting payment
#[instrument(skip(state, request))]
pub async fn create_order(
    State(state): State<AppState>,
    Json(request): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<flow_core::Order>), (StatusCode, Json<ErrorResponse>)> {
    let currency = Currency::parse(&request.currency).ok_or_else(|| {
        payment_error_to_response(PaymentError::InvalidRequest(format!(
            "unsupported currency: {}",
            request.currency
        )))
    })?;

    let order = state
        .lifecycle
        .create_order(Price::new(request.amount, currency))
        .await
        .map_err(payment_error_to_response)?;

    Ok((StatusCode::CREATED, Json(order)))
}

/// Fetch an order
pub async fn get_order(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
) -> Result<Json<flow_core::Order>, (StatusCode, Json<ErrorResponse>)> {
    let order = state
        .lifecycle
        .order(&order_id)
        .await
        .map_err(payment_error_to_response)?;
    Ok(Json(order))
}

/// Customer cancellation, valid only before payment initiation
#[instrument(skip(state))]
pub async fn cancel_order(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
) -> Result<Json<flow_core::Order>, (StatusCode, Json<ErrorResponse>)> {
    let order = state
        .lifecycle
        .cancel_order(&order_id)
        .await
        .map_err(payment_error_to_response)?;
    Ok(Json(order))
}

/// Initiate payment for an order
#[instrument(skip(state))]
pub async fn initiate_payment(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
) -> Result<Json<InitiateResponse>, (StatusCode, Json<ErrorResponse>)> {
    let receipt = state.lifecycle.initiate(&order_id).await.map_err(|e| {
        error!(order_id = %order_id, error = %e, "payment initiation failed");
        payment_error_to_response(e)
    })?;

    Ok(Json(InitiateResponse {
        gateway_reference: receipt.gateway_reference,
        client_token: receipt.client_token,
    }))
}

/// Re-attempt payment for an order whose last attempt failed
#[instrument(skip(state))]
pub async fn retry_payment(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
) -> Result<Json<InitiateResponse>, (StatusCode, Json<ErrorResponse>)> {
    let receipt = state.lifecycle.retry(&order_id).await.map_err(|e| {
        warn!(order_id = %order_id, error = %e, "payment retry rejected");
        payment_error_to_response(e)
    })?;

    Ok(Json(InitiateResponse {
        gateway_reference: receipt.gateway_reference,
        client_token: receipt.client_token,
    }))
}

/// Tri-state payment status for the post-redirect success page.
/// The redirect itself carries no verified outcome, so the client polls
/// this until the webhook (or reconciliation) lands.
pub async fn payment_status(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
) -> Result<Json<StandingResponse>, (StatusCode, Json<ErrorResponse>)> {
    let status = state
        .lifecycle
        .standing(&order_id)
        .await
        .map_err(payment_error_to_response)?;
    Ok(Json(StandingResponse { status }))
}

/// Run the queryStatus fallback for an order's pending attempts
#[instrument(skip(state))]
pub async fn reconcile_payment(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
) -> Result<Json<serde_json::Value>, (StatusCode, Json<ErrorResponse>)> {
    let dispositions = state.lifecycle.reconcile(&order_id).await.map_err(|e| {
        warn!(order_id = %order_id, error = %e, "reconciliation failed");
        payment_error_to_response(e)
    })?;

    let applied = dispositions
        .iter()
        .filter(|d| **d == ApplyDisposition::Applied)
        .count();
    Ok(Json(serde_json::json!({
        "order_id": order_id,
        "applied": applied,
    })))
}

/// Conflict ledger for operator review
pub async fn list_conflicts(State(state): State<AppState>) -> impl IntoResponse {
    let conflicts = state.lifecycle.conflicts().await;
    let count = conflicts.len();
    Json(serde_json::json!({
        "conflicts": conflicts,
        "count": count
    }))
}

/// Handle a gateway webhook notification.
///
/// Acknowledgment codes drive the gateway's redelivery logic:
/// - 2xx for anything handled, including logical duplicates and events
///   for unknown attempts (redelivering those cannot help)
/// - 4xx for authenticity/parse failures (never retried by us)
/// - 5xx for internal failures, so the gateway redelivers later
#[instrument(skip(state, headers, body))]
pub async fn gateway_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, (StatusCode, Json<ErrorResponse>)> {
    let signature = headers
        .get("gateway-signature")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse::new("Missing Gateway-Signature header", 400)),
            )
        })?;

    let notification = state.verifier.verify(&body, signature).map_err(|e| {
        error!(error = %e, "webhook verification failed");
        payment_error_to_response(e)
    })?;

    info!(
        dedup_key = %notification.dedup_key,
        gateway_reference = %notification.gateway_reference,
        outcome = ?notification.outcome,
        "received verified webhook"
    );

    let disposition = state
        .lifecycle
        .apply_outcome(
            &notification.gateway_reference,
            notification.outcome,
            &notification.dedup_key,
        )
        .await
        .map_err(|e| {
            // Store-level failure: retryable acknowledgment so the
            // gateway redelivers, distinct from a logical duplicate.
            error!(error = %e, "failed to apply webhook outcome");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ErrorResponse::new(e.to_string(), 503)),
            )
        })?;

    match disposition {
        ApplyDisposition::Applied => info!("payment outcome applied"),
        ApplyDisposition::Duplicate => info!("duplicate delivery, no-op"),
        ApplyDisposition::AlreadyResolved => info!("attempt already terminal, no-op"),
        ApplyDisposition::Ignored => info!("non-terminal outcome, ignored"),
        ApplyDisposition::UnknownReference => {
            warn!(
                gateway_reference = %notification.gateway_reference,
                "event for unknown attempt, discarded"
            );
        }
        ApplyDisposition::Conflict => {
            error!(
                gateway_reference = %notification.gateway_reference,
                "conflicting success recorded for manual review"
            );
        }
    }

    Ok(StatusCode::OK)
}
