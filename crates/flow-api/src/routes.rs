//! # Routes
//!
//! Axum router configuration for the payment API.

use crate::handlers;
use crate::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Create the main application router
///
/// Routes:
/// - Orders:
///   - POST /api/v1/orders - Create order
///   - GET  /api/v1/orders/{id} - Fetch order
///   - POST /api/v1/orders/{id}/cancel - Cancel before initiation
///
/// - Payment lifecycle:
///   - POST /api/v1/orders/{id}/payment - Initiate payment
///   - POST /api/v1/orders/{id}/payment/retry - Retry failed payment
///   - GET  /api/v1/orders/{id}/payment - Tri-state status
///   - POST /api/v1/orders/{id}/payment/reconcile - queryStatus fallback
///
/// - Operators:
///   - GET /api/v1/conflicts - Conflict ledger
///
/// - Webhooks:
///   - POST /webhook/gateway - Gateway webhook handler
pub fn create_router(state: AppState) -> Router {
    // CORS configuration for the storefront client
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let order_routes = Router::new()
        .route("/orders", post(handlers::create_order))
        .route("/orders/{order_id}", get(handlers::get_order))
        .route("/orders/{order_id}/cancel", post(handlers::cancel_order))
        .route(
            "/orders/{order_id}/payment",
            post(handlers::initiate_payment).get(handlers::payment_status),
        )
        .route(
            "/orders/{order_id}/payment/retry",
            post(handlers::retry_payment),
        )
        .route(
            "/orders/{order_id}/payment/reconcile",
            post(handlers::reconcile_payment),
        )
        .route("/conflicts", get(handlers::list_conflicts));

    // Webhook routes (no CORS, must accept raw body)
    let webhook_routes = Router::new().route("/gateway", post(handlers::gateway_webhook));

    Router::new()
        // Health check at root
        .route("/health", get(handlers::health))
        .route("/", get(handlers::health))
        // API v1
        .nest("/api/v1", order_routes)
        // Webhooks
        .nest("/webhook", webhook_routes)
        // Middleware
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        // State
        .with_state(state)
}
