//! # Payflow RS
//!
//! Payment and order reconciliation service.
//!
//! ## Usage
//!
//! ```bash
//! # Set environment variables
//! export GATEWAY_API_KEY=gk_test_...
//! export GATEWAY_WEBHOOK_SECRET=ghs_...
//!
//! # Run the server
//! payflow
//! ```

use flow_api::{routes, state::AppState};
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    // Initialize application state
    let state = AppState::new()?;

    let addr = state.config.socket_addr();
    let is_prod = state.config.is_production();

    info!("Environment: {}", state.config.environment);
    info!(
        "Payment attempt ceiling: {}",
        state.config.max_payment_attempts
    );

    // Create router
    let app = routes::create_router(state);

    // Start server
    info!("Payflow starting on http://{}", addr);

    if !is_prod {
        info!("Health: GET http://{}/health", addr);
        info!("Orders: POST http://{}/api/v1/orders", addr);
        info!("Webhook: POST http://{}/webhook/gateway", addr);
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
