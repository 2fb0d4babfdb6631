//! # flow-api
//!
//! HTTP API layer for payflow-rs.
//!
//! This crate provides:
//! - Axum-based HTTP server
//! - REST endpoints for the order payment lifecycle
//! - Webhook handler for gateway notifications
//!
//! ## Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | GET | `/health` | Health check |
//! | POST | `/api/v1/orders` | Create order |
//! | POST | `/api/v1/orders/:id/payment` | Initiate payment |
//! | POST | `/api/v1/orders/:id/payment/retry` | Retry failed payment |
//! | GET | `/api/v1/orders/:id/payment` | Tri-state payment status |
//! | POST | `/webhook/gateway` | Gateway webhook |

pub mod handlers;
pub mod routes;
pub mod state;

pub use routes::create_router;
pub use state::{AppConfig, AppState};
