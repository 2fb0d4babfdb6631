//! # flow-gateway
//!
//! Payment gateway integration for payflow-rs.
//!
//! This crate provides:
//! - `HttpGateway` implementing the `PaymentGateway` contract over HTTP
//! - `WebhookVerifier` for HMAC-SHA256 notification verification
//! - `GatewayConfig` loaded from environment variables
//!
//! ## Example
//!
//! ```rust,ignore
//! use flow_gateway::{GatewayConfig, HttpGateway, WebhookVerifier};
//!
//! let config = GatewayConfig::from_env()?;
//! let verifier = WebhookVerifier::new(config.webhook_secret.clone());
//! let gateway = HttpGateway::new(config)?;
//!
//! let receipt = gateway.create_intent(&order).await?;
//! // ...later, in the webhook handler:
//! let notification = verifier.verify(&body, &signature_header)?;
//! ```

pub mod client;
pub mod config;
pub mod webhook;

pub use client::HttpGateway;
pub use config::GatewayConfig;
pub use webhook::{signature_header, GatewayNotification, WebhookVerifier};
