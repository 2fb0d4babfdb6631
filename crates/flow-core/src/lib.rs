//! # flow-core
//!
//! Core types and the payment lifecycle state machine for payflow-rs.
//!
//! This crate provides:
//! - `Order` and `PaymentAttempt` lifecycle records
//! - `PaymentLifecycle`, the single mutation entry point for payment state
//! - `OrderStore` with the webhook dedup ledger and conflict ledger
//! - `PaymentGateway` trait for external processor implementations
//! - `PaymentError` for typed error handling
//!
//! ## Example
//!
//! ```rust,ignore
//! use flow_core::{Currency, OrderStore, PaymentLifecycle, Price};
//!
//! let lifecycle = PaymentLifecycle::new(OrderStore::new(), gateway);
//!
//! // Mint an order and start payment
//! let order = lifecycle.create_order(Price::new(49.99, Currency::USD)).await?;
//! let receipt = lifecycle.initiate(&order.id).await?;
//!
//! // Hand receipt.client_token to the storefront; the verified outcome
//! // arrives later through the webhook handler:
//! lifecycle.apply_outcome(&receipt.gateway_reference, outcome, dedup_key).await?;
//! ```

pub mod error;
pub mod gateway;
pub mod lifecycle;
pub mod money;
pub mod order;
pub mod store;

// Re-exports for convenience
pub use error::{PaymentError, PaymentResult};
pub use gateway::{IntentReceipt, PaymentGateway, SharedGateway};
pub use lifecycle::{PaymentLifecycle, DEFAULT_MAX_ATTEMPTS};
pub use money::{Currency, Price};
pub use order::{AttemptOutcome, Order, OrderStatus, PaymentAttempt, PaymentStanding};
pub use store::{ApplyDisposition, ConflictRecord, OrderStore, ProcessedEvent};
