//! # Payment Lifecycle
//!
//! The state machine governing order payment status. All initiation,
//! retry, outcome application, and reconciliation flows through this one
//! entry point; handlers never mutate the store directly.
//!
//! ```text
//! Order:   created ──> payment_initiated ──> paid
//!                              │                ▲
//!                              ▼                │
//!                       payment_failed ──> payment_initiated (retry)
//!
//! Attempt: pending ──> succeeded | failed | cancelled  (terminal, once)
//! ```

use crate::error::{PaymentError, PaymentResult};
use crate::gateway::{IntentReceipt, SharedGateway};
use crate::money::Price;
use crate::order::{AttemptOutcome, Order, OrderStatus, PaymentAttempt, PaymentStanding};
use crate::store::{ApplyDisposition, ConflictRecord, OrderStore};
use tracing::{info, instrument, warn};

/// Default ceiling on payment attempts per order
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Orchestrates the order payment state machine.
///
/// Owns the store and a gateway handle. Gateway I/O is never awaited
/// while a store lock is held; the store's own write guard provides the
/// per-order atomic check-then-act unit.
#[derive(Clone)]
pub struct PaymentLifecycle {
    store: OrderStore,
    gateway: SharedGateway,
    max_attempts: u32,
}

impl PaymentLifecycle {
    /// Create a lifecycle over a store and gateway
    pub fn new(store: OrderStore, gateway: SharedGateway) -> Self {
        Self {
            store,
            gateway,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    /// Builder: set the per-order attempt ceiling
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Mint a new order awaiting payment
    #[instrument(skip(self))]
    pub async fn create_order(&self, amount: Price) -> PaymentResult<Order> {
        if amount.amount <= 0 {
            return Err(PaymentError::InvalidRequest(
                "order amount must be positive".to_string(),
            ));
        }
        let order = self.store.create_order(amount).await;
        info!(order_id = %order.id, amount = %order.amount.display(), "created order");
        Ok(order)
    }

    /// Fetch an order
    pub async fn order(&self, order_id: &str) -> PaymentResult<Order> {
        self.store.get_order(order_id).await
    }

    /// All payment attempts for an order, chronological
    pub async fn attempts(&self, order_id: &str) -> PaymentResult<Vec<PaymentAttempt>> {
        self.store.attempts_for_order(order_id).await
    }

    /// Customer cancellation, valid only before payment initiation
    #[instrument(skip(self))]
    pub async fn cancel_order(&self, order_id: &str) -> PaymentResult<Order> {
        self.store.cancel_order(order_id).await
    }

    /// Start payment for an eligible order.
    ///
    /// Reserves a pending attempt, creates the gateway-side intent, then
    /// attaches the reference and moves the order to `payment_initiated`.
    /// A gateway failure resolves the reserved attempt as cancelled and
    /// leaves the order eligible for another try.
    #[instrument(skip(self))]
    pub async fn initiate(&self, order_id: &str) -> PaymentResult<IntentReceipt> {
        let attempt = self
            .store
            .reserve_attempt(order_id, self.max_attempts)
            .await?;
        let order = self.store.get_order(order_id).await?;

        match self.gateway.create_intent(&order).await {
            Ok(receipt) => {
                self.store
                    .attach_reference(&attempt.attempt_id, &receipt.gateway_reference)
                    .await?;
                info!(
                    order_id,
                    attempt_id = %attempt.attempt_id,
                    gateway_reference = %receipt.gateway_reference,
                    "payment initiated"
                );
                Ok(receipt)
            }
            Err(e) => {
                warn!(order_id, attempt_id = %attempt.attempt_id, error = %e, "gateway intent creation failed");
                self.store.abort_attempt(&attempt.attempt_id).await?;
                Err(e)
            }
        }
    }

    /// Re-attempt payment for an order whose last attempt failed.
    ///
    /// Prior attempts are retained untouched; the ceiling configured on
    /// this lifecycle guards against retry storms.
    #[instrument(skip(self))]
    pub async fn retry(&self, order_id: &str) -> PaymentResult<IntentReceipt> {
        let order = self.store.get_order(order_id).await?;
        if order.status != OrderStatus::PaymentFailed {
            return Err(PaymentError::OrderNotEligible {
                reason: format!(
                    "retry requires a failed payment, order {} is {:?}",
                    order_id, order.status
                ),
            });
        }
        self.initiate(order_id).await
    }

    /// Apply a verified gateway outcome. Thin passthrough to the store's
    /// atomic application; exists so handlers have a single entry point.
    #[instrument(skip(self))]
    pub async fn apply_outcome(
        &self,
        gateway_reference: &str,
        outcome: AttemptOutcome,
        dedup_key: &str,
    ) -> PaymentResult<ApplyDisposition> {
        self.store
            .apply_outcome(gateway_reference, outcome, dedup_key)
            .await
    }

    /// Client-facing tri-state for the post-redirect status page
    pub async fn standing(&self, order_id: &str) -> PaymentResult<PaymentStanding> {
        Ok(self.store.get_order(order_id).await?.standing())
    }

    /// Fallback reconciliation: query the gateway for each pending
    /// attempt of the order and apply any terminal outcome through the
    /// normal idempotent path. Synthetic dedup keys keep re-runs no-ops.
    #[instrument(skip(self))]
    pub async fn reconcile(&self, order_id: &str) -> PaymentResult<Vec<ApplyDisposition>> {
        let references = self.store.pending_references(order_id).await?;
        let mut dispositions = Vec::with_capacity(references.len());

        for reference in references {
            let outcome = match self.gateway.query_status(&reference).await {
                Ok(outcome) => outcome,
                Err(PaymentError::AttemptUnknownToGateway { .. }) => {
                    warn!(gateway_reference = %reference, "gateway does not know reference, leaving pending");
                    continue;
                }
                Err(e) => return Err(e),
            };

            if !outcome.is_terminal() {
                continue;
            }

            let dedup_key = format!("query:{}:{}", reference, outcome_key(outcome));
            let disposition = self
                .store
                .apply_outcome(&reference, outcome, &dedup_key)
                .await?;
            dispositions.push(disposition);
        }

        Ok(dispositions)
    }

    /// Snapshot of the conflict ledger for operator review
    pub async fn conflicts(&self) -> Vec<ConflictRecord> {
        self.store.conflicts().await
    }
}

fn outcome_key(outcome: AttemptOutcome) -> &'static str {
    match outcome {
        AttemptOutcome::Pending => "pending",
        AttemptOutcome::Succeeded => "succeeded",
        AttemptOutcome::Failed => "failed",
        AttemptOutcome::Cancelled => "cancelled",
    }
}
