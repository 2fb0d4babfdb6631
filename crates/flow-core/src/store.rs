//! # Order Store
//!
//! In-memory store for orders, payment attempts, the webhook dedup
//! ledger, and the conflict ledger. Every mutation runs under a single
//! write guard, so the dedup check and the state transition it gates are
//! one atomic unit with respect to concurrent webhook deliveries and
//! user-initiated requests.

use crate::error::{PaymentError, PaymentResult};
use crate::money::Price;
use crate::order::{AttemptOutcome, Order, PaymentAttempt};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Ledger entry for a processed webhook dedup key
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessedEvent {
    /// Gateway-issued dedup key
    pub dedup_key: String,
    /// When the event was applied (or recognized as a no-op)
    pub processed_at: DateTime<Utc>,
}

/// Record of a rejected second-success outcome, kept for operator review
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConflictRecord {
    /// Order that already has a succeeded attempt
    pub order_id: String,
    /// The attempt that already succeeded
    pub succeeded_attempt_id: String,
    /// The attempt the conflicting event targeted
    pub conflicting_attempt_id: String,
    /// Dedup key of the conflicting event
    pub dedup_key: String,
    /// When the conflict was noted
    pub noted_at: DateTime<Utc>,
}

/// What `apply_outcome` did with a verified notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyDisposition {
    /// Attempt resolved and order status updated
    Applied,
    /// Dedup key already processed; nothing changed
    Duplicate,
    /// Attempt was already terminal; dedup key recorded, nothing changed
    AlreadyResolved,
    /// No attempt matches the reference; nothing recorded so a later
    /// redelivery can still apply
    UnknownReference,
    /// Second success for the order under a different attempt; recorded
    /// in the conflict ledger, never auto-resolved
    Conflict,
    /// Notification carried a non-terminal outcome; ignored
    Ignored,
}

#[derive(Default)]
struct StoreInner {
    orders: HashMap<String, Order>,
    attempts: HashMap<String, PaymentAttempt>,
    /// gateway_reference -> attempt_id
    by_reference: HashMap<String, String>,
    /// dedup_key -> ledger entry
    processed: HashMap<String, ProcessedEvent>,
    conflicts: Vec<ConflictRecord>,
}

impl StoreInner {
    fn order_mut(&mut self, order_id: &str) -> PaymentResult<&mut Order> {
        self.orders
            .get_mut(order_id)
            .ok_or_else(|| PaymentError::OrderNotFound {
                order_id: order_id.to_string(),
            })
    }

    fn has_pending_attempt(&self, order: &Order) -> bool {
        order
            .attempt_ids
            .iter()
            .filter_map(|id| self.attempts.get(id))
            .any(|a| a.is_pending())
    }

    fn succeeded_attempt_id(&self, order: &Order) -> Option<String> {
        order
            .attempt_ids
            .iter()
            .filter_map(|id| self.attempts.get(id))
            .find(|a| a.outcome == AttemptOutcome::Succeeded)
            .map(|a| a.attempt_id.clone())
    }

    fn record_processed(&mut self, dedup_key: &str) {
        self.processed.insert(
            dedup_key.to_string(),
            ProcessedEvent {
                dedup_key: dedup_key.to_string(),
                processed_at: Utc::now(),
            },
        );
    }
}

/// Shared order/attempt store. Cheap to clone; all clones share state.
#[derive(Clone, Default)]
pub struct OrderStore {
    inner: Arc<RwLock<StoreInner>>,
}

impl OrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new order
    pub async fn create_order(&self, amount: Price) -> Order {
        let order = Order::new(amount);
        let mut inner = self.inner.write().await;
        inner.orders.insert(order.id.clone(), order.clone());
        order
    }

    /// Fetch an order by ID
    pub async fn get_order(&self, order_id: &str) -> PaymentResult<Order> {
        let inner = self.inner.read().await;
        inner
            .orders
            .get(order_id)
            .cloned()
            .ok_or_else(|| PaymentError::OrderNotFound {
                order_id: order_id.to_string(),
            })
    }

    /// All attempts for an order, chronological
    pub async fn attempts_for_order(&self, order_id: &str) -> PaymentResult<Vec<PaymentAttempt>> {
        let inner = self.inner.read().await;
        let order = inner
            .orders
            .get(order_id)
            .ok_or_else(|| PaymentError::OrderNotFound {
                order_id: order_id.to_string(),
            })?;
        Ok(order
            .attempt_ids
            .iter()
            .filter_map(|id| inner.attempts.get(id).cloned())
            .collect())
    }

    /// Customer cancellation before payment initiation. An order with a
    /// reserved (pending) attempt is already past the point of no return.
    pub async fn cancel_order(&self, order_id: &str) -> PaymentResult<Order> {
        let mut inner = self.inner.write().await;
        let order = inner
            .orders
            .get(order_id)
            .ok_or_else(|| PaymentError::OrderNotFound {
                order_id: order_id.to_string(),
            })?;
        if inner.has_pending_attempt(order) {
            return Err(PaymentError::OrderNotEligible {
                reason: format!("order {} has a payment attempt in flight", order_id),
            });
        }
        let order = inner.order_mut(order_id)?;
        order.cancel()?;
        Ok(order.clone())
    }

    /// Reserve a fresh pending attempt for an order.
    ///
    /// Check-then-act under the write guard: the order must be eligible,
    /// must not have a pending attempt, and must be under the attempt
    /// ceiling. Two concurrent initiations race here and exactly one wins.
    pub async fn reserve_attempt(
        &self,
        order_id: &str,
        max_attempts: u32,
    ) -> PaymentResult<PaymentAttempt> {
        let mut inner = self.inner.write().await;

        let order = inner
            .orders
            .get(order_id)
            .ok_or_else(|| PaymentError::OrderNotFound {
                order_id: order_id.to_string(),
            })?;

        if !order.is_eligible_for_payment() {
            return Err(PaymentError::OrderNotEligible {
                reason: format!("order {} is {:?}", order_id, order.status),
            });
        }
        if inner.has_pending_attempt(order) {
            return Err(PaymentError::OrderNotEligible {
                reason: format!("order {} already has a pending attempt", order_id),
            });
        }
        if order.attempt_ids.len() as u32 >= max_attempts {
            return Err(PaymentError::TooManyAttempts {
                order_id: order_id.to_string(),
                limit: max_attempts,
            });
        }

        let attempt = PaymentAttempt::new(order_id);
        let order = inner.order_mut(order_id)?;
        order.attempt_ids.push(attempt.attempt_id.clone());
        inner
            .attempts
            .insert(attempt.attempt_id.clone(), attempt.clone());

        debug!(order_id, attempt_id = %attempt.attempt_id, "reserved payment attempt");
        Ok(attempt)
    }

    /// Attach the gateway reference to a reserved attempt and move the
    /// order to `PaymentInitiated`.
    pub async fn attach_reference(
        &self,
        attempt_id: &str,
        gateway_reference: &str,
    ) -> PaymentResult<()> {
        let mut inner = self.inner.write().await;

        let order_id = {
            let attempt = inner.attempts.get_mut(attempt_id).ok_or_else(|| {
                PaymentError::Internal(format!("reserved attempt {} missing", attempt_id))
            })?;
            attempt.gateway_reference = Some(gateway_reference.to_string());
            attempt.order_id.clone()
        };

        inner
            .by_reference
            .insert(gateway_reference.to_string(), attempt_id.to_string());
        inner.order_mut(&order_id)?.mark_initiated()?;
        Ok(())
    }

    /// Resolve a reserved attempt as cancelled after a gateway failure,
    /// leaving the order eligible for another try.
    pub async fn abort_attempt(&self, attempt_id: &str) -> PaymentResult<()> {
        let mut inner = self.inner.write().await;
        let attempt = inner.attempts.get_mut(attempt_id).ok_or_else(|| {
            PaymentError::Internal(format!("reserved attempt {} missing", attempt_id))
        })?;
        attempt.resolve(AttemptOutcome::Cancelled)
    }

    /// The single authoritative mutation point for verified payment
    /// outcomes. Steps 1-5 of the application protocol run under one
    /// write guard:
    ///
    /// 1. dedup key already processed -> `Duplicate`, no mutation
    /// 2. unknown gateway reference -> `UnknownReference`, nothing
    ///    recorded (a redelivery after the reference exists can apply)
    /// 3. attempt already terminal -> `AlreadyResolved`, key recorded
    /// 4. second success for the order -> `Conflict`, recorded for
    ///    manual review, key recorded, state untouched
    /// 5. otherwise resolve the attempt, update the order, record the key
    pub async fn apply_outcome(
        &self,
        gateway_reference: &str,
        outcome: AttemptOutcome,
        dedup_key: &str,
    ) -> PaymentResult<ApplyDisposition> {
        let mut inner = self.inner.write().await;

        if inner.processed.contains_key(dedup_key) {
            debug!(dedup_key, "duplicate webhook event, skipping");
            return Ok(ApplyDisposition::Duplicate);
        }

        let attempt_id = match inner.by_reference.get(gateway_reference) {
            Some(id) => id.clone(),
            None => {
                warn!(gateway_reference, dedup_key, "event for unknown attempt, discarding");
                return Ok(ApplyDisposition::UnknownReference);
            }
        };

        if !outcome.is_terminal() {
            debug!(gateway_reference, "non-terminal outcome in notification, ignoring");
            return Ok(ApplyDisposition::Ignored);
        }

        let (order_id, already_terminal) = {
            let attempt = inner.attempts.get(&attempt_id).ok_or_else(|| {
                PaymentError::Internal(format!("indexed attempt {} missing", attempt_id))
            })?;
            (attempt.order_id.clone(), attempt.outcome.is_terminal())
        };

        if already_terminal {
            inner.record_processed(dedup_key);
            return Ok(ApplyDisposition::AlreadyResolved);
        }

        if outcome == AttemptOutcome::Succeeded {
            let order = inner.order_mut(&order_id)?.clone();
            if let Some(winner) = inner.succeeded_attempt_id(&order) {
                warn!(
                    order_id = %order_id,
                    succeeded_attempt = %winner,
                    conflicting_attempt = %attempt_id,
                    dedup_key,
                    "second succeeded outcome for order, flagging for manual review"
                );
                inner.conflicts.push(ConflictRecord {
                    order_id,
                    succeeded_attempt_id: winner,
                    conflicting_attempt_id: attempt_id,
                    dedup_key: dedup_key.to_string(),
                    noted_at: Utc::now(),
                });
                inner.record_processed(dedup_key);
                return Ok(ApplyDisposition::Conflict);
            }
        }

        inner
            .attempts
            .get_mut(&attempt_id)
            .ok_or_else(|| {
                PaymentError::Internal(format!("indexed attempt {} missing", attempt_id))
            })?
            .resolve(outcome)?;

        let order = inner.order_mut(&order_id)?;
        match outcome {
            AttemptOutcome::Succeeded => order.mark_paid(),
            AttemptOutcome::Failed | AttemptOutcome::Cancelled => order.mark_payment_failed(),
            AttemptOutcome::Pending => unreachable!("non-terminal outcomes ignored above"),
        }

        inner.record_processed(dedup_key);
        debug!(gateway_reference, ?outcome, dedup_key, "applied payment outcome");
        Ok(ApplyDisposition::Applied)
    }

    /// Pending attempts of an order that have a gateway reference,
    /// candidates for the queryStatus reconciliation path.
    pub async fn pending_references(&self, order_id: &str) -> PaymentResult<Vec<String>> {
        let attempts = self.attempts_for_order(order_id).await?;
        Ok(attempts
            .into_iter()
            .filter(|a| a.is_pending())
            .filter_map(|a| a.gateway_reference)
            .collect())
    }

    /// Snapshot of the conflict ledger for operator review
    pub async fn conflicts(&self) -> Vec<ConflictRecord> {
        self.inner.read().await.conflicts.clone()
    }

    /// Whether a dedup key has been recorded as processed
    pub async fn is_processed(&self, dedup_key: &str) -> bool {
        self.inner.read().await.processed.contains_key(dedup_key)
    }
}
