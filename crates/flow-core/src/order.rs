//! # Order & Payment Attempt Types
//!
//! Order lifecycle records and the payment attempts made against them.
//! State transitions go through the methods here; the store never pokes
//! fields directly.

use crate::error::{PaymentError, PaymentResult};
use crate::money::Price;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Order payment lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Order exists, no payment started
    Created,
    /// A payment attempt is in flight with the gateway
    PaymentInitiated,
    /// Exactly one attempt succeeded
    Paid,
    /// Most recent attempt failed or was cancelled
    PaymentFailed,
    /// Cancelled by the customer before any payment was initiated
    Cancelled,
}

impl Default for OrderStatus {
    fn default() -> Self {
        OrderStatus::Created
    }
}

/// Client-facing tri-state for the post-redirect status query.
///
/// The redirect back from the gateway carries no verified outcome, so
/// `Pending` is reported until an authoritative event lands. Pending is
/// never conflated with `Success`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStanding {
    Pending,
    Success,
    Failed,
}

/// An order awaiting (or past) payment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    /// Unique order ID (generated)
    pub id: String,

    /// Lifecycle status
    #[serde(default)]
    pub status: OrderStatus,

    /// Order total; immutable once payment is initiated
    pub amount: Price,

    /// Attempt IDs in chronological order
    #[serde(default)]
    pub attempt_ids: Vec<String>,

    /// Created timestamp
    pub created_at: DateTime<Utc>,

    /// Last mutation timestamp
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Create a new order with generated ID
    pub fn new(amount: Price) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            status: OrderStatus::Created,
            amount,
            attempt_ids: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// True when a new payment attempt may be started
    pub fn is_eligible_for_payment(&self) -> bool {
        matches!(
            self.status,
            OrderStatus::Created | OrderStatus::PaymentFailed
        )
    }

    /// Transition to `PaymentInitiated`
    pub fn mark_initiated(&mut self) -> PaymentResult<()> {
        if !self.is_eligible_for_payment() {
            return Err(PaymentError::OrderNotEligible {
                reason: format!("order {} is {:?}", self.id, self.status),
            });
        }
        self.status = OrderStatus::PaymentInitiated;
        self.touch();
        Ok(())
    }

    /// Transition to `Paid` (driven by a succeeded attempt)
    pub fn mark_paid(&mut self) {
        self.status = OrderStatus::Paid;
        self.touch();
    }

    /// Transition to `PaymentFailed` (driven by a failed/cancelled attempt)
    pub fn mark_payment_failed(&mut self) {
        self.status = OrderStatus::PaymentFailed;
        self.touch();
    }

    /// Customer cancellation, valid only before payment is initiated
    pub fn cancel(&mut self) -> PaymentResult<()> {
        if self.status != OrderStatus::Created {
            return Err(PaymentError::OrderNotEligible {
                reason: format!("order {} is {:?}, only created orders can be cancelled", self.id, self.status),
            });
        }
        self.status = OrderStatus::Cancelled;
        self.touch();
        Ok(())
    }

    /// The tri-state reported to the storefront client
    pub fn standing(&self) -> PaymentStanding {
        match self.status {
            OrderStatus::Created | OrderStatus::PaymentInitiated => PaymentStanding::Pending,
            OrderStatus::Paid => PaymentStanding::Success,
            OrderStatus::PaymentFailed | OrderStatus::Cancelled => PaymentStanding::Failed,
        }
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// Terminal or in-flight outcome of one payment attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptOutcome {
    /// Awaiting an authoritative outcome
    Pending,
    /// Payment completed
    Succeeded,
    /// Payment declined or errored at the gateway
    Failed,
    /// Abandoned or explicitly cancelled
    Cancelled,
}

impl AttemptOutcome {
    /// True for succeeded/failed/cancelled
    pub fn is_terminal(&self) -> bool {
        !matches!(self, AttemptOutcome::Pending)
    }

    fn pending() -> Self {
        AttemptOutcome::Pending
    }
}

/// One try at completing payment for an order.
///
/// Attempts are append-only: they resolve to a terminal outcome exactly
/// once and are retained afterwards as the audit trail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentAttempt {
    /// Unique attempt ID (generated at initiation)
    pub attempt_id: String,

    /// Owning order
    pub order_id: String,

    /// Opaque identifier assigned by the gateway; set once the intent
    /// has been created gateway-side
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gateway_reference: Option<String>,

    /// Current outcome
    #[serde(default = "AttemptOutcome::pending")]
    pub outcome: AttemptOutcome,

    /// Created timestamp
    pub created_at: DateTime<Utc>,

    /// Set exactly once, when the outcome becomes terminal
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,
}

impl PaymentAttempt {
    /// Create a fresh pending attempt for an order
    pub fn new(order_id: impl Into<String>) -> Self {
        Self {
            attempt_id: Uuid::new_v4().to_string(),
            order_id: order_id.into(),
            gateway_reference: None,
            outcome: AttemptOutcome::Pending,
            created_at: Utc::now(),
            resolved_at: None,
        }
    }

    /// True until the attempt reaches a terminal outcome
    pub fn is_pending(&self) -> bool {
        self.outcome == AttemptOutcome::Pending
    }

    /// Resolve to a terminal outcome. Resolving an already-terminal
    /// attempt or resolving to `Pending` is rejected; callers treat the
    /// former as an idempotent no-op before getting here.
    pub fn resolve(&mut self, outcome: AttemptOutcome) -> PaymentResult<()> {
        if !outcome.is_terminal() {
            return Err(PaymentError::Internal(
                "cannot resolve an attempt to pending".to_string(),
            ));
        }
        if self.outcome.is_terminal() {
            return Err(PaymentError::Internal(format!(
                "attempt {} already resolved to {:?}",
                self.attempt_id, self.outcome
            )));
        }
        self.outcome = outcome;
        self.resolved_at = Some(Utc::now());
        Ok(())
    }
}
