use crate::domain::payment::{
    Payment, PaymentGatewayKind, PaymentPage, PaymentStats, PaymentStatus,
};
use anyhow::Result;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Fields settable alongside a status transition. `None` leaves the
/// stored value untouched.
#[derive(Debug, Clone, Default)]
pub struct TransitionUpdate {
    pub redirect_url: Option<String>,
    pub gateway_transaction_id: Option<String>,
    pub gateway_reference: Option<String>,
    pub failure_reason: Option<String>,
    pub last_notification_payload: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
    pub failed_at: Option<DateTime<Utc>>,
}

/// Outcome of `create`: concurrent initiation for the same order collapses
/// into reuse of the already-active payment instead of a duplicate row.
#[derive(Debug, Clone)]
pub enum CreateOutcome {
    Created(Payment),
    Existing(Payment),
}

/// Outcome of a conditional transition. `Rejected` carries the status
/// actually stored at the moment of the update.
#[derive(Debug, Clone)]
pub enum TransitionOutcome {
    Applied(Payment),
    Rejected { current: PaymentStatus },
}

#[derive(Debug, Clone)]
pub enum RefundOutcome {
    Applied(Payment),
    Rejected { current: PaymentStatus },
    ExceedsRemaining { remaining: i64 },
}

#[derive(Debug, Clone, Default)]
pub struct ListFilter {
    pub user_id: Option<String>,
    pub status: Option<PaymentStatus>,
    pub gateway: Option<PaymentGatewayKind>,
    pub page: i64,
    pub limit: i64,
}

#[derive(Debug, Clone, Default)]
pub struct StatsFilter {
    pub user_id: Option<String>,
    /// Inclusive lower bound on `created_at`.
    pub start: Option<DateTime<Utc>>,
    /// Exclusive upper bound on `created_at`.
    pub end: Option<DateTime<Utc>>,
}

#[async_trait::async_trait]
pub trait PaymentStore: Send + Sync {
    /// Inserts the payment unless an active (`pending`/`processing`)
    /// payment already exists for the same order, in which case that
    /// payment is returned instead. Check-and-reuse is atomic.
    async fn create(&self, payment: Payment) -> Result<CreateOutcome>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Payment>>;

    async fn find_active_by_order(&self, order_id: &str) -> Result<Option<Payment>>;

    /// Applies `update` and moves the payment to `to` only if the stored
    /// status is among `expected` at the moment of the update.
    async fn transition(
        &self,
        id: Uuid,
        expected: &[PaymentStatus],
        to: PaymentStatus,
        update: TransitionUpdate,
    ) -> Result<TransitionOutcome>;

    /// Adds `amount` to the refunded total and marks the payment
    /// `refunded`, guarded by `refunded_amount + amount <= amount`.
    async fn apply_refund(&self, id: Uuid, amount: i64) -> Result<RefundOutcome>;

    async fn list(&self, filter: &ListFilter) -> Result<PaymentPage>;

    async fn stats(&self, filter: &StatsFilter) -> Result<PaymentStats>;
}
