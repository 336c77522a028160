use crate::orders::client::{OrderClient, OrderPaymentStatus};
use std::sync::Arc;

/// Propagates a payment's terminal outcome to the order service.
/// Best-effort: the payment's own state is already durably correct when
/// this runs, so a collaborator failure is logged and swallowed rather
/// than surfaced to the gateway.
#[derive(Clone)]
pub struct OrderReconciler {
    pub orders: Arc<dyn OrderClient>,
}

impl OrderReconciler {
    pub async fn set_order_payment_status(&self, order_id: &str, status: OrderPaymentStatus) {
        if let Err(e) = self.orders.set_payment_status(order_id, status).await {
            tracing::warn!(
                order_id,
                status = status.as_str(),
                error = %e,
                "order reconciliation failed"
            );
        }
    }
}
