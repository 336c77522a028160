use crate::domain::payment::{
    GatewayAggregate, Payment, PaymentPage, PaymentProjection, PaymentStats, PaymentStatus,
    StatusAggregate,
};
use crate::repo::payment_store::{
    CreateOutcome, ListFilter, PaymentStore, RefundOutcome, StatsFilter, TransitionOutcome,
    TransitionUpdate,
};
use anyhow::{anyhow, Result};
use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;
use uuid::Uuid;

/// HashMap-backed store with the same transition guarantees as the
/// Postgres implementation. Used for tests and local development; the
/// mutex is held only across the map operation, never across an await.
#[derive(Default)]
pub struct InMemoryPaymentStore {
    payments: Mutex<HashMap<Uuid, Payment>>,
}

impl InMemoryPaymentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl PaymentStore for InMemoryPaymentStore {
    async fn create(&self, payment: Payment) -> Result<CreateOutcome> {
        let mut payments = self.payments.lock().unwrap();
        if let Some(existing) = payments
            .values()
            .find(|p| p.order_id == payment.order_id && p.status.is_active())
        {
            return Ok(CreateOutcome::Existing(existing.clone()));
        }
        payments.insert(payment.id, payment.clone());
        Ok(CreateOutcome::Created(payment))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Payment>> {
        Ok(self.payments.lock().unwrap().get(&id).cloned())
    }

    async fn find_active_by_order(&self, order_id: &str) -> Result<Option<Payment>> {
        Ok(self
            .payments
            .lock()
            .unwrap()
            .values()
            .find(|p| p.order_id == order_id && p.status.is_active())
            .cloned())
    }

    async fn transition(
        &self,
        id: Uuid,
        expected: &[PaymentStatus],
        to: PaymentStatus,
        update: TransitionUpdate,
    ) -> Result<TransitionOutcome> {
        let mut payments = self.payments.lock().unwrap();
        let payment = payments
            .get_mut(&id)
            .ok_or_else(|| anyhow!("payment {id} not found during transition"))?;

        if !expected.contains(&payment.status) {
            return Ok(TransitionOutcome::Rejected {
                current: payment.status,
            });
        }

        payment.status = to;
        if let Some(v) = update.redirect_url {
            payment.redirect_url = Some(v);
        }
        if let Some(v) = update.gateway_transaction_id {
            payment.gateway_transaction_id = Some(v);
        }
        if let Some(v) = update.gateway_reference {
            payment.gateway_reference = Some(v);
        }
        if let Some(v) = update.failure_reason {
            payment.failure_reason = Some(v);
        }
        if let Some(v) = update.last_notification_payload {
            payment.last_notification_payload = Some(v);
        }
        if let Some(v) = update.completed_at {
            payment.completed_at = Some(v);
        }
        if let Some(v) = update.failed_at {
            payment.failed_at = Some(v);
        }
        payment.updated_at = Utc::now();
        Ok(TransitionOutcome::Applied(payment.clone()))
    }

    async fn apply_refund(&self, id: Uuid, amount: i64) -> Result<RefundOutcome> {
        let mut payments = self.payments.lock().unwrap();
        let payment = payments
            .get_mut(&id)
            .ok_or_else(|| anyhow!("payment {id} not found during refund"))?;

        if !matches!(
            payment.status,
            PaymentStatus::Completed | PaymentStatus::Refunded
        ) {
            return Ok(RefundOutcome::Rejected {
                current: payment.status,
            });
        }
        if payment.refunded_amount + amount > payment.amount {
            return Ok(RefundOutcome::ExceedsRemaining {
                remaining: payment.amount - payment.refunded_amount,
            });
        }

        payment.refunded_amount += amount;
        payment.status = PaymentStatus::Refunded;
        payment.updated_at = Utc::now();
        Ok(RefundOutcome::Applied(payment.clone()))
    }

    async fn list(&self, filter: &ListFilter) -> Result<PaymentPage> {
        let payments = self.payments.lock().unwrap();
        let mut matched: Vec<&Payment> = payments
            .values()
            .filter(|p| filter.user_id.as_deref().is_none_or(|u| p.user_id == u))
            .filter(|p| filter.status.is_none_or(|s| p.status == s))
            .filter(|p| filter.gateway.is_none_or(|g| p.gateway == g))
            .collect();
        matched.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let total = matched.len() as i64;
        let offset = ((filter.page - 1).max(0) * filter.limit) as usize;
        let items = matched
            .into_iter()
            .skip(offset)
            .take(filter.limit as usize)
            .map(|p| PaymentProjection::from(p.clone()))
            .collect();

        Ok(PaymentPage {
            items,
            page: filter.page,
            limit: filter.limit,
            total,
        })
    }

    async fn stats(&self, filter: &StatsFilter) -> Result<PaymentStats> {
        let payments = self.payments.lock().unwrap();
        let mut by_status: BTreeMap<&'static str, StatusAggregate> = BTreeMap::new();
        let mut by_gateway: BTreeMap<&'static str, GatewayAggregate> = BTreeMap::new();

        for p in payments.values() {
            if filter.user_id.as_deref().is_some_and(|u| p.user_id != u) {
                continue;
            }
            if filter.start.is_some_and(|s| p.created_at < s) {
                continue;
            }
            if filter.end.is_some_and(|e| p.created_at >= e) {
                continue;
            }
            let status_entry =
                by_status
                    .entry(p.status.as_str())
                    .or_insert_with(|| StatusAggregate {
                        status: p.status,
                        count: 0,
                        total_amount: 0,
                    });
            status_entry.count += 1;
            status_entry.total_amount += p.amount;

            let gateway_entry =
                by_gateway
                    .entry(p.gateway.as_str())
                    .or_insert_with(|| GatewayAggregate {
                        gateway: p.gateway,
                        count: 0,
                        total_amount: 0,
                    });
            gateway_entry.count += 1;
            gateway_entry.total_amount += p.amount;
        }

        Ok(PaymentStats {
            by_status: by_status.into_values().collect(),
            by_gateway: by_gateway.into_values().collect(),
        })
    }
}
