use crate::domain::payment::{
    Currency, GatewayAggregate, Payment, PaymentGatewayKind, PaymentPage, PaymentProjection,
    PaymentStats, PaymentStatus, StatusAggregate,
};
use crate::repo::payment_store::{
    CreateOutcome, ListFilter, PaymentStore, RefundOutcome, StatsFilter, TransitionOutcome,
    TransitionUpdate,
};
use anyhow::{anyhow, Result};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

const PAYMENT_COLUMNS: &str = "id, order_id, user_id, gateway, amount, currency, status, \
     gateway_transaction_id, gateway_reference, redirect_url, last_notification_payload, \
     failure_reason, refunded_amount, completed_at, failed_at, created_at, updated_at";

#[derive(Clone)]
pub struct PgPaymentStore {
    pub pool: PgPool,
}

fn row_to_payment(row: &PgRow) -> Result<Payment> {
    let status: String = row.get("status");
    let gateway: String = row.get("gateway");
    let currency: String = row.get("currency");
    Ok(Payment {
        id: row.get("id"),
        order_id: row.get("order_id"),
        user_id: row.get("user_id"),
        gateway: PaymentGatewayKind::parse(&gateway)
            .ok_or_else(|| anyhow!("unknown gateway tag in storage: {gateway}"))?,
        amount: row.get("amount"),
        currency: Currency::parse(&currency)
            .ok_or_else(|| anyhow!("unknown currency in storage: {currency}"))?,
        status: PaymentStatus::parse(&status)
            .ok_or_else(|| anyhow!("unknown payment status in storage: {status}"))?,
        gateway_transaction_id: row.get("gateway_transaction_id"),
        gateway_reference: row.get("gateway_reference"),
        redirect_url: row.get("redirect_url"),
        last_notification_payload: row.get("last_notification_payload"),
        failure_reason: row.get("failure_reason"),
        refunded_amount: row.get("refunded_amount"),
        completed_at: row.get("completed_at"),
        failed_at: row.get("failed_at"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

fn status_strings(statuses: &[PaymentStatus]) -> Vec<String> {
    statuses.iter().map(|s| s.as_str().to_string()).collect()
}

#[async_trait::async_trait]
impl PaymentStore for PgPaymentStore {
    async fn create(&self, payment: Payment) -> Result<CreateOutcome> {
        let inserted = sqlx::query(
            r#"
            INSERT INTO payments (
                id, order_id, user_id, gateway, amount, currency, status,
                refunded_amount, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (order_id) WHERE status IN ('pending', 'processing') DO NOTHING
            "#,
        )
        .bind(payment.id)
        .bind(&payment.order_id)
        .bind(&payment.user_id)
        .bind(payment.gateway.as_str())
        .bind(payment.amount)
        .bind(payment.currency.as_str())
        .bind(payment.status.as_str())
        .bind(payment.refunded_amount)
        .bind(payment.created_at)
        .bind(payment.updated_at)
        .execute(&self.pool)
        .await?
        .rows_affected();

        if inserted == 1 {
            return Ok(CreateOutcome::Created(payment));
        }

        match self.find_active_by_order(&payment.order_id).await? {
            Some(existing) => Ok(CreateOutcome::Existing(existing)),
            None => Err(anyhow!(
                "payment insert for order {} conflicted but no active payment found",
                payment.order_id
            )),
        }
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Payment>> {
        let row = sqlx::query(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(row_to_payment).transpose()
    }

    async fn find_active_by_order(&self, order_id: &str) -> Result<Option<Payment>> {
        let row = sqlx::query(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments \
             WHERE order_id = $1 AND status IN ('pending', 'processing')"
        ))
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(row_to_payment).transpose()
    }

    async fn transition(
        &self,
        id: Uuid,
        expected: &[PaymentStatus],
        to: PaymentStatus,
        update: TransitionUpdate,
    ) -> Result<TransitionOutcome> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE payments SET
                status = $2,
                redirect_url = COALESCE($3, redirect_url),
                gateway_transaction_id = COALESCE($4, gateway_transaction_id),
                gateway_reference = COALESCE($5, gateway_reference),
                failure_reason = COALESCE($6, failure_reason),
                last_notification_payload = COALESCE($7, last_notification_payload),
                completed_at = COALESCE($8, completed_at),
                failed_at = COALESCE($9, failed_at),
                updated_at = now()
            WHERE id = $1 AND status = ANY($10)
            RETURNING {PAYMENT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(to.as_str())
        .bind(update.redirect_url)
        .bind(update.gateway_transaction_id)
        .bind(update.gateway_reference)
        .bind(update.failure_reason)
        .bind(update.last_notification_payload)
        .bind(update.completed_at)
        .bind(update.failed_at)
        .bind(status_strings(expected))
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = row {
            return Ok(TransitionOutcome::Applied(row_to_payment(&row)?));
        }

        let current: String = sqlx::query("SELECT status FROM payments WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(|r| r.get("status"))
            .ok_or_else(|| anyhow!("payment {id} not found during transition"))?;
        let current = PaymentStatus::parse(&current)
            .ok_or_else(|| anyhow!("unknown payment status in storage: {current}"))?;
        Ok(TransitionOutcome::Rejected { current })
    }

    async fn apply_refund(&self, id: Uuid, amount: i64) -> Result<RefundOutcome> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE payments SET
                refunded_amount = refunded_amount + $2,
                status = 'refunded',
                updated_at = now()
            WHERE id = $1
              AND status IN ('completed', 'refunded')
              AND refunded_amount + $2 <= amount
            RETURNING {PAYMENT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(amount)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = row {
            return Ok(RefundOutcome::Applied(row_to_payment(&row)?));
        }

        let row = sqlx::query("SELECT status, amount, refunded_amount FROM payments WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| anyhow!("payment {id} not found during refund"))?;
        let status: String = row.get("status");
        let current = PaymentStatus::parse(&status)
            .ok_or_else(|| anyhow!("unknown payment status in storage: {status}"))?;
        if matches!(current, PaymentStatus::Completed | PaymentStatus::Refunded) {
            let amount_total: i64 = row.get("amount");
            let refunded: i64 = row.get("refunded_amount");
            Ok(RefundOutcome::ExceedsRemaining {
                remaining: amount_total - refunded,
            })
        } else {
            Ok(RefundOutcome::Rejected { current })
        }
    }

    async fn list(&self, filter: &ListFilter) -> Result<PaymentPage> {
        let offset = (filter.page - 1).max(0) * filter.limit;
        let status = filter.status.map(|s| s.as_str().to_string());
        let gateway = filter.gateway.map(|g| g.as_str().to_string());

        let rows = sqlx::query(&format!(
            r#"
            SELECT {PAYMENT_COLUMNS} FROM payments
            WHERE ($1::text IS NULL OR user_id = $1)
              AND ($2::text IS NULL OR status = $2)
              AND ($3::text IS NULL OR gateway = $3)
            ORDER BY created_at DESC
            LIMIT $4 OFFSET $5
            "#
        ))
        .bind(&filter.user_id)
        .bind(&status)
        .bind(&gateway)
        .bind(filter.limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query(
            r#"
            SELECT COUNT(*) AS total FROM payments
            WHERE ($1::text IS NULL OR user_id = $1)
              AND ($2::text IS NULL OR status = $2)
              AND ($3::text IS NULL OR gateway = $3)
            "#,
        )
        .bind(&filter.user_id)
        .bind(&status)
        .bind(&gateway)
        .fetch_one(&self.pool)
        .await?
        .get("total");

        let items = rows
            .iter()
            .map(|r| row_to_payment(r).map(PaymentProjection::from))
            .collect::<Result<Vec<_>>>()?;

        Ok(PaymentPage {
            items,
            page: filter.page,
            limit: filter.limit,
            total,
        })
    }

    async fn stats(&self, filter: &StatsFilter) -> Result<PaymentStats> {
        let status_rows = sqlx::query(
            r#"
            SELECT status, COUNT(*) AS count, COALESCE(SUM(amount), 0)::BIGINT AS total_amount
            FROM payments
            WHERE ($1::text IS NULL OR user_id = $1)
              AND ($2::timestamptz IS NULL OR created_at >= $2)
              AND ($3::timestamptz IS NULL OR created_at < $3)
            GROUP BY status
            ORDER BY status
            "#,
        )
        .bind(&filter.user_id)
        .bind(filter.start)
        .bind(filter.end)
        .fetch_all(&self.pool)
        .await?;

        let gateway_rows = sqlx::query(
            r#"
            SELECT gateway, COUNT(*) AS count, COALESCE(SUM(amount), 0)::BIGINT AS total_amount
            FROM payments
            WHERE ($1::text IS NULL OR user_id = $1)
              AND ($2::timestamptz IS NULL OR created_at >= $2)
              AND ($3::timestamptz IS NULL OR created_at < $3)
            GROUP BY gateway
            ORDER BY gateway
            "#,
        )
        .bind(&filter.user_id)
        .bind(filter.start)
        .bind(filter.end)
        .fetch_all(&self.pool)
        .await?;

        let by_status = status_rows
            .iter()
            .map(|r| {
                let status: String = r.get("status");
                Ok(StatusAggregate {
                    status: PaymentStatus::parse(&status)
                        .ok_or_else(|| anyhow!("unknown payment status in storage: {status}"))?,
                    count: r.get("count"),
                    total_amount: r.get("total_amount"),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let by_gateway = gateway_rows
            .iter()
            .map(|r| {
                let gateway: String = r.get("gateway");
                Ok(GatewayAggregate {
                    gateway: PaymentGatewayKind::parse(&gateway)
                        .ok_or_else(|| anyhow!("unknown gateway tag in storage: {gateway}"))?,
                    count: r.get("count"),
                    total_amount: r.get("total_amount"),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(PaymentStats {
            by_status,
            by_gateway,
        })
    }
}
