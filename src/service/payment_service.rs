use crate::domain::payment::{
    Currency, InitiatePaymentRequest, InitiatePaymentResponse, Payment, PaymentGatewayKind,
    PaymentPage, PaymentProjection, PaymentStats, PaymentStatus,
};
use crate::error::PaymentError;
use crate::gateways::vnpay::VnpayAdapter;
use crate::gateways::{GatewayError, RedirectRequest};
use crate::orders::client::{OrderClient, OrderClientError};
use crate::repo::payment_store::{
    CreateOutcome, ListFilter, PaymentStore, RefundOutcome, StatsFilter, TransitionOutcome,
    TransitionUpdate,
};
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Clone)]
pub struct PaymentService {
    pub store: Arc<dyn PaymentStore>,
    pub orders: Arc<dyn OrderClient>,
    pub adapter: VnpayAdapter,
}

impl PaymentService {
    /// Idempotent initiation: validates the order against the collaborator,
    /// reuses any active payment for the same order (never a duplicate
    /// gateway session), otherwise creates a `pending` payment, builds the
    /// redirect, and promotes it to `processing`.
    pub async fn initiate(
        &self,
        req: InitiatePaymentRequest,
        requester: Option<String>,
        client_ip: String,
    ) -> Result<InitiatePaymentResponse, PaymentError> {
        if req.order_id.trim().is_empty() {
            return Err(PaymentError::Validation("order_id is required".to_string()));
        }
        // Falls back to the client-supplied user when no authenticated
        // requester is present; see DESIGN.md on this trust boundary.
        let user_id = requester
            .or(req.user_id.clone())
            .filter(|u| !u.is_empty())
            .ok_or_else(|| PaymentError::Validation("user_id is required".to_string()))?;

        let order = self
            .orders
            .fetch_order(&req.order_id)
            .await
            .map_err(map_order_error)?
            .ok_or(PaymentError::OrderNotFound)?;

        if order.user_id != user_id {
            return Err(PaymentError::Forbidden(
                "order does not belong to the requesting user".to_string(),
            ));
        }
        if order.is_paid() {
            return Err(PaymentError::OrderAlreadyPaid);
        }
        if order.total_amount <= 0 {
            return Err(PaymentError::InvalidAmount);
        }
        let currency = Currency::parse(&order.currency).ok_or_else(|| {
            PaymentError::Upstream(format!("order carries unsupported currency {}", order.currency))
        })?;

        let gateway = req.gateway.unwrap_or(PaymentGatewayKind::Vnpay);
        let now = Utc::now();
        let candidate = Payment {
            id: Uuid::new_v4(),
            order_id: req.order_id.clone(),
            user_id,
            gateway,
            amount: order.total_amount,
            currency,
            status: PaymentStatus::Pending,
            gateway_transaction_id: None,
            gateway_reference: None,
            redirect_url: None,
            last_notification_payload: None,
            failure_reason: None,
            refunded_amount: 0,
            completed_at: None,
            failed_at: None,
            created_at: now,
            updated_at: now,
        };

        let payment = match self.store.create(candidate).await? {
            CreateOutcome::Existing(existing) => {
                if let Some(url) = existing.redirect_url.clone() {
                    tracing::info!(
                        payment_id = %existing.id,
                        order_id = %existing.order_id,
                        "reusing active payment for order"
                    );
                    return Ok(InitiatePaymentResponse {
                        success: true,
                        payment_id: existing.id,
                        payment_url: url,
                        status: existing.status,
                    });
                }
                // A concurrent initiation created the row but has not
                // persisted its redirect yet; race it on the promotion.
                existing
            }
            CreateOutcome::Created(p) => p,
        };

        let redirect_req = RedirectRequest {
            payment_id: payment.id,
            amount: payment.amount,
            description: format!("Payment for order {}", payment.order_id),
            client_ip,
            bank_code: req.bank_code.clone(),
        };
        let url = self
            .adapter
            .build_redirect(&redirect_req, Utc::now())
            .map_err(|e| match e {
                GatewayError::InvalidAmount => PaymentError::InvalidAmount,
                GatewayError::InvalidReference(_) => PaymentError::Internal(e.into()),
            })?;

        let promoted = self
            .store
            .transition(
                payment.id,
                &[PaymentStatus::Pending],
                PaymentStatus::Processing,
                TransitionUpdate {
                    redirect_url: Some(url),
                    ..Default::default()
                },
            )
            .await?;

        let payment = match promoted {
            TransitionOutcome::Applied(p) => p,
            // Lost the promotion race; the winner's redirect is stored.
            TransitionOutcome::Rejected { .. } => self
                .store
                .find_by_id(payment.id)
                .await?
                .ok_or(PaymentError::PaymentNotFound)?,
        };

        let payment_url = payment
            .redirect_url
            .clone()
            .ok_or_else(|| PaymentError::Internal(anyhow::anyhow!("promoted payment has no redirect URL")))?;

        tracing::info!(
            payment_id = %payment.id,
            order_id = %payment.order_id,
            amount = payment.amount,
            "payment initiated"
        );

        Ok(InitiatePaymentResponse {
            success: true,
            payment_id: payment.id,
            payment_url,
            status: payment.status,
        })
    }

    /// Returns the payment if it exists and, when a requester is known,
    /// belongs to that user.
    pub async fn get_status(
        &self,
        payment_id: Uuid,
        requesting_user: Option<&str>,
    ) -> Result<PaymentProjection, PaymentError> {
        let payment = self
            .store
            .find_by_id(payment_id)
            .await?
            .ok_or(PaymentError::PaymentNotFound)?;

        if let Some(user) = requesting_user {
            if payment.user_id != user {
                return Err(PaymentError::Forbidden(
                    "payment does not belong to the requesting user".to_string(),
                ));
            }
        }
        Ok(payment.into())
    }

    pub async fn list(&self, filter: ListFilter) -> Result<PaymentPage, PaymentError> {
        Ok(self.store.list(&filter).await?)
    }

    pub async fn stats(&self, filter: StatsFilter) -> Result<PaymentStats, PaymentError> {
        Ok(self.store.stats(&filter).await?)
    }

    /// Administrative refund, outside the primary flow. Only `completed`
    /// (or partially refunded) payments qualify, and the cumulative
    /// refunded amount never exceeds the payment amount.
    pub async fn refund(
        &self,
        payment_id: Uuid,
        amount: i64,
    ) -> Result<PaymentProjection, PaymentError> {
        if amount <= 0 {
            return Err(PaymentError::Validation(
                "refund amount must be > 0".to_string(),
            ));
        }
        self.store
            .find_by_id(payment_id)
            .await?
            .ok_or(PaymentError::PaymentNotFound)?;

        match self.store.apply_refund(payment_id, amount).await? {
            RefundOutcome::Applied(p) => {
                tracing::info!(payment_id = %p.id, amount, "payment refunded");
                Ok(p.into())
            }
            RefundOutcome::Rejected { current } => Err(PaymentError::Conflict(format!(
                "cannot refund a payment in status {}",
                current.as_str()
            ))),
            RefundOutcome::ExceedsRemaining { remaining } => Err(PaymentError::Validation(
                format!("refund exceeds remaining refundable amount ({remaining})"),
            )),
        }
    }

    /// Administrative cancellation of a not-yet-terminal payment.
    pub async fn cancel(&self, payment_id: Uuid) -> Result<PaymentProjection, PaymentError> {
        self.store
            .find_by_id(payment_id)
            .await?
            .ok_or(PaymentError::PaymentNotFound)?;

        let outcome = self
            .store
            .transition(
                payment_id,
                &[PaymentStatus::Pending, PaymentStatus::Processing],
                PaymentStatus::Cancelled,
                TransitionUpdate::default(),
            )
            .await?;

        match outcome {
            TransitionOutcome::Applied(p) => {
                tracing::info!(payment_id = %p.id, "payment cancelled");
                Ok(p.into())
            }
            TransitionOutcome::Rejected { current } => Err(PaymentError::Conflict(format!(
                "cannot cancel a payment in status {}",
                current.as_str()
            ))),
        }
    }
}

fn map_order_error(e: OrderClientError) -> PaymentError {
    PaymentError::Upstream(e.to_string())
}
