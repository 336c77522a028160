use crate::domain::payment::{Payment, PaymentStatus};
use crate::domain::transition::allowed_sources;
use crate::gateways::vnpay::VnpayAdapter;
use crate::gateways::{GatewayNotification, Interpretation, IpnAck, PaymentOutcome};
use crate::orders::client::OrderPaymentStatus;
use crate::orders::reconciler::OrderReconciler;
use crate::repo::payment_store::{PaymentStore, TransitionOutcome, TransitionUpdate};
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::Arc;
use uuid::Uuid;

/// Handles the two gateway-facing inbound channels: the authoritative
/// server-to-server notification (IPN) and the advisory browser return.
/// Both converge on the store's conditional transition; no ordering
/// between them is assumed.
#[derive(Clone)]
pub struct WebhookProcessor {
    pub store: Arc<dyn PaymentStore>,
    pub adapter: VnpayAdapter,
    pub reconciler: OrderReconciler,
    pub frontend_return_url: String,
}

pub fn parse_params(raw: &str) -> BTreeMap<String, String> {
    url::form_urlencoded::parse(raw.as_bytes())
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect()
}

impl WebhookProcessor {
    /// Processes one notification delivery. Safe to execute any number of
    /// times with the same payload; every failure becomes an
    /// acknowledgement code, never an error to the gateway.
    pub async fn process_notification(&self, raw_body: &str) -> IpnAck {
        let params = parse_params(raw_body);
        let notification = match self.adapter.interpret(&params) {
            Interpretation::InvalidSignature => {
                tracing::warn!("notification rejected: invalid signature");
                return IpnAck::INVALID_SIGNATURE;
            }
            Interpretation::Notification(n) => n,
        };

        match self.apply(&notification, raw_body).await {
            Ok(ack) => ack,
            Err(e) => {
                tracing::error!(txn_ref = %notification.txn_ref, error = %e, "notification processing failed");
                IpnAck::UNKNOWN_ERROR
            }
        }
    }

    async fn apply(
        &self,
        notification: &GatewayNotification,
        raw_body: &str,
    ) -> anyhow::Result<IpnAck> {
        let payment = match self.resolve(&notification.txn_ref).await? {
            Some(p) => p,
            None => {
                tracing::info!(txn_ref = %notification.txn_ref, "notification for unknown transaction reference");
                return Ok(IpnAck::ORDER_NOT_FOUND);
            }
        };

        // The amount is a required notification field; absent or
        // unparseable is as fatal as a mismatch.
        let ipn_amount = match notification.amount_minor {
            Some(a) => a,
            None => {
                tracing::warn!(
                    payment_id = %payment.id,
                    "notification carries no parseable amount"
                );
                return Ok(IpnAck::INVALID_AMOUNT);
            }
        };
        if ipn_amount != VnpayAdapter::scale_amount(payment.amount) {
            tracing::warn!(
                payment_id = %payment.id,
                ipn_amount,
                expected = VnpayAdapter::scale_amount(payment.amount),
                "notification amount mismatch"
            );
            return Ok(IpnAck::INVALID_AMOUNT);
        }

        let target = match notification.outcome {
            PaymentOutcome::Completed => PaymentStatus::Completed,
            PaymentOutcome::Failed => PaymentStatus::Failed,
        };

        // Redelivery of an already-applied outcome: acknowledge, write
        // nothing, reconcile nothing.
        if payment.status == target {
            return Ok(IpnAck::CONFIRMED);
        }

        let now = Utc::now();
        let update = TransitionUpdate {
            gateway_transaction_id: notification.transaction_id.clone(),
            gateway_reference: notification.bank_reference.clone(),
            last_notification_payload: Some(raw_body.to_string()),
            failure_reason: (target == PaymentStatus::Failed)
                .then(|| notification.message.clone()),
            completed_at: (target == PaymentStatus::Completed).then_some(now),
            failed_at: (target == PaymentStatus::Failed).then_some(now),
            ..Default::default()
        };

        let outcome = self
            .store
            .transition(payment.id, allowed_sources(target), target, update)
            .await?;

        match outcome {
            TransitionOutcome::Applied(p) => {
                tracing::info!(
                    payment_id = %p.id,
                    order_id = %p.order_id,
                    status = target.as_str(),
                    response_code = %notification.response_code,
                    "payment reached terminal state"
                );
                let order_status = match target {
                    PaymentStatus::Completed => OrderPaymentStatus::Paid,
                    _ => OrderPaymentStatus::Failed,
                };
                self.reconciler
                    .set_order_payment_status(&p.order_id, order_status)
                    .await;
                Ok(IpnAck::CONFIRMED)
            }
            // Lost a race with a concurrent delivery of the same outcome.
            TransitionOutcome::Rejected { current } if current == target => Ok(IpnAck::CONFIRMED),
            // The payment is already settled with a different outcome;
            // terminal states never flip.
            TransitionOutcome::Rejected { current }
                if !current.is_active() =>
            {
                tracing::warn!(
                    payment_id = %payment.id,
                    current = current.as_str(),
                    attempted = target.as_str(),
                    "conflicting notification for settled payment ignored"
                );
                Ok(IpnAck::ALREADY_CONFIRMED)
            }
            TransitionOutcome::Rejected { current } => {
                // Still pending: the redirect promotion has not landed
                // yet. Let the gateway redeliver.
                tracing::warn!(
                    payment_id = %payment.id,
                    current = current.as_str(),
                    attempted = target.as_str(),
                    "notification arrived before payment left pending"
                );
                Ok(IpnAck::UNKNOWN_ERROR)
            }
        }
    }

    /// Browser-facing return channel. Runs the same verification and
    /// interpretation as the IPN path and may apply the same conditional
    /// transition defensively, but its only real output is where to send
    /// the user; it never overrides a status the webhook already set.
    pub async fn handle_return(&self, raw_query: &str) -> String {
        let params = parse_params(raw_query);
        let notification = match self.adapter.interpret(&params) {
            Interpretation::InvalidSignature => {
                tracing::warn!("return redirect rejected: invalid signature");
                return self.result_url(&[("error", "invalid_signature")]);
            }
            Interpretation::Notification(n) => n,
        };

        if let Err(e) = self.apply(&notification, raw_query).await {
            tracing::error!(txn_ref = %notification.txn_ref, error = %e, "return-channel processing failed");
        }

        let payment = match self.resolve(&notification.txn_ref).await {
            Ok(Some(p)) => p,
            Ok(None) => return self.result_url(&[("error", "payment_not_found")]),
            Err(e) => {
                tracing::error!(error = %e, "return-channel lookup failed");
                return self.result_url(&[("error", "internal")]);
            }
        };

        let payment_id = payment.id.to_string();
        self.result_url(&[
            ("paymentId", payment_id.as_str()),
            ("orderId", payment.order_id.as_str()),
            ("status", payment.status.as_str()),
        ])
    }

    /// Appends result parameters to the configured frontend URL,
    /// preserving any query string it already carries.
    fn result_url(&self, pairs: &[(&str, &str)]) -> String {
        match url::Url::parse(&self.frontend_return_url) {
            Ok(mut url) => {
                url.query_pairs_mut().extend_pairs(pairs);
                url.into()
            }
            Err(e) => {
                tracing::error!(error = %e, "frontend return URL is not parseable");
                self.frontend_return_url.clone()
            }
        }
    }

    async fn resolve(&self, txn_ref: &str) -> anyhow::Result<Option<Payment>> {
        let payment_id = match Uuid::parse_str(txn_ref) {
            Ok(id) => id,
            Err(_) => return Ok(None),
        };
        self.store.find_by_id(payment_id).await
    }
}
