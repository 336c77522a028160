use crate::domain::payment::PaymentStatus;

/// Statuses a payment must currently hold for a transition into `target`
/// to be applied. The store enforces this set atomically at update time;
/// it is the sole mechanism preventing double-processing of terminal
/// notifications under concurrent delivery.
pub fn allowed_sources(target: PaymentStatus) -> &'static [PaymentStatus] {
    match target {
        PaymentStatus::Pending => &[],
        PaymentStatus::Processing => &[PaymentStatus::Pending],
        PaymentStatus::Completed => &[PaymentStatus::Processing],
        PaymentStatus::Failed => &[PaymentStatus::Processing],
        // `refunded -> refunded` covers accumulating partial refunds.
        PaymentStatus::Refunded => &[PaymentStatus::Completed, PaymentStatus::Refunded],
        PaymentStatus::Cancelled => &[PaymentStatus::Pending, PaymentStatus::Processing],
    }
}

pub fn is_allowed(from: PaymentStatus, to: PaymentStatus) -> bool {
    allowed_sources(to).contains(&from)
}
