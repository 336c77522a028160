use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentGatewayKind {
    Vnpay,
}

impl PaymentGatewayKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentGatewayKind::Vnpay => "vnpay",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "vnpay" => Some(PaymentGatewayKind::Vnpay),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Vnd,
}

impl Currency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::Vnd => "VND",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "VND" => Some(Currency::Vnd),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Refunded,
    Cancelled,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Processing => "processing",
            PaymentStatus::Completed => "completed",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Refunded => "refunded",
            PaymentStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(PaymentStatus::Pending),
            "processing" => Some(PaymentStatus::Processing),
            "completed" => Some(PaymentStatus::Completed),
            "failed" => Some(PaymentStatus::Failed),
            "refunded" => Some(PaymentStatus::Refunded),
            "cancelled" => Some(PaymentStatus::Cancelled),
            _ => None,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, PaymentStatus::Pending | PaymentStatus::Processing)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, PaymentStatus::Completed | PaymentStatus::Failed)
    }
}

/// The sole stateful entity. `id` doubles as the transaction reference
/// sent to the gateway (hyphenless form, see [`Payment::txn_ref`]).
#[derive(Debug, Clone, Serialize)]
pub struct Payment {
    pub id: Uuid,
    pub order_id: String,
    pub user_id: String,
    pub gateway: PaymentGatewayKind,
    pub amount: i64,
    pub currency: Currency,
    pub status: PaymentStatus,
    pub gateway_transaction_id: Option<String>,
    pub gateway_reference: Option<String>,
    pub redirect_url: Option<String>,
    pub last_notification_payload: Option<String>,
    pub failure_reason: Option<String>,
    pub refunded_amount: i64,
    pub completed_at: Option<DateTime<Utc>>,
    pub failed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Payment {
    /// Merchant-side transaction reference correlating a gateway session
    /// back to this payment.
    pub fn txn_ref(&self) -> String {
        self.id.simple().to_string()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct InitiatePaymentRequest {
    pub order_id: String,
    pub gateway: Option<PaymentGatewayKind>,
    pub bank_code: Option<String>,
    pub ip_addr: Option<String>,
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InitiatePaymentResponse {
    pub success: bool,
    pub payment_id: Uuid,
    pub payment_url: String,
    pub status: PaymentStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentProjection {
    pub id: Uuid,
    pub order_id: String,
    pub user_id: String,
    pub gateway: PaymentGatewayKind,
    pub amount: i64,
    pub currency: Currency,
    pub status: PaymentStatus,
    pub gateway_transaction_id: Option<String>,
    pub payment_url: Option<String>,
    pub failure_reason: Option<String>,
    pub refunded_amount: i64,
    pub completed_at: Option<DateTime<Utc>>,
    pub failed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Payment> for PaymentProjection {
    fn from(p: Payment) -> Self {
        PaymentProjection {
            id: p.id,
            order_id: p.order_id,
            user_id: p.user_id,
            gateway: p.gateway,
            amount: p.amount,
            currency: p.currency,
            status: p.status,
            gateway_transaction_id: p.gateway_transaction_id,
            payment_url: p.redirect_url,
            failure_reason: p.failure_reason,
            refunded_amount: p.refunded_amount,
            completed_at: p.completed_at,
            failed_at: p.failed_at,
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentPage {
    pub items: Vec<PaymentProjection>,
    pub page: i64,
    pub limit: i64,
    pub total: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusAggregate {
    pub status: PaymentStatus,
    pub count: i64,
    pub total_amount: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct GatewayAggregate {
    pub gateway: PaymentGatewayKind,
    pub count: i64,
    pub total_amount: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentStats {
    pub by_status: Vec<StatusAggregate>,
    pub by_gateway: Vec<GatewayAggregate>,
}

#[derive(Debug, Serialize)]
pub struct ErrorEnvelope {
    pub success: bool,
    pub error: ErrorPayload,
}

#[derive(Debug, Serialize)]
pub struct ErrorPayload {
    pub code: String,
    pub message: String,
}

impl ErrorEnvelope {
    pub fn new(code: &str, message: &str) -> Self {
        ErrorEnvelope {
            success: false,
            error: ErrorPayload {
                code: code.to_string(),
                message: message.to_string(),
            },
        }
    }
}
