use serde::Serialize;
use uuid::Uuid;

pub mod vnpay;

/// Inputs for building a client-facing redirect to the gateway's hosted
/// payment page.
#[derive(Debug, Clone)]
pub struct RedirectRequest {
    pub payment_id: Uuid,
    pub amount: i64,
    pub description: String,
    pub client_ip: String,
    pub bank_code: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("amount must be > 0")]
    InvalidAmount,

    #[error("transaction reference {0:?} does not satisfy the gateway format")]
    InvalidReference(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentOutcome {
    Completed,
    Failed,
}

/// A verified, decoded gateway notification. Produced only after the
/// signature check has passed.
#[derive(Debug, Clone)]
pub struct GatewayNotification {
    pub outcome: PaymentOutcome,
    pub message: String,
    pub txn_ref: String,
    pub transaction_id: Option<String>,
    pub bank_reference: Option<String>,
    pub amount_minor: Option<i64>,
    pub response_code: String,
}

#[derive(Debug, Clone)]
pub enum Interpretation {
    InvalidSignature,
    Notification(GatewayNotification),
}

/// Acknowledgement consumed by the gateway's IPN redelivery logic, not by
/// the paying user.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct IpnAck {
    #[serde(rename = "RspCode")]
    pub rsp_code: &'static str,
    #[serde(rename = "Message")]
    pub message: &'static str,
}

impl IpnAck {
    pub const CONFIRMED: IpnAck = IpnAck {
        rsp_code: "00",
        message: "Confirm Success",
    };
    pub const ORDER_NOT_FOUND: IpnAck = IpnAck {
        rsp_code: "01",
        message: "Order Not Found",
    };
    pub const ALREADY_CONFIRMED: IpnAck = IpnAck {
        rsp_code: "02",
        message: "Order already confirmed",
    };
    pub const INVALID_AMOUNT: IpnAck = IpnAck {
        rsp_code: "04",
        message: "Invalid amount",
    };
    pub const INVALID_SIGNATURE: IpnAck = IpnAck {
        rsp_code: "97",
        message: "Invalid signature",
    };
    pub const UNKNOWN_ERROR: IpnAck = IpnAck {
        rsp_code: "99",
        message: "Unknown error",
    };
}
