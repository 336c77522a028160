use crate::domain::payment::ErrorEnvelope;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

/// Service-boundary error taxonomy. Every variant maps to a structured
/// JSON envelope; nothing here escapes a handler as a panic.
#[derive(Debug, thiserror::Error)]
pub enum PaymentError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("order not found")]
    OrderNotFound,

    #[error("payment not found")]
    PaymentNotFound,

    #[error("order is already paid")]
    OrderAlreadyPaid,

    #[error("{0}")]
    Conflict(String),

    #[error("order carries a non-positive settlable amount")]
    InvalidAmount,

    #[error("order service unavailable: {0}")]
    Upstream(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl PaymentError {
    pub fn status(&self) -> StatusCode {
        match self {
            PaymentError::Validation(_) => StatusCode::BAD_REQUEST,
            PaymentError::Forbidden(_) => StatusCode::FORBIDDEN,
            PaymentError::OrderNotFound | PaymentError::PaymentNotFound => StatusCode::NOT_FOUND,
            PaymentError::OrderAlreadyPaid => StatusCode::BAD_REQUEST,
            PaymentError::Conflict(_) => StatusCode::CONFLICT,
            // Signals upstream data corruption, not user error.
            PaymentError::InvalidAmount => StatusCode::INTERNAL_SERVER_ERROR,
            PaymentError::Upstream(_) => StatusCode::SERVICE_UNAVAILABLE,
            PaymentError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            PaymentError::Validation(_) => "VALIDATION_ERROR",
            PaymentError::Forbidden(_) => "FORBIDDEN",
            PaymentError::OrderNotFound => "ORDER_NOT_FOUND",
            PaymentError::PaymentNotFound => "PAYMENT_NOT_FOUND",
            PaymentError::OrderAlreadyPaid => "ORDER_ALREADY_PAID",
            PaymentError::Conflict(_) => "CONFLICT",
            PaymentError::InvalidAmount => "INVALID_AMOUNT",
            PaymentError::Upstream(_) => "UPSTREAM_UNAVAILABLE",
            PaymentError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for PaymentError {
    fn into_response(self) -> Response {
        if matches!(self, PaymentError::Internal(_) | PaymentError::Upstream(_)) {
            tracing::error!(error = %self, "request failed");
        }
        let body = ErrorEnvelope::new(self.code(), &self.to_string());
        (self.status(), Json(body)).into_response()
    }
}
