use crate::domain::payment::{InitiatePaymentRequest, PaymentGatewayKind, PaymentStatus};
use crate::error::PaymentError;
use crate::repo::payment_store::{ListFilter, StatsFilter};
use crate::AppState;
use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::Json;
use chrono::{NaiveDate, TimeZone, Utc};
use serde::Deserialize;
use uuid::Uuid;

const DEFAULT_PAGE_SIZE: i64 = 20;
const MAX_PAGE_SIZE: i64 = 100;

fn requesting_user(headers: &HeaderMap) -> Option<String> {
    headers
        .get("X-User-Id")
        .and_then(|h| h.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

pub async fn initiate_payment(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<InitiatePaymentRequest>,
) -> impl IntoResponse {
    let requester = requesting_user(&headers);
    let client_ip = req
        .ip_addr
        .clone()
        .or_else(|| {
            headers
                .get("x-forwarded-for")
                .and_then(|h| h.to_str().ok())
                .map(str::to_string)
        })
        .unwrap_or_else(|| "127.0.0.1".to_string());

    match state.payment_service.initiate(req, requester, client_ip).await {
        Ok(resp) => (axum::http::StatusCode::OK, Json(resp)).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn get_payment(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(payment_id): Path<Uuid>,
) -> impl IntoResponse {
    let requester = requesting_user(&headers);
    match state
        .payment_service
        .get_status(payment_id, requester.as_deref())
        .await
    {
        Ok(p) => (axum::http::StatusCode::OK, Json(p)).into_response(),
        Err(e) => e.into_response(),
    }
}

#[derive(Deserialize)]
pub struct ListQuery {
    pub user_id: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub status: Option<String>,
    pub gateway: Option<String>,
}

pub async fn list_payments(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> impl IntoResponse {
    let filter = match list_filter(query) {
        Ok(f) => f,
        Err(e) => return e.into_response(),
    };
    match state.payment_service.list(filter).await {
        Ok(page) => (axum::http::StatusCode::OK, Json(page)).into_response(),
        Err(e) => e.into_response(),
    }
}

pub fn list_filter(query: ListQuery) -> Result<ListFilter, PaymentError> {
    let status = query
        .status
        .as_deref()
        .filter(|s| !s.is_empty())
        .map(|s| {
            PaymentStatus::parse(s)
                .ok_or_else(|| PaymentError::Validation(format!("unknown status {s:?}")))
        })
        .transpose()?;
    let gateway = query
        .gateway
        .as_deref()
        .filter(|g| !g.is_empty())
        .map(|g| {
            PaymentGatewayKind::parse(g)
                .ok_or_else(|| PaymentError::Validation(format!("unknown gateway {g:?}")))
        })
        .transpose()?;

    Ok(ListFilter {
        user_id: query.user_id.filter(|u| !u.is_empty()),
        status,
        gateway,
        page: query.page.unwrap_or(1).max(1),
        limit: query
            .limit
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE),
    })
}

#[derive(Deserialize)]
pub struct StatsQuery {
    pub user_id: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

pub async fn payment_stats(
    State(state): State<AppState>,
    Query(query): Query<StatsQuery>,
) -> impl IntoResponse {
    let filter = match stats_filter(query) {
        Ok(f) => f,
        Err(e) => return e.into_response(),
    };
    match state.payment_service.stats(filter).await {
        Ok(stats) => (axum::http::StatusCode::OK, Json(stats)).into_response(),
        Err(e) => e.into_response(),
    }
}

pub fn stats_filter(query: StatsQuery) -> Result<StatsFilter, PaymentError> {
    let parse_date = |raw: &str| {
        NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .map_err(|_| PaymentError::Validation(format!("invalid date {raw:?}, expected YYYY-MM-DD")))
    };

    let start = query
        .start_date
        .as_deref()
        .filter(|s| !s.is_empty())
        .map(parse_date)
        .transpose()?
        .map(|d| Utc.from_utc_datetime(&d.and_hms_opt(0, 0, 0).unwrap()));
    // Exclusive upper bound: the whole end day is included.
    let end = query
        .end_date
        .as_deref()
        .filter(|s| !s.is_empty())
        .map(parse_date)
        .transpose()?
        .map(|d| Utc.from_utc_datetime(&(d + chrono::Duration::days(1)).and_hms_opt(0, 0, 0).unwrap()));

    Ok(StatsFilter {
        user_id: query.user_id.filter(|u| !u.is_empty()),
        start,
        end,
    })
}

#[derive(Deserialize)]
pub struct RefundRequest {
    pub amount: i64,
}

pub async fn refund_payment(
    State(state): State<AppState>,
    Path(payment_id): Path<Uuid>,
    Json(req): Json<RefundRequest>,
) -> impl IntoResponse {
    match state.payment_service.refund(payment_id, req.amount).await {
        Ok(p) => (axum::http::StatusCode::OK, Json(p)).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn cancel_payment(
    State(state): State<AppState>,
    Path(payment_id): Path<Uuid>,
) -> impl IntoResponse {
    match state.payment_service.cancel(payment_id).await {
        Ok(p) => (axum::http::StatusCode::OK, Json(p)).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn health() -> impl IntoResponse {
    (axum::http::StatusCode::OK, "ok")
}
