use crate::AppState;
use axum::extract::{RawQuery, State};
use axum::response::{IntoResponse, Redirect};
use axum::Json;

/// Server-to-server notification endpoint. No user auth; authenticity is
/// the signature itself. The response body is the acknowledgement pair
/// the gateway's redelivery logic consumes.
pub async fn ipn(State(state): State<AppState>, body: String) -> impl IntoResponse {
    let ack = state.webhook_processor.process_notification(&body).await;
    (axum::http::StatusCode::OK, Json(ack))
}

/// Browser redirect back from the gateway's hosted page. Same parameter
/// shape as the IPN, but the outcome here only decides where the user
/// lands.
pub async fn payment_return(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
) -> impl IntoResponse {
    let location = state
        .webhook_processor
        .handle_return(query.as_deref().unwrap_or(""))
        .await;
    Redirect::temporary(&location)
}
