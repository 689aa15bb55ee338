use crate::error::GatewayError;
use crate::AppState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

pub async fn get_by_token(State(state): State<AppState>, Path(token): Path<String>) -> Response {
    match state.records.get_by_token(&token).await {
        Ok(Some(record)) => (
            StatusCode::OK,
            Json(serde_json::json!({"status": "success", "payment": record})),
        )
            .into_response(),
        Ok(None) => GatewayError::RecordNotFound.into_response(),
        Err(err) => GatewayError::Storage(err).into_response(),
    }
}

pub async fn get_by_transaction_id(
    State(state): State<AppState>,
    Path(txid): Path<String>,
) -> Response {
    match state.records.get_by_transaction_id(&txid).await {
        Ok(Some(record)) => (
            StatusCode::OK,
            Json(serde_json::json!({"status": "success", "payment": record})),
        )
            .into_response(),
        Ok(None) => GatewayError::RecordNotFound.into_response(),
        Err(err) => GatewayError::Storage(err).into_response(),
    }
}

pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}
