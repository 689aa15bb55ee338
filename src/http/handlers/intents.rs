use crate::domain::intent::{IntentError, OrderIntent, TransactionIntent};
use crate::domain::payment::Resolution;
use crate::http::extract::ApiJson;
use crate::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

pub async fn resolve_order(
    State(state): State<AppState>,
    ApiJson(mut intent): ApiJson<OrderIntent>,
) -> Response {
    let resolution = state.resolver.resolve_order_payment(&mut intent).await;
    resolution_response(resolution, &intent.errors)
}

pub async fn resolve_transaction(
    State(state): State<AppState>,
    ApiJson(mut intent): ApiJson<TransactionIntent>,
) -> Response {
    let resolution = state.resolver.resolve_transaction_payment(&mut intent).await;
    resolution_response(resolution, &intent.errors)
}

fn resolution_response(resolution: Resolution, errors: &[IntentError]) -> Response {
    let status = match &resolution {
        Resolution::Paid { .. } | Resolution::NotApplicable => StatusCode::OK,
        Resolution::Rejected { code, .. } if *code == "STORAGE_ERROR" => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
        Resolution::Rejected { .. } => StatusCode::UNPROCESSABLE_ENTITY,
    };

    let mut body = resolution.to_json();
    if !errors.is_empty() {
        body["errors"] = serde_json::json!(errors);
    }
    (status, Json(body)).into_response()
}
