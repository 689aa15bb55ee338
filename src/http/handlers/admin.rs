use crate::domain::settings::CheckoutSettingsUpdate;
use crate::error::GatewayError;
use crate::service::activation::ActivationRequest;
use crate::http::extract::ApiJson;
use crate::AppState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct BackofficeKeyRequest {
    #[serde(default)]
    pub backoffice_key: String,
}

pub async fn validate_key(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<BackofficeKeyRequest>,
) -> Response {
    match state.merchant_setup.validate_key(&req.backoffice_key).await {
        Ok(validation) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "status": "success",
                "message": "Backoffice Key Valid",
                "gateway_options": validation.gateway_options,
                "available_methods": validation.available_methods,
                "gateway_selected": validation.gateway_selected,
            })),
        )
            .into_response(),
        Err(err) => {
            let mut body = err.to_json();
            body["clear"] = serde_json::Value::Bool(true);
            (err.http_status(), Json(body)).into_response()
        }
    }
}

pub async fn gateway_accounts(
    State(state): State<AppState>,
    Path(gateway_key): Path<String>,
) -> Response {
    match state.merchant_setup.accounts_for_gateway(&gateway_key).await {
        Ok(accounts) => (
            StatusCode::OK,
            Json(serde_json::json!({"status": "success", "data": accounts})),
        )
            .into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn request_activation(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<ActivationRequest>,
) -> Response {
    match state.activation.activate_account(&req).await {
        Ok(()) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "status": "success",
                "message": "Your activation request has been sent to support.",
            })),
        )
            .into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn get_settings(State(state): State<AppState>) -> Response {
    match state.merchant_setup.settings_snapshot().await {
        Ok(settings) => (
            StatusCode::OK,
            Json(serde_json::json!({"status": "success", "settings": settings})),
        )
            .into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn update_checkout_settings(
    State(state): State<AppState>,
    ApiJson(update): ApiJson<CheckoutSettingsUpdate>,
) -> Response {
    match state.merchant_setup.update_checkout_settings(update).await {
        Ok(settings) => (
            StatusCode::OK,
            Json(serde_json::json!({"status": "success", "settings": settings})),
        )
            .into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn delete_payment(State(state): State<AppState>, Path(token): Path<String>) -> Response {
    match state.records.delete(&token).await {
        Ok(Some(record)) => {
            tracing::info!(token = %record.token, status = %record.status, "payment record deleted");
            (
                StatusCode::OK,
                Json(serde_json::json!({"status": "success", "deleted": record})),
            )
                .into_response()
        }
        Ok(None) => GatewayError::RecordNotFound.into_response(),
        Err(err) => GatewayError::Storage(err).into_response(),
    }
}
