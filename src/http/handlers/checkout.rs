use crate::domain::intent::{OrderIntent, TransactionIntent};
use crate::domain::payment::{CheckoutOutcome, ReturnAck, ReturnKind};
use crate::http::extract::{ApiJson, ApiQuery};
use crate::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;

/// Query/body of the hosted checkout's redirect back to the site.
#[derive(Debug, Deserialize)]
pub struct ReturnParams {
    /// Missing or unknown values take the failure branch.
    #[serde(default)]
    pub ifthenpay_return: String,
    #[serde(default, alias = "payment_token")]
    pub token: String,
    #[serde(default)]
    pub txid: String,
}

pub async fn create_order_checkout(
    State(state): State<AppState>,
    ApiJson(intent): ApiJson<OrderIntent>,
) -> Response {
    checkout_response(state.reconciliation.initiate_checkout_for_order(&intent).await)
}

pub async fn create_transaction_checkout(
    State(state): State<AppState>,
    ApiJson(intent): ApiJson<TransactionIntent>,
) -> Response {
    checkout_response(
        state
            .reconciliation
            .initiate_checkout_for_transaction(&intent)
            .await,
    )
}

pub async fn gateway_return(
    State(state): State<AppState>,
    ApiJson(params): ApiJson<ReturnParams>,
) -> Response {
    handle_return(&state, params).await
}

pub async fn gateway_return_redirect(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<ReturnParams>,
) -> Response {
    handle_return(&state, params).await
}

async fn handle_return(state: &AppState, params: ReturnParams) -> Response {
    let kind = ReturnKind::from(params.ifthenpay_return.as_str());
    let ack = state
        .reconciliation
        .handle_return(kind, &params.token, &params.txid, &state.shutdown)
        .await;

    match ack {
        ReturnAck::Completed => (StatusCode::OK, Json(ack.to_json())).into_response(),
        ReturnAck::Rejected(err) => err.into_response(),
    }
}

fn checkout_response(outcome: CheckoutOutcome) -> Response {
    match outcome {
        CheckoutOutcome::Rejected(err) => err.into_response(),
        other => (StatusCode::OK, Json(other.to_json())).into_response(),
    }
}
