use crate::domain::payment::error_json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

/// Failure kinds surfaced by the provider client and the reconciliation flow.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("Invalid Backoffice Key format. Expected 1234-5678-9012-3456.")]
    InvalidKeyFormat,
    #[error("{0}")]
    RemoteValidation(String),
    #[error("No Gateway Keys found for this Backoffice Key. Please contact ifthenpay to activate a gateway.")]
    NoGatewaysFound,
    #[error("Invalid response from ifthenpay API: {0}")]
    MalformedGatewayResponse(String),
    #[error("ifthenpay request failed: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("ifthenpay is not configured: {0}")]
    NotConfigured(String),
    #[error("Missing payment token")]
    MissingToken,
    #[error("Payment record not found")]
    RecordNotFound,
    #[error("Payment cancelled")]
    PaymentCancelled,
    #[error("Payment failed due to payment verification error")]
    PaymentFailed,
    #[error("Payment is still pending")]
    PaymentPending,
    #[error("a payment record already exists for token {0}")]
    DuplicateToken(String),
    #[error("payment verification was interrupted")]
    VerificationCancelled,
    #[error("Missing required keys.")]
    MissingRequiredKeys,
    #[error("{0}")]
    InvalidSettings(String),
    #[error("Failed to send the activation email. Please try again later.")]
    MailDelivery(String),
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl GatewayError {
    pub fn code(&self) -> &'static str {
        match self {
            GatewayError::InvalidKeyFormat => "INVALID_KEY_FORMAT",
            GatewayError::RemoteValidation(_) => "REMOTE_VALIDATION_ERROR",
            GatewayError::NoGatewaysFound => "NO_GATEWAYS_FOUND",
            GatewayError::MalformedGatewayResponse(_) => "MALFORMED_GATEWAY_RESPONSE",
            GatewayError::Transport(_) => "TRANSPORT_ERROR",
            GatewayError::NotConfigured(_) => "NOT_CONFIGURED",
            GatewayError::MissingToken => "MISSING_TOKEN",
            GatewayError::RecordNotFound => "RECORD_NOT_FOUND",
            GatewayError::PaymentCancelled => "PAYMENT_CANCELLED",
            GatewayError::PaymentFailed => "PAYMENT_FAILED",
            GatewayError::PaymentPending => "PAYMENT_PENDING",
            GatewayError::DuplicateToken(_) => "DUPLICATE_TOKEN",
            GatewayError::VerificationCancelled => "VERIFICATION_CANCELLED",
            GatewayError::MissingRequiredKeys => "MISSING_REQUIRED_KEYS",
            GatewayError::InvalidSettings(_) => "INVALID_SETTINGS",
            GatewayError::MailDelivery(_) => "MAIL_DELIVERY_FAILED",
            GatewayError::Storage(_) => "STORAGE_ERROR",
        }
    }

    /// True when the failure came from talking to ifthenpay rather than from local state.
    pub fn is_provider_error(&self) -> bool {
        matches!(
            self,
            GatewayError::RemoteValidation(_)
                | GatewayError::NoGatewaysFound
                | GatewayError::MalformedGatewayResponse(_)
                | GatewayError::Transport(_)
        )
    }

    pub fn http_status(&self) -> StatusCode {
        match self {
            GatewayError::InvalidKeyFormat
            | GatewayError::MissingToken
            | GatewayError::PaymentCancelled
            | GatewayError::PaymentFailed
            | GatewayError::MissingRequiredKeys
            | GatewayError::InvalidSettings(_) => StatusCode::UNPROCESSABLE_ENTITY,
            GatewayError::RemoteValidation(_) | GatewayError::NoGatewaysFound => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            GatewayError::MalformedGatewayResponse(_)
            | GatewayError::Transport(_)
            | GatewayError::MailDelivery(_) => StatusCode::BAD_GATEWAY,
            GatewayError::NotConfigured(_) | GatewayError::VerificationCancelled => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            GatewayError::RecordNotFound => StatusCode::NOT_FOUND,
            GatewayError::PaymentPending | GatewayError::DuplicateToken(_) => StatusCode::CONFLICT,
            GatewayError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Error envelope for clients. Storage details are logged, not returned.
    pub fn to_json(&self) -> serde_json::Value {
        let message = match self {
            GatewayError::Storage(err) => {
                tracing::error!("storage failure: {err:#}");
                "Internal storage error".to_string()
            }
            other => other.to_string(),
        };
        error_json(self.code(), &message)
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        (self.http_status(), Json(self.to_json())).into_response()
    }
}
