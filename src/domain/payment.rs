use crate::error::GatewayError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use std::str::FromStr;

pub const PROCESSOR_CODE: &str = "ifthenpay";
pub const PAYMENT_METHOD_CODE: &str = "ifthenpay_gateway";
pub const TRANSACTION_KIND_CAPTURE: &str = "capture";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Cancelled,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "PENDING",
            PaymentStatus::Paid => "PAID",
            PaymentStatus::Cancelled => "CANCELLED",
            PaymentStatus::Failed => "FAILED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, PaymentStatus::Pending)
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(PaymentStatus::Pending),
            "PAID" => Ok(PaymentStatus::Paid),
            "CANCELLED" => Ok(PaymentStatus::Cancelled),
            "FAILED" => Ok(PaymentStatus::Failed),
            other => Err(anyhow::anyhow!("unknown payment status {other:?}")),
        }
    }
}

/// One checkout attempt, keyed by its token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentRecord {
    pub id: i64,
    pub token: String,
    pub intent_id: i64,
    pub status: PaymentStatus,
    pub paybylink_url: String,
    pub transaction_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Result of asking the store to move a record out of PENDING.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinalizeOutcome {
    Applied(PaymentRecord),
    AlreadyFinal(PaymentRecord),
    NotFound,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckoutRedirect {
    pub token: String,
    pub paybylink_url: String,
    pub success_url: String,
    pub cancel_url: String,
    pub error_url: String,
}

#[derive(Debug)]
pub enum CheckoutOutcome {
    /// Nothing to charge; the host completes the booking without payment.
    Skip,
    Redirect(CheckoutRedirect),
    Rejected(GatewayError),
}

impl CheckoutOutcome {
    pub fn to_json(&self) -> Value {
        match self {
            CheckoutOutcome::Skip => json!({
                "status": "success",
                "skip_payment": true,
                "message": "Nothing to pay",
            }),
            CheckoutOutcome::Redirect(redirect) => json!({
                "status": "success",
                "token": redirect.token,
                "paybylink_url": redirect.paybylink_url,
                "success_url": redirect.success_url,
                "cancel_url": redirect.cancel_url,
                "error_url": redirect.error_url,
            }),
            CheckoutOutcome::Rejected(err) => err.to_json(),
        }
    }
}

/// The `ifthenpay_return` value the hosted checkout redirects with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReturnKind {
    Success,
    Cancel,
    Other(String),
}

impl From<&str> for ReturnKind {
    fn from(value: &str) -> Self {
        match value {
            "success" => ReturnKind::Success,
            "cancel" => ReturnKind::Cancel,
            other => ReturnKind::Other(other.to_string()),
        }
    }
}

#[derive(Debug)]
pub enum ReturnAck {
    Completed,
    Rejected(GatewayError),
}

impl ReturnAck {
    pub fn to_json(&self) -> Value {
        match self {
            ReturnAck::Completed => json!({
                "status": "success",
                "message": "Payment completed",
            }),
            ReturnAck::Rejected(err) => err.to_json(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Paid {
        charge_id: Option<String>,
    },
    Rejected {
        code: &'static str,
        message: String,
    },
    /// The intent belongs to another processor or payment method.
    NotApplicable,
}

impl Resolution {
    pub fn to_json(&self) -> Value {
        match self {
            Resolution::Paid { charge_id } => json!({
                "status": "success",
                "processor": PROCESSOR_CODE,
                "charge_id": charge_id,
                "kind": TRANSACTION_KIND_CAPTURE,
            }),
            Resolution::Rejected { code, message } => error_json(code, message),
            Resolution::NotApplicable => json!({
                "status": "skipped",
                "message": "intent is not handled by ifthenpay",
            }),
        }
    }
}

pub fn error_json(code: &str, message: &str) -> Value {
    json!({
        "status": "error",
        "code": code,
        "message": message,
    })
}
