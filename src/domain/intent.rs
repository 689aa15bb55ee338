use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// What the reconciliation flow needs from a host-side order or invoice intent.
pub trait ChargeIntent: Send + Sync {
    fn identifier(&self) -> i64;
    /// Per-attempt key correlating the intent with its payment record.
    fn token(&self) -> Option<&str>;
    fn charge_amount(&self) -> Decimal;
    fn record_error(&mut self, kind: &str, message: &str);
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentData {
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub processor: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentError {
    pub kind: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderIntent {
    pub id: i64,
    #[serde(default)]
    pub intent_key: Option<String>,
    pub charge_amount: Decimal,
    #[serde(default)]
    pub booking_form_page_url: Option<String>,
    #[serde(default)]
    pub payment_data: PaymentData,
    #[serde(default, skip_deserializing)]
    pub errors: Vec<IntentError>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionIntent {
    pub id: i64,
    pub invoice_id: i64,
    #[serde(default)]
    pub intent_key: Option<String>,
    pub charge_amount: Decimal,
    #[serde(default)]
    pub payment_data: PaymentData,
    #[serde(default, skip_deserializing)]
    pub errors: Vec<IntentError>,
}

fn non_empty(value: Option<&String>) -> Option<&str> {
    value.map(String::as_str).filter(|s| !s.trim().is_empty())
}

impl ChargeIntent for OrderIntent {
    fn identifier(&self) -> i64 {
        self.id
    }

    fn token(&self) -> Option<&str> {
        non_empty(self.payment_data.token.as_ref()).or(non_empty(self.intent_key.as_ref()))
    }

    fn charge_amount(&self) -> Decimal {
        self.charge_amount
    }

    fn record_error(&mut self, kind: &str, message: &str) {
        self.errors.push(IntentError {
            kind: kind.to_string(),
            message: message.to_string(),
        });
    }
}

impl ChargeIntent for TransactionIntent {
    fn identifier(&self) -> i64 {
        self.id
    }

    fn token(&self) -> Option<&str> {
        non_empty(self.payment_data.token.as_ref()).or(non_empty(self.intent_key.as_ref()))
    }

    fn charge_amount(&self) -> Decimal {
        self.charge_amount
    }

    fn record_error(&mut self, kind: &str, message: &str) {
        self.errors.push(IntentError {
            kind: kind.to_string(),
            message: message.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order(intent_key: Option<&str>, token: Option<&str>) -> OrderIntent {
        OrderIntent {
            id: 7,
            intent_key: intent_key.map(str::to_string),
            charge_amount: Decimal::new(1250, 2),
            booking_form_page_url: None,
            payment_data: PaymentData {
                token: token.map(str::to_string),
                ..PaymentData::default()
            },
            errors: Vec::new(),
        }
    }

    #[test]
    fn payment_data_token_wins_over_intent_key() {
        assert_eq!(order(Some("key-1"), Some("tok-9")).token(), Some("tok-9"));
        assert_eq!(order(Some("key-1"), None).token(), Some("key-1"));
    }

    #[test]
    fn blank_tokens_count_as_missing() {
        assert_eq!(order(Some("  "), Some("")).token(), None);
    }

    #[test]
    fn amount_deserializes_from_number_or_string() {
        let a: OrderIntent = serde_json::from_str(r#"{"id":1,"charge_amount":12.5}"#).unwrap();
        let b: OrderIntent = serde_json::from_str(r#"{"id":1,"charge_amount":"12.50"}"#).unwrap();
        assert_eq!(a.charge_amount, b.charge_amount);
    }
}
