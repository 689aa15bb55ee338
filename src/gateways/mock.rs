use crate::error::GatewayError;
use crate::gateways::{CheckoutGateway, PayByLink, PayByLinkPayload};
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio::time::Instant;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockBehavior {
    AlwaysSettled,
    NeverSettled,
    /// Reports "not settled" for the first `n` status polls, then settled.
    SettleAfter(usize),
    /// Pay-by-link creation fails; status polls report not settled.
    RejectCreate,
    /// Reports "not settled" for the first `n` status polls, then every poll fails to decode.
    FailStatusAfter(usize),
}

impl FromStr for MockBehavior {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ALWAYS_SETTLED" => Ok(MockBehavior::AlwaysSettled),
            "NEVER_SETTLED" => Ok(MockBehavior::NeverSettled),
            "REJECT_CREATE" => Ok(MockBehavior::RejectCreate),
            other => {
                if let Some(n) = other.strip_prefix("SETTLE_AFTER_") {
                    Ok(MockBehavior::SettleAfter(n.parse()?))
                } else if let Some(n) = other.strip_prefix("FAIL_STATUS_AFTER_") {
                    Ok(MockBehavior::FailStatusAfter(n.parse()?))
                } else {
                    Err(anyhow::anyhow!("unknown mock behavior {other:?}"))
                }
            }
        }
    }
}

/// Scripted stand-in for ifthenpay, used by the `mock` adapter and in tests.
pub struct MockGateway {
    pub behavior: MockBehavior,
    pub checkout_base: String,
    create_calls: AtomicUsize,
    status_calls: AtomicUsize,
    status_call_times: Mutex<Vec<Instant>>,
    payloads: Mutex<Vec<PayByLinkPayload>>,
}

impl MockGateway {
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            checkout_base: "https://gateway.mock.local/pinpay".to_string(),
            create_calls: AtomicUsize::new(0),
            status_calls: AtomicUsize::new(0),
            status_call_times: Mutex::new(Vec::new()),
            payloads: Mutex::new(Vec::new()),
        }
    }

    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    pub fn status_call_times(&self) -> Vec<Instant> {
        self.status_call_times
            .lock()
            .map(|times| times.clone())
            .unwrap_or_default()
    }

    pub fn last_payload(&self) -> Option<PayByLinkPayload> {
        self.payloads.lock().ok().and_then(|p| p.last().cloned())
    }
}

#[async_trait::async_trait]
impl CheckoutGateway for MockGateway {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn create_pay_by_link(
        &self,
        gateway_key: &str,
        payload: &PayByLinkPayload,
    ) -> Result<PayByLink, GatewayError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut payloads) = self.payloads.lock() {
            payloads.push(payload.clone());
        }

        if self.behavior == MockBehavior::RejectCreate {
            return Err(GatewayError::MalformedGatewayResponse(
                "mock gateway refused to create the link".to_string(),
            ));
        }

        let pin_code = uuid::Uuid::new_v4().simple().to_string();
        Ok(PayByLink {
            redirect_url: format!("{}/{}/{}", self.checkout_base, gateway_key, pin_code),
            pinpay_url: format!("{}/{}", self.checkout_base, pin_code),
            pin_code,
        })
    }

    async fn get_payment_status_by_transaction_id(
        &self,
        _transaction_id: &str,
    ) -> Result<bool, GatewayError> {
        let previous = self.status_calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut times) = self.status_call_times.lock() {
            times.push(Instant::now());
        }

        match self.behavior {
            MockBehavior::AlwaysSettled => Ok(true),
            MockBehavior::NeverSettled | MockBehavior::RejectCreate => Ok(false),
            MockBehavior::SettleAfter(n) => Ok(previous >= n),
            MockBehavior::FailStatusAfter(n) if previous < n => Ok(false),
            MockBehavior::FailStatusAfter(_) => Err(GatewayError::MalformedGatewayResponse(
                "HTTP 502 with non-JSON body".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_env_style_behaviors() {
        assert_eq!("SETTLE_AFTER_3".parse::<MockBehavior>().unwrap(), MockBehavior::SettleAfter(3));
        assert_eq!("NEVER_SETTLED".parse::<MockBehavior>().unwrap(), MockBehavior::NeverSettled);
        assert_eq!(
            "FAIL_STATUS_AFTER_1".parse::<MockBehavior>().unwrap(),
            MockBehavior::FailStatusAfter(1)
        );
        assert!("SOMETIMES".parse::<MockBehavior>().is_err());
    }

    #[tokio::test]
    async fn settle_after_counts_polls() {
        let gateway = MockGateway::new(MockBehavior::SettleAfter(2));
        assert!(!gateway.get_payment_status_by_transaction_id("tx").await.unwrap());
        assert!(!gateway.get_payment_status_by_transaction_id("tx").await.unwrap());
        assert!(gateway.get_payment_status_by_transaction_id("tx").await.unwrap());
        assert_eq!(gateway.status_calls(), 3);
    }
}
