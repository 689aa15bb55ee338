use crate::error::GatewayError;
use serde::{Deserialize, Serialize};

pub mod formatter;
pub mod ifthenpay;
pub mod mock;

/// Request body of the pay-by-link endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayByLinkPayload {
    pub id: String,
    pub amount: String,
    pub description: String,
    pub lang: String,
    pub accounts: String,
    pub selected_method: String,
    pub success_url: String,
    pub cancel_url: String,
    pub error_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayByLink {
    pub pin_code: String,
    pub pinpay_url: String,
    pub redirect_url: String,
}

/// The two provider calls the checkout and callback flows depend on.
#[async_trait::async_trait]
pub trait CheckoutGateway: Send + Sync {
    fn name(&self) -> &'static str;

    async fn create_pay_by_link(
        &self,
        gateway_key: &str,
        payload: &PayByLinkPayload,
    ) -> Result<PayByLink, GatewayError>;

    /// True once the provider reports the transaction as settled.
    async fn get_payment_status_by_transaction_id(
        &self,
        transaction_id: &str,
    ) -> Result<bool, GatewayError>;
}
