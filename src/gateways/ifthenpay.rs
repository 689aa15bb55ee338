use crate::error::GatewayError;
use crate::gateways::{CheckoutGateway, PayByLink, PayByLinkPayload};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::time::Duration;
use url::Url;

pub const DEFAULT_API_BASE: &str = "https://api.ifthenpay.com";
pub const DEFAULT_MOBILE_BASE: &str = "https://ifthenpay.com/IfmbWS/ifthenpaymobile.asmx";
pub const DEFAULT_ENTITIES_URL: &str =
    "https://www.ifthenpay.com/IfmbWS/ifmbws.asmx/getEntidadeSubentidadeJsonV2";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

static BACKOFFICE_KEY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9]{4}(?:-[0-9]{4}){3}$").expect("Invalid regex for backoffice key")
});

pub fn is_valid_backoffice_key(key: &str) -> bool {
    BACKOFFICE_KEY_RE.is_match(key)
}

#[derive(Debug, Clone)]
pub struct IfthenpayEndpoints {
    pub api_base: Url,
    pub mobile_base: Url,
    pub entities_url: Url,
}

impl IfthenpayEndpoints {
    pub fn new(api_base: &str, mobile_base: &str, entities_url: &str) -> anyhow::Result<Self> {
        let parse = |raw: &str| -> anyhow::Result<Url> {
            let url = Url::parse(raw)?;
            if url.cannot_be_a_base() {
                anyhow::bail!("{raw} cannot be used as a base URL");
            }
            Ok(url)
        };
        Ok(Self {
            api_base: parse(api_base)?,
            mobile_base: parse(mobile_base)?,
            entities_url: parse(entities_url)?,
        })
    }

    pub fn production() -> anyhow::Result<Self> {
        Self::new(DEFAULT_API_BASE, DEFAULT_MOBILE_BASE, DEFAULT_ENTITIES_URL)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawGatewayKey {
    #[serde(rename = "GatewayKey", default, deserialize_with = "lenient_string")]
    pub gateway_key: String,
    #[serde(rename = "Alias", default, deserialize_with = "lenient_string")]
    pub alias: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawAccount {
    #[serde(rename = "Alias", default, deserialize_with = "lenient_string")]
    pub alias: String,
    #[serde(rename = "Conta", default, deserialize_with = "lenient_string")]
    pub conta: String,
    #[serde(rename = "Entidade", default, deserialize_with = "lenient_string")]
    pub entidade: String,
    #[serde(rename = "SubEntidade", default, deserialize_with = "lenient_string")]
    pub sub_entidade: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawPaymentMethod {
    #[serde(rename = "Entity", default, deserialize_with = "lenient_string")]
    pub entity: String,
    #[serde(rename = "Position", default, deserialize_with = "lenient_i64")]
    pub position: i64,
    #[serde(rename = "SmallImageUrl", default, deserialize_with = "lenient_string")]
    pub small_image_url: String,
    #[serde(rename = "DescriptionEN", default, deserialize_with = "lenient_string")]
    pub description_en: String,
    #[serde(rename = "Method", default, deserialize_with = "lenient_string")]
    pub method: String,
}

/// HTTP client for the ifthenpay APIs.
///
/// The backoffice key is held by the instance and only becomes active after
/// [`IfthenpayClient::set_key`] validated it, so each request context builds
/// its own client instead of sharing a credential.
#[derive(Clone)]
pub struct IfthenpayClient {
    endpoints: IfthenpayEndpoints,
    client: reqwest::Client,
    timeout: Duration,
    backoffice_key: Option<String>,
}

impl IfthenpayClient {
    pub fn new(endpoints: IfthenpayEndpoints, client: reqwest::Client) -> Self {
        Self {
            endpoints,
            client,
            timeout: DEFAULT_TIMEOUT,
            backoffice_key: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn backoffice_key(&self) -> Option<&str> {
        self.backoffice_key.as_deref()
    }

    /// Validates `key` against the entity lookup and makes it the active credential.
    pub async fn set_key(&mut self, key: &str) -> Result<(), GatewayError> {
        let key = key.trim();
        if !is_valid_backoffice_key(key) {
            return Err(GatewayError::InvalidKeyFormat);
        }

        let response = self
            .get_json(self.endpoints.entities_url.clone(), &[("chavebackoffice", key)])
            .await?;

        let entries = match response.as_array() {
            Some(entries) if !entries.is_empty() => entries,
            _ => {
                return Err(GatewayError::RemoteValidation(
                    "Unexpected response when validating Backoffice Key.".to_string(),
                ))
            }
        };

        let recognised = entries.iter().any(|entry| {
            let has_entity = entry.get("Entidade").is_some_and(is_present);
            let has_sub_entities = entry
                .get("SubEntidade")
                .and_then(Value::as_array)
                .is_some_and(|subs| !subs.is_empty());
            has_entity && has_sub_entities
        });
        if !recognised {
            return Err(GatewayError::RemoteValidation(
                "Backoffice Key not recognized or has no entities. Please contact support."
                    .to_string(),
            ));
        }

        self.backoffice_key = Some(key.to_string());
        tracing::debug!("backoffice key validated");
        Ok(())
    }

    pub async fn get_gateway_keys(&self) -> Result<Vec<RawGatewayKey>, GatewayError> {
        let key = self.require_key()?;
        let url = endpoint(&self.endpoints.mobile_base, &["GetGatewayKeys"])?;
        let response = self.get_json(url, &[("backofficekey", key)]).await?;

        match &response {
            Value::Array(items) if !items.is_empty() => {}
            _ => return Err(GatewayError::NoGatewaysFound),
        }
        serde_json::from_value(response)
            .map_err(|e| GatewayError::MalformedGatewayResponse(format!("gateway keys: {e}")))
    }

    pub async fn get_payment_accounts_by_gateway(
        &self,
        gateway_key: &str,
    ) -> Result<Vec<RawAccount>, GatewayError> {
        let key = self.require_key()?;
        let url = endpoint(&self.endpoints.mobile_base, &["GetAccountsByGatewayKey"])?;
        let response = self
            .get_json(url, &[("backofficekey", key), ("gatewayKey", gateway_key)])
            .await?;

        if !response.is_array() {
            return Err(GatewayError::MalformedGatewayResponse(
                "accounts lookup did not return a list".to_string(),
            ));
        }
        serde_json::from_value(response)
            .map_err(|e| GatewayError::MalformedGatewayResponse(format!("accounts: {e}")))
    }

    pub async fn get_available_payment_methods(&self) -> Result<Vec<RawPaymentMethod>, GatewayError> {
        let url = endpoint(&self.endpoints.api_base, &["gateway", "methods", "available"])?;
        let response = self.get_json(url, &[]).await?;

        if !response.is_array() {
            return Err(GatewayError::MalformedGatewayResponse(
                "method catalog did not return a list".to_string(),
            ));
        }
        serde_json::from_value(response)
            .map_err(|e| GatewayError::MalformedGatewayResponse(format!("method catalog: {e}")))
    }

    fn require_key(&self) -> Result<&str, GatewayError> {
        self.backoffice_key
            .as_deref()
            .ok_or_else(|| GatewayError::RemoteValidation("backoffice key not set".to_string()))
    }

    async fn get_json(&self, url: Url, query: &[(&str, &str)]) -> Result<Value, GatewayError> {
        let response = self
            .client
            .get(url)
            .query(query)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(GatewayError::Transport)?;
        decode(response).await
    }
}

#[async_trait::async_trait]
impl CheckoutGateway for IfthenpayClient {
    fn name(&self) -> &'static str {
        "ifthenpay"
    }

    async fn create_pay_by_link(
        &self,
        gateway_key: &str,
        payload: &PayByLinkPayload,
    ) -> Result<PayByLink, GatewayError> {
        if gateway_key.trim().is_empty() {
            return Err(GatewayError::NotConfigured("no gateway key selected".to_string()));
        }
        let url = endpoint(&self.endpoints.api_base, &["gateway", "pinpay", gateway_key])?;

        let response = self
            .client
            .post(url)
            .json(payload)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(GatewayError::Transport)?;
        let body = decode(response).await?;

        let field = |name: &str| body.get(name).filter(|v| is_present(v)).map(scalar_to_string);
        match (field("PinCode"), field("PinpayUrl"), field("RedirectUrl")) {
            (Some(pin_code), Some(pinpay_url), Some(redirect_url)) => Ok(PayByLink {
                pin_code,
                pinpay_url,
                redirect_url,
            }),
            _ => {
                tracing::warn!(token = %payload.id, "pay-by-link response without PinCode/PinpayUrl/RedirectUrl");
                Err(GatewayError::MalformedGatewayResponse(
                    "Invalid response from ifthenpay Pay-by-Link API.".to_string(),
                ))
            }
        }
    }

    async fn get_payment_status_by_transaction_id(
        &self,
        transaction_id: &str,
    ) -> Result<bool, GatewayError> {
        let url = endpoint(&self.endpoints.api_base, &["gateway", "transaction", "status"])?;
        let response = self.get_json(url, &[("transactionId", transaction_id)]).await?;

        match response {
            Value::Bool(settled) => Ok(settled),
            Value::Array(items) => Ok(!items.is_empty()),
            Value::Object(fields) => Ok(!fields.is_empty()),
            other => Err(GatewayError::MalformedGatewayResponse(format!(
                "unexpected transaction status payload: {other}"
            ))),
        }
    }
}

fn endpoint(base: &Url, segments: &[&str]) -> Result<Url, GatewayError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| GatewayError::NotConfigured(format!("{base} cannot be used as a base URL")))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

async fn decode(response: reqwest::Response) -> Result<Value, GatewayError> {
    let status = response.status();
    let body = response.text().await.map_err(GatewayError::Transport)?;
    serde_json::from_str(&body).map_err(|e| {
        GatewayError::MalformedGatewayResponse(format!("HTTP {} with non-JSON body: {e}", status.as_u16()))
    })
}

/// Mirrors the provider's notion of a filled-in field.
fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty() && s != "0",
        Value::Array(items) => !items.is_empty(),
        Value::Object(fields) => !fields.is_empty(),
    }
}

fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(String::new()),
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        other => Err(serde::de::Error::custom(format!("expected a scalar, got {other}"))),
    }
}

fn lenient_i64<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Number(n) => Ok(n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)).unwrap_or(0)),
        Value::String(s) => Ok(s.trim().parse().unwrap_or(0)),
        _ => Ok(0),
    }
}
