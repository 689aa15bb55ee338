use serde::{Deserialize, Serialize};

/// A gateway key offered by the merchant's backoffice account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayOption {
    pub alias: String,
    pub gateway_key: String,
}

/// An entry of the provider's method catalog, keyed by `entity`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailableMethod {
    pub entity: String,
    pub position: i64,
    pub image: String,
    pub tooltip: String,
    pub label: String,
}

/// Merchant choice for one method: whether it is offered and which `Entity|Account` backs it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodConfig {
    pub method: String,
    #[serde(default)]
    pub checked: bool,
    #[serde(default)]
    pub selected_account: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerchantSettings {
    #[serde(default)]
    pub backoffice_key: Option<String>,
    #[serde(default)]
    pub gateway_options: Vec<GatewayOption>,
    #[serde(default)]
    pub available_methods: Vec<AvailableMethod>,
    #[serde(default)]
    pub gateway_key: Option<String>,
    #[serde(default)]
    pub payment_methods_configuration: Vec<MethodConfig>,
    #[serde(default)]
    pub default_method: Option<String>,
    #[serde(default)]
    pub description: String,
}

impl MerchantSettings {
    pub fn available_method(&self, entity: &str) -> Option<&AvailableMethod> {
        self.available_methods.iter().find(|m| m.entity == entity)
    }

    /// Copy with the backoffice key hidden, for admin responses.
    pub fn redacted(&self) -> Self {
        let mut out = self.clone();
        out.backoffice_key = self.backoffice_key.as_deref().map(|key| {
            let tail: String = key.chars().rev().take(4).collect::<Vec<_>>().into_iter().rev().collect();
            format!("****-****-****-{tail}")
        });
        out
    }
}

/// Admin update of the checkout-facing part of the settings.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSettingsUpdate {
    pub gateway_key: Option<String>,
    #[serde(default)]
    pub payment_methods_configuration: Vec<MethodConfig>,
    pub default_method: Option<String>,
    #[serde(default)]
    pub description: String,
}
