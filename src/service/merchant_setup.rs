use crate::domain::settings::{
    AvailableMethod, CheckoutSettingsUpdate, GatewayOption, MerchantSettings,
};
use crate::error::GatewayError;
use crate::gateways::formatter::{
    format_available_payment_methods, format_gateway_keys, format_payment_accounts,
    EntityAccounts,
};
use crate::gateways::ifthenpay::{IfthenpayClient, IfthenpayEndpoints};
use crate::repo::settings_repo::SettingsStore;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Serialize)]
pub struct KeyValidation {
    pub gateway_options: Vec<GatewayOption>,
    pub available_methods: Vec<AvailableMethod>,
    pub gateway_selected: Option<String>,
}

/// Admin-side configuration: backoffice key onboarding, account lookup and checkout settings.
#[derive(Clone)]
pub struct MerchantSetupService {
    pub settings: Arc<dyn SettingsStore>,
    pub endpoints: IfthenpayEndpoints,
    pub http: reqwest::Client,
    pub timeout: Duration,
}

impl MerchantSetupService {
    fn client(&self) -> IfthenpayClient {
        IfthenpayClient::new(self.endpoints.clone(), self.http.clone()).with_timeout(self.timeout)
    }

    /// Validates `key`, then stores it with the gateway keys and method catalog it unlocks.
    ///
    /// Any failure wipes the stored configuration so no half-validated
    /// credential survives.
    pub async fn validate_key(&self, key: &str) -> Result<KeyValidation, GatewayError> {
        match self.try_validate_key(key).await {
            Ok(validation) => Ok(validation),
            Err(err) => {
                tracing::warn!(code = err.code(), "backoffice key rejected, clearing settings: {err}");
                if let Err(clear_err) = self.settings.clear().await {
                    tracing::error!("failed to clear settings after key rejection: {clear_err:#}");
                }
                Err(err)
            }
        }
    }

    async fn try_validate_key(&self, key: &str) -> Result<KeyValidation, GatewayError> {
        let mut client = self.client();
        client.set_key(key).await?;

        let gateways_raw = client.get_gateway_keys().await?;
        let methods_raw = client.get_available_payment_methods().await?;
        let gateway_options = format_gateway_keys(&gateways_raw);
        let available_methods = format_available_payment_methods(&methods_raw);

        let mut settings = self.settings.load().await?;
        settings.backoffice_key = client.backoffice_key().map(str::to_string);
        settings.gateway_options = gateway_options.clone();
        settings.available_methods = available_methods.clone();
        self.settings.save(&settings).await?;

        tracing::info!(
            gateways = gateway_options.len(),
            methods = available_methods.len(),
            "backoffice key validated"
        );
        Ok(KeyValidation {
            gateway_options,
            available_methods,
            gateway_selected: settings.gateway_key,
        })
    }

    pub async fn accounts_for_gateway(
        &self,
        gateway_key: &str,
    ) -> Result<Vec<EntityAccounts>, GatewayError> {
        let settings = self.settings.load().await?;
        let backoffice_key = settings
            .backoffice_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or(GatewayError::MissingRequiredKeys)?;
        if gateway_key.trim().is_empty() {
            return Err(GatewayError::MissingRequiredKeys);
        }

        let mut client = self.client();
        client.set_key(backoffice_key).await?;
        let raw = client.get_payment_accounts_by_gateway(gateway_key.trim()).await?;
        Ok(format_payment_accounts(&raw))
    }

    pub async fn update_checkout_settings(
        &self,
        update: CheckoutSettingsUpdate,
    ) -> Result<MerchantSettings, GatewayError> {
        let mut settings = self.settings.load().await?;
        if settings.backoffice_key.is_none() {
            return Err(GatewayError::MissingRequiredKeys);
        }

        let gateway_key = update.gateway_key.filter(|k| !k.trim().is_empty());
        if let Some(key) = &gateway_key {
            if !settings.gateway_options.iter().any(|o| &o.gateway_key == key) {
                return Err(GatewayError::InvalidSettings(format!(
                    "Gateway Key {key} is not offered by this Backoffice Key."
                )));
            }
        }
        let default_method = update.default_method.filter(|m| !m.trim().is_empty());
        if let Some(method) = &default_method {
            if settings.available_method(method).is_none() {
                return Err(GatewayError::InvalidSettings(format!(
                    "Payment method {method} is not available."
                )));
            }
        }

        settings.gateway_key = gateway_key;
        settings.payment_methods_configuration = update.payment_methods_configuration;
        settings.default_method = default_method;
        settings.description = update.description.trim().to_string();
        self.settings.save(&settings).await?;

        tracing::info!(gateway_key = ?settings.gateway_key, "checkout settings updated");
        Ok(settings.redacted())
    }

    pub async fn settings_snapshot(&self) -> Result<MerchantSettings, GatewayError> {
        Ok(self.settings.load().await?.redacted())
    }
}
