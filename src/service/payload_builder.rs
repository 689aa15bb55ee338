use crate::domain::intent::ChargeIntent;
use crate::domain::settings::{MerchantSettings, MethodConfig};
use crate::gateways::PayByLinkPayload;
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::{Decimal, RoundingStrategy};
use url::Url;

const SUPPORTED_LANGUAGES: [&str; 4] = ["pt", "en", "es", "fr"];
const DEFAULT_LANGUAGE: &str = "pt";
/// Substituted by ifthenpay with its transaction id before redirecting back.
pub const TRANSACTION_ID_PLACEHOLDER: &str = "[TRANSACTIONID]";

static PIPE_SPACING_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*\|\s*").expect("Invalid regex for account separator"));

/// Which hosted-checkout exit a return URL belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnOutcome {
    Success,
    Cancel,
    Error,
}

impl ReturnOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReturnOutcome::Success => "success",
            ReturnOutcome::Cancel => "cancel",
            ReturnOutcome::Error => "error",
        }
    }
}

/// Two decimals, `.` separator, no grouping, halves rounded away from zero.
pub fn format_amount(amount: Decimal) -> String {
    let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    format!("{rounded:.2}")
}

/// `Entity|Account` of every checked method with an account, in configuration order, joined by `;`.
pub fn build_accounts_string(configuration: &[MethodConfig]) -> String {
    configuration
        .iter()
        .filter(|entry| entry.checked && !entry.selected_account.trim().is_empty())
        .map(|entry| {
            PIPE_SPACING_RE
                .replace_all(entry.selected_account.trim(), "|")
                .into_owned()
        })
        .collect::<Vec<_>>()
        .join(";")
}

/// Two-letter prefix of the locale, matched case-sensitively; anything else is Portuguese.
pub fn language_for_locale(locale: &str) -> &'static str {
    let prefix: String = locale.chars().take(2).collect();
    SUPPORTED_LANGUAGES
        .iter()
        .find(|lang| **lang == prefix)
        .copied()
        .unwrap_or(DEFAULT_LANGUAGE)
}

/// Catalog position of the default method, or empty when it is unset or not in the catalog.
pub fn selected_method_position(settings: &MerchantSettings) -> String {
    settings
        .default_method
        .as_deref()
        .and_then(|entity| settings.available_method(entity))
        .map(|method| method.position.to_string())
        .unwrap_or_default()
}

pub fn build_description(intent_identifier: i64, admin_description: &str) -> String {
    format!("Order #{intent_identifier} - {admin_description}")
}

/// Return URL carrying the outcome, the token and the literal transaction id placeholder.
pub fn build_return_url(base: &Url, outcome: ReturnOutcome, token: &str) -> String {
    let mut url = base.clone();
    url.query_pairs_mut()
        .append_pair("ifthenpay_return", outcome.as_str())
        .append_pair("token", token);
    let query = format!(
        "{}&txid={TRANSACTION_ID_PLACEHOLDER}",
        url.query().unwrap_or_default()
    );
    url.set_query(Some(&query));
    url.to_string()
}

pub fn build_charge_payload(
    intent: &dyn ChargeIntent,
    token: &str,
    amount: Decimal,
    settings: &MerchantSettings,
    locale: &str,
    return_base: &Url,
) -> PayByLinkPayload {
    PayByLinkPayload {
        id: token.to_string(),
        amount: format_amount(amount),
        description: build_description(intent.identifier(), &settings.description),
        lang: language_for_locale(locale).to_string(),
        accounts: build_accounts_string(&settings.payment_methods_configuration),
        selected_method: selected_method_position(settings),
        success_url: build_return_url(return_base, ReturnOutcome::Success, token),
        cancel_url: build_return_url(return_base, ReturnOutcome::Cancel, token),
        error_url: build_return_url(return_base, ReturnOutcome::Error, token),
    }
}
