use crate::domain::settings::{AvailableMethod, GatewayOption};
use crate::gateways::ifthenpay::{RawAccount, RawGatewayKey, RawPaymentMethod};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountOption {
    pub alias: String,
    pub account: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntityAccounts {
    pub entity: String,
    pub accounts: Vec<AccountOption>,
}

/// Alias/gateway-key pairs; a repeated alias keeps its first position and takes the last key.
pub fn format_gateway_keys(raw: &[RawGatewayKey]) -> Vec<GatewayOption> {
    let mut out: Vec<GatewayOption> = Vec::new();
    for item in raw.iter().filter(|item| !item.gateway_key.is_empty()) {
        match out.iter_mut().find(|o| o.alias == item.alias) {
            Some(existing) => existing.gateway_key = item.gateway_key.clone(),
            None => out.push(GatewayOption {
                alias: item.alias.clone(),
                gateway_key: item.gateway_key.clone(),
            }),
        }
    }
    out
}

/// Catalog entries keyed by entity, sorted by position.
pub fn format_available_payment_methods(raw: &[RawPaymentMethod]) -> Vec<AvailableMethod> {
    let mut out: Vec<AvailableMethod> = Vec::new();
    for entry in raw.iter().filter(|entry| !entry.entity.is_empty()) {
        let method = AvailableMethod {
            entity: entry.entity.clone(),
            position: entry.position,
            image: entry.small_image_url.clone(),
            tooltip: entry.description_en.clone(),
            label: entry.method.clone(),
        };
        match out.iter_mut().find(|m| m.entity == entry.entity) {
            Some(existing) => *existing = method,
            None => out.push(method),
        }
    }
    out.sort_by_key(|m| m.position);
    out
}

/// Groups account records by entity for the admin dropdowns. Numeric entities are Multibanco.
pub fn format_payment_accounts(raw: &[RawAccount]) -> Vec<EntityAccounts> {
    let mut out: Vec<EntityAccounts> = Vec::new();
    for acct in raw
        .iter()
        .filter(|a| !a.alias.is_empty() && !a.conta.is_empty())
    {
        let entity = if is_numeric(&acct.entidade) {
            "MB".to_string()
        } else {
            acct.entidade.clone()
        };

        let bucket = match out.iter().position(|e| e.entity == entity) {
            Some(idx) => &mut out[idx],
            None => {
                out.push(EntityAccounts {
                    entity,
                    accounts: Vec::new(),
                });
                let last = out.len() - 1;
                &mut out[last]
            }
        };

        match bucket.accounts.iter_mut().find(|a| a.alias == acct.alias) {
            Some(existing) => existing.account = acct.conta.clone(),
            None => bucket.accounts.push(AccountOption {
                alias: acct.alias.clone(),
                account: acct.conta.clone(),
            }),
        }
    }
    out
}

fn is_numeric(value: &str) -> bool {
    let trimmed = value.trim();
    !trimmed.is_empty() && trimmed.parse::<f64>().is_ok()
}
