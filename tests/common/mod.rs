#![allow(dead_code)]

use ifthenpay_gateway::domain::intent::{OrderIntent, PaymentData, TransactionIntent};
use ifthenpay_gateway::domain::settings::{AvailableMethod, GatewayOption, MerchantSettings, MethodConfig};
use ifthenpay_gateway::gateways::CheckoutGateway;
use ifthenpay_gateway::repo::memory::{InMemoryPaymentsRepo, InMemorySettingsStore};
use ifthenpay_gateway::service::reconciliation::{ReconciliationService, VerifyPolicy};
use ifthenpay_gateway::service::record_store::CachedRecordStore;
use rust_decimal::Decimal;
use std::sync::Arc;
use url::Url;

pub const GATEWAY_KEY: &str = "ABCD-123456";

pub fn available(entity: &str, position: i64) -> AvailableMethod {
    AvailableMethod {
        entity: entity.to_string(),
        position,
        image: format!("https://img.test/{entity}.png"),
        tooltip: entity.to_string(),
        label: entity.to_string(),
    }
}

pub fn method(method: &str, checked: bool, account: &str) -> MethodConfig {
    MethodConfig {
        method: method.to_string(),
        checked,
        selected_account: account.to_string(),
    }
}

pub fn configured_settings() -> MerchantSettings {
    MerchantSettings {
        backoffice_key: Some("1234-5678-9012-3456".to_string()),
        gateway_options: vec![GatewayOption {
            alias: "Loja".to_string(),
            gateway_key: GATEWAY_KEY.to_string(),
        }],
        available_methods: vec![available("MB", 1), available("MBWAY", 2), available("CCARD", 3)],
        gateway_key: Some(GATEWAY_KEY.to_string()),
        payment_methods_configuration: vec![
            method("MB", true, "12345 | 999"),
            method("MBWAY", true, "MBW-0001"),
            method("CCARD", false, "CC-1"),
        ],
        default_method: Some("MBWAY".to_string()),
        description: "Spa booking".to_string(),
    }
}

pub fn ifthenpay_payment_data(token: Option<&str>) -> PaymentData {
    PaymentData {
        method: Some("ifthenpay_gateway".to_string()),
        processor: Some("ifthenpay".to_string()),
        token: token.map(str::to_string),
    }
}

pub fn order(id: i64, token: Option<&str>, amount: Decimal) -> OrderIntent {
    OrderIntent {
        id,
        intent_key: token.map(str::to_string),
        charge_amount: amount,
        booking_form_page_url: None,
        payment_data: ifthenpay_payment_data(token),
        errors: Vec::new(),
    }
}

pub fn transaction(id: i64, token: Option<&str>, amount: Decimal) -> TransactionIntent {
    TransactionIntent {
        id,
        invoice_id: id * 10,
        intent_key: token.map(str::to_string),
        charge_amount: amount,
        payment_data: ifthenpay_payment_data(token),
        errors: Vec::new(),
    }
}

pub struct Harness {
    pub repo: Arc<InMemoryPaymentsRepo>,
    pub records: CachedRecordStore,
    pub service: ReconciliationService,
}

pub fn harness(gateway: Arc<dyn CheckoutGateway>) -> Harness {
    let repo = Arc::new(InMemoryPaymentsRepo::new());
    let records = CachedRecordStore::new(repo.clone());
    let service = ReconciliationService {
        gateway,
        records: records.clone(),
        settings: Arc::new(InMemorySettingsStore::new(configured_settings())),
        locale: "pt_PT".to_string(),
        return_base: Url::parse("https://spa.example.pt/").unwrap(),
        verify_policy: VerifyPolicy::default(),
    };
    Harness {
        repo,
        records,
        service,
    }
}
