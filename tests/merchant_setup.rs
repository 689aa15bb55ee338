mod common;

use ifthenpay_gateway::domain::settings::{CheckoutSettingsUpdate, MerchantSettings};
use ifthenpay_gateway::error::GatewayError;
use ifthenpay_gateway::gateways::ifthenpay::IfthenpayEndpoints;
use ifthenpay_gateway::repo::memory::InMemorySettingsStore;
use ifthenpay_gateway::repo::settings_repo::SettingsStore;
use ifthenpay_gateway::service::merchant_setup::MerchantSetupService;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const KEY: &str = "1234-5678-9012-3456";
const ENTITIES_PATH: &str = "/IfmbWS/ifmbws.asmx/getEntidadeSubentidadeJsonV2";
const MOBILE_PATH: &str = "/IfmbWS/ifthenpaymobile.asmx";

fn service(server: &MockServer, settings: Arc<InMemorySettingsStore>) -> MerchantSetupService {
    let uri = server.uri();
    MerchantSetupService {
        settings,
        endpoints: IfthenpayEndpoints::new(
            &uri,
            &format!("{uri}{MOBILE_PATH}"),
            &format!("{uri}{ENTITIES_PATH}"),
        )
        .unwrap(),
        http: reqwest::Client::new(),
        timeout: Duration::from_secs(2),
    }
}

async fn mount_valid_key(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(ENTITIES_PATH))
        .and(query_param("chavebackoffice", KEY))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([{"Entidade": "12345", "SubEntidade": ["999"]}])),
        )
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{MOBILE_PATH}/GetGatewayKeys")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"GatewayKey": "ABCD-123456", "Alias": "Loja"},
            {"GatewayKey": "EFGH-654321", "Alias": "Online"},
        ])))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/gateway/methods/available"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"Entity": "MBWAY", "Position": 2, "SmallImageUrl": "https://img/mbway.png", "DescriptionEN": "MB WAY", "Method": "MB WAY"},
            {"Entity": "MB", "Position": "1", "SmallImageUrl": "https://img/mb.png", "DescriptionEN": "Multibanco", "Method": "Multibanco"},
            {"Entity": "", "Position": 9},
        ])))
        .mount(server)
        .await;
}

#[tokio::test]
async fn valid_key_stores_gateways_and_catalog() {
    let server = MockServer::start().await;
    mount_valid_key(&server).await;
    let store = Arc::new(InMemorySettingsStore::default());

    let validation = service(&server, store.clone()).validate_key(KEY).await.unwrap();
    assert_eq!(validation.gateway_options.len(), 2);
    assert_eq!(validation.gateway_options[1].alias, "Online");
    let entities: Vec<_> = validation
        .available_methods
        .iter()
        .map(|m| m.entity.as_str())
        .collect();
    assert_eq!(entities, ["MB", "MBWAY"]);
    assert!(validation.gateway_selected.is_none());

    let saved = store.load().await.unwrap();
    assert_eq!(saved.backoffice_key.as_deref(), Some(KEY));
    assert_eq!(saved.gateway_options, validation.gateway_options);
    assert_eq!(saved.available_methods, validation.available_methods);
}

#[tokio::test]
async fn rejected_key_clears_previous_configuration() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(ENTITIES_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;
    let store = Arc::new(InMemorySettingsStore::new(common::configured_settings()));

    let err = service(&server, store.clone())
        .validate_key("9999-9999-9999-9999")
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::RemoteValidation(_)), "{err:?}");
    assert_eq!(store.load().await.unwrap(), MerchantSettings::default());
}

#[tokio::test]
async fn malformed_key_also_clears_configuration() {
    let server = MockServer::start().await;
    let store = Arc::new(InMemorySettingsStore::new(common::configured_settings()));

    let err = service(&server, store.clone()).validate_key("abc").await.unwrap_err();
    assert!(matches!(err, GatewayError::InvalidKeyFormat));
    assert!(store.load().await.unwrap().backoffice_key.is_none());
}

#[tokio::test]
async fn accounts_need_both_keys() {
    let server = MockServer::start().await;
    let empty = service(&server, Arc::new(InMemorySettingsStore::default()));
    assert!(matches!(
        empty.accounts_for_gateway("ABCD-123456").await.unwrap_err(),
        GatewayError::MissingRequiredKeys
    ));

    let configured = service(
        &server,
        Arc::new(InMemorySettingsStore::new(common::configured_settings())),
    );
    assert!(matches!(
        configured.accounts_for_gateway("  ").await.unwrap_err(),
        GatewayError::MissingRequiredKeys
    ));
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn accounts_are_grouped_by_entity() {
    let server = MockServer::start().await;
    mount_valid_key(&server).await;
    Mock::given(method("GET"))
        .and(path(format!("{MOBILE_PATH}/GetAccountsByGatewayKey")))
        .and(query_param("gatewayKey", "ABCD-123456"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"Alias": "Loja MB", "Conta": "12345|999", "Entidade": "12345", "SubEntidade": "999"},
            {"Alias": "Loja MBWAY", "Conta": "MBW-0001", "Entidade": "MBWAY", "SubEntidade": ""},
            {"Alias": "", "Conta": "ignored", "Entidade": "MBWAY"},
        ])))
        .mount(&server)
        .await;

    let svc = service(
        &server,
        Arc::new(InMemorySettingsStore::new(common::configured_settings())),
    );
    let grouped = svc.accounts_for_gateway("ABCD-123456").await.unwrap();
    assert_eq!(grouped.len(), 2);
    assert_eq!(grouped[0].entity, "MB");
    assert_eq!(grouped[0].accounts[0].account, "12345|999");
    assert_eq!(grouped[1].entity, "MBWAY");
    assert_eq!(grouped[1].accounts.len(), 1);
}

fn update(gateway_key: &str, default_method: &str) -> CheckoutSettingsUpdate {
    CheckoutSettingsUpdate {
        gateway_key: Some(gateway_key.to_string()),
        payment_methods_configuration: vec![common::method("MB", true, "12345|999")],
        default_method: Some(default_method.to_string()),
        description: "  Yoga class ".to_string(),
    }
}

#[tokio::test]
async fn checkout_settings_are_validated_against_stored_options() {
    let server = MockServer::start().await;
    let store = Arc::new(InMemorySettingsStore::new(common::configured_settings()));
    let svc = service(&server, store.clone());

    let err = svc
        .update_checkout_settings(update("ZZZZ-000000", "MB"))
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::InvalidSettings(_)));

    let err = svc
        .update_checkout_settings(update(common::GATEWAY_KEY, "BIZUM"))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "INVALID_SETTINGS");

    let saved = svc
        .update_checkout_settings(update(common::GATEWAY_KEY, "MB"))
        .await
        .unwrap();
    assert_eq!(saved.backoffice_key.as_deref(), Some("****-****-****-3456"));
    assert_eq!(saved.description, "Yoga class");

    let stored = store.load().await.unwrap();
    assert_eq!(stored.backoffice_key.as_deref(), Some(KEY));
    assert_eq!(stored.default_method.as_deref(), Some("MB"));
    assert_eq!(stored.payment_methods_configuration.len(), 1);
}

#[tokio::test]
async fn checkout_settings_need_a_validated_key() {
    let server = MockServer::start().await;
    let svc = service(&server, Arc::new(InMemorySettingsStore::default()));
    assert!(matches!(
        svc.update_checkout_settings(update(common::GATEWAY_KEY, "MB"))
            .await
            .unwrap_err(),
        GatewayError::MissingRequiredKeys
    ));
}
