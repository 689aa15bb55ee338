pub mod config;
pub mod domain {
    pub mod intent;
    pub mod payment;
    pub mod settings;
}
pub mod error;
pub mod gateways;
pub mod http {
    pub mod extract;
    pub mod handlers {
        pub mod admin;
        pub mod checkout;
        pub mod intents;
        pub mod ops;
        pub mod payments;
    }
    pub mod middleware {
        pub mod admin_auth;
        pub mod rate_limit;
    }
    pub mod router;
}
pub mod repo {
    pub mod memory;
    pub mod payments_repo;
    pub mod settings_repo;
}
pub mod service {
    pub mod activation;
    pub mod intent_resolver;
    pub mod merchant_setup;
    pub mod payload_builder;
    pub mod reconciliation;
    pub mod record_store;
}
pub mod sig_down;

#[derive(Clone)]
pub struct AppState {
    pub reconciliation: service::reconciliation::ReconciliationService,
    pub resolver: service::intent_resolver::IntentResolver,
    pub merchant_setup: service::merchant_setup::MerchantSetupService,
    pub activation: service::activation::ActivationService,
    pub records: service::record_store::CachedRecordStore,
    pub pool: Option<sqlx::PgPool>,
    pub redis_client: Option<redis::Client>,
    /// Cancelled on shutdown; aborts in-flight payment verification.
    pub shutdown: tokio_util::sync::CancellationToken,
}
