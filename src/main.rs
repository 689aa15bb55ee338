use ifthenpay_gateway::config::{AppConfig, GatewayAdapter, StoreBackend};
use ifthenpay_gateway::gateways::ifthenpay::{IfthenpayClient, IfthenpayEndpoints};
use ifthenpay_gateway::gateways::mock::{MockBehavior, MockGateway};
use ifthenpay_gateway::gateways::CheckoutGateway;
use ifthenpay_gateway::http::middleware::rate_limit::RateLimitState;
use ifthenpay_gateway::repo::memory::{InMemoryPaymentsRepo, InMemorySettingsStore};
use ifthenpay_gateway::repo::payments_repo::{PaymentRecordRepo, PaymentsRepo};
use ifthenpay_gateway::repo::settings_repo::{SettingsRepo, SettingsStore};
use ifthenpay_gateway::service::activation::{ActivationService, SmtpSupportMailer, SupportMailer};
use ifthenpay_gateway::service::intent_resolver::IntentResolver;
use ifthenpay_gateway::service::merchant_setup::MerchantSetupService;
use ifthenpay_gateway::service::reconciliation::{ReconciliationService, VerifyPolicy};
use ifthenpay_gateway::service::record_store::CachedRecordStore;
use ifthenpay_gateway::sig_down::ShutdownSignal;
use ifthenpay_gateway::AppState;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use url::Url;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cfg = AppConfig::from_env();
    let signal = ShutdownSignal::install()?;

    let (pool, payments_repo, settings_store): (
        Option<sqlx::PgPool>,
        Arc<dyn PaymentRecordRepo>,
        Arc<dyn SettingsStore>,
    ) = match cfg.store_backend {
        StoreBackend::Postgres => {
            let pool = PgPoolOptions::new()
                .max_connections(10)
                .connect(&cfg.database_url)
                .await?;
            sqlx::migrate!("./migrations").run(&pool).await?;
            (
                Some(pool.clone()),
                Arc::new(PaymentsRepo { pool: pool.clone() }),
                Arc::new(SettingsRepo { pool }),
            )
        }
        StoreBackend::Memory => {
            tracing::warn!("STORE_BACKEND=memory, payment records are not persisted");
            (
                None,
                Arc::new(InMemoryPaymentsRepo::new()),
                Arc::new(InMemorySettingsStore::default()),
            )
        }
    };

    let gateway_timeout = Duration::from_millis(cfg.gateway_timeout_ms);
    let http = reqwest::Client::builder().timeout(gateway_timeout).build()?;
    let endpoints = IfthenpayEndpoints::new(
        &cfg.ifthenpay_api_base,
        &cfg.ifthenpay_mobile_base,
        &cfg.ifthenpay_entities_url,
    )?;
    let gateway: Arc<dyn CheckoutGateway> = match cfg.gateway_adapter {
        GatewayAdapter::Ifthenpay => Arc::new(
            IfthenpayClient::new(endpoints.clone(), http.clone()).with_timeout(gateway_timeout),
        ),
        GatewayAdapter::Mock => {
            let behavior: MockBehavior = cfg.mock_behavior.parse()?;
            tracing::warn!(?behavior, "using mock gateway adapter");
            Arc::new(MockGateway::new(behavior))
        }
    };

    let records = CachedRecordStore::with_capacity(payments_repo, cfg.record_cache_capacity);
    let return_base = Url::parse(&cfg.return_base_url)?;

    let reconciliation = ReconciliationService {
        gateway,
        records: records.clone(),
        settings: settings_store.clone(),
        locale: cfg.site_locale.clone(),
        return_base: return_base.clone(),
        verify_policy: VerifyPolicy {
            timeout: Duration::from_millis(cfg.verify_timeout_ms),
            interval: Duration::from_millis(cfg.verify_interval_ms),
        },
    };
    let merchant_setup = MerchantSetupService {
        settings: settings_store.clone(),
        endpoints,
        http,
        timeout: gateway_timeout,
    };

    let mailer: Option<Arc<dyn SupportMailer>> = match &cfg.smtp_host {
        Some(host) => {
            let smtp = SmtpSupportMailer::new(host, &cfg.smtp_username, &cfg.smtp_password)?;
            Some(Arc::new(smtp) as Arc<dyn SupportMailer>)
        }
        None => {
            tracing::warn!("SMTP_HOST not set, activation requests cannot be sent");
            None
        }
    };
    let activation = ActivationService {
        mailer,
        settings: settings_store,
        support_email: cfg.support_email.clone(),
        site_url: return_base,
        site_name: cfg.site_name.clone(),
    };

    let redis_client = match &cfg.redis_url {
        Some(url) => Some(redis::Client::open(url.as_str())?),
        None => {
            tracing::warn!("REDIS_URL is empty, rate limiting disabled");
            None
        }
    };
    let state = AppState {
        reconciliation,
        resolver: IntentResolver {
            records: records.clone(),
        },
        merchant_setup,
        activation,
        records,
        pool,
        redis_client: redis_client.clone(),
        shutdown: signal.token(),
    };

    let app = ifthenpay_gateway::http::router::build(
        state,
        cfg.internal_api_key.clone(),
        redis_client.map(|redis_client| RateLimitState {
            redis_client,
            max_per_minute: cfg.rate_limit_per_minute,
        }),
    );

    let listener = tokio::net::TcpListener::bind(&cfg.bind_addr).await?;
    tracing::info!("listening on {}", cfg.bind_addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { signal.wait().await })
        .await?;
    Ok(())
}
