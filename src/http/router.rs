use crate::http::handlers::{admin, checkout, intents, ops, payments};
use crate::http::middleware::admin_auth::require_internal_api_key;
use crate::http::middleware::rate_limit::{enforce, RateLimitState};
use crate::AppState;
use axum::middleware::from_fn_with_state;
use axum::routing::{delete, get, post, put};
use axum::Router;

pub fn build(state: AppState, admin_key: String, rate_limit: Option<RateLimitState>) -> Router {
    let admin_routes = Router::new()
        .route("/admin/backoffice-key", post(admin::validate_key))
        .route(
            "/admin/gateways/:gateway_key/accounts",
            get(admin::gateway_accounts),
        )
        .route("/admin/activation", post(admin::request_activation))
        .route("/admin/settings", get(admin::get_settings))
        .route("/admin/settings/checkout", put(admin::update_checkout_settings))
        .route("/admin/payments/:token", delete(admin::delete_payment))
        .layer(from_fn_with_state(admin_key, require_internal_api_key));

    let app = Router::new()
        .route("/health", get(payments::health))
        .route("/checkout/order", post(checkout::create_order_checkout))
        .route(
            "/checkout/transaction",
            post(checkout::create_transaction_checkout),
        )
        .route(
            "/checkout/return",
            post(checkout::gateway_return).get(checkout::gateway_return_redirect),
        )
        .route("/intents/order/resolve", post(intents::resolve_order))
        .route(
            "/intents/transaction/resolve",
            post(intents::resolve_transaction),
        )
        .route("/payments/:token", get(payments::get_by_token))
        .route(
            "/payments/by-transaction/:txid",
            get(payments::get_by_transaction_id),
        )
        .route("/ops/readiness", get(ops::readiness))
        .route("/ops/liveness", get(ops::liveness))
        .merge(admin_routes);

    let app = match rate_limit {
        Some(limits) => app.layer(from_fn_with_state(limits, enforce)),
        None => app,
    };
    app.with_state(state)
}
