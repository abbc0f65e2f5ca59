//! HTTP API server with observability for the storefront.
//!
//! Provides REST endpoints for the catalog, carts, checkout, orders and
//! accounts, with structured logging (tracing) and Prometheus metrics.

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post, put};
use chrono::Duration;
use metrics_exporter_prometheus::PrometheusHandle;
use services::{
    AccountService, CartService, CatalogService, CheckoutService, OrderService, TokenSigner,
};
use store::Store;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use config::Config;
use error::REDACTED_MESSAGE;
use routes::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: Store + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let redact = state.redact_internal_errors;

    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route(
            "/catalog",
            get(routes::catalog::list::<S>).post(routes::catalog::create::<S>),
        )
        .route(
            "/catalog/{id}",
            get(routes::catalog::get::<S>)
                .put(routes::catalog::update::<S>)
                .delete(routes::catalog::delete::<S>),
        )
        .route(
            "/cart",
            get(routes::cart::get::<S>).post(routes::cart::upsert::<S>),
        )
        .route("/cart/{product_id}", delete(routes::cart::remove::<S>))
        .route(
            "/orders",
            post(routes::orders::create::<S>).get(routes::orders::list::<S>),
        )
        .route("/orders/myorders", get(routes::orders::mine::<S>))
        .route("/orders/{id}", get(routes::orders::get::<S>))
        .route("/orders/{id}/pay", put(routes::orders::pay::<S>))
        .route("/orders/{id}/deliver", put(routes::orders::deliver::<S>))
        .route(
            "/accounts",
            post(routes::accounts::register::<S>).get(routes::accounts::list::<S>),
        )
        .route("/accounts/login", post(routes::accounts::login::<S>))
        .route(
            "/accounts/profile",
            get(routes::accounts::profile::<S>).put(routes::accounts::update_profile::<S>),
        )
        .route("/accounts/{id}", delete(routes::accounts::delete::<S>))
        .with_state(state)
        .merge(metrics_router)
        .layer(middleware::from_fn_with_state(
            redact,
            redact_internal_errors,
        ))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates the application state over `store`.
pub fn create_default_state<S: Store + Clone + 'static>(
    store: S,
    config: &Config,
) -> Arc<AppState<S>> {
    let tokens = TokenSigner::new(
        config.token_secret.clone(),
        Duration::days(config.token_ttl_days),
    );

    Arc::new(AppState {
        catalog: CatalogService::new(store.clone()),
        carts: CartService::new(store.clone()),
        checkout: CheckoutService::new(store.clone()),
        orders: OrderService::new(store.clone()),
        accounts: AccountService::new(store, tokens),
        redact_internal_errors: config.environment.is_production(),
    })
}

/// Replaces the body of every 500 response when `redact` is set.
async fn redact_internal_errors(
    State(redact): State<bool>,
    request: Request,
    next: Next,
) -> Response {
    let response = next.run(request).await;
    if redact && response.status() == StatusCode::INTERNAL_SERVER_ERROR {
        let body = serde_json::json!({ "error": REDACTED_MESSAGE });
        return (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(body)).into_response();
    }
    response
}
