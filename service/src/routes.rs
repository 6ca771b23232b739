//! Router configuration.
//!
//! This module sets up the Axum router with all routes and middleware.

use std::sync::Arc;
use std::time::Duration;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{accounts, credits, generations, health, subscriptions, usage, webhooks};
use crate::state::AppState;

/// Create the service router with all routes and middleware.
///
/// # Routes
///
/// ## Public
/// - `GET /health` - Health check
///
/// ## Accounts (user auth)
/// - `POST /v1/accounts` - Provision account
/// - `GET /v1/accounts/me` - Get current user's account
///
/// ## Credits and orders (user auth)
/// - `GET /v1/credits/balance` - Get current balance
/// - `POST /v1/orders` - Create a credit pack order
/// - `POST /v1/orders/{order_id}/capture` - Capture after browser return
///
/// ## Subscriptions (user auth)
/// - `POST /v1/subscriptions` - Create and bind a subscription
/// - `POST /v1/subscriptions/activate` - Activate after browser return
/// - `POST /v1/subscriptions/cancel` - Cancel
///
/// ## Generations (user auth)
/// - `POST /v1/generations/check` - Admission pre-check
/// - `POST /v1/generations/consume` - Atomic debit
///
/// ## Usage (user or service API key auth)
/// - `POST /v1/usage` - Record a generation's usage (service)
/// - `GET /v1/usage/me` - Current period usage (user)
/// - `GET /v1/usage/system` - System-wide rollup (service)
/// - `GET /v1/usage/top` - Heaviest accounts (service)
///
/// ## Webhooks (signature verification)
/// - `POST /webhooks/payments` - Payment provider webhooks
pub fn create_router(state: AppState) -> Router {
    // Extract config values before moving state
    let cors_origins = state.config.cors_origins.clone();
    let max_body_bytes = state.config.max_body_bytes;
    let request_timeout_seconds = state.config.request_timeout_seconds;

    // Build CORS layer
    let cors = build_cors_layer(&cors_origins);

    let state = Arc::new(state);

    Router::new()
        // Health (public)
        .route("/health", get(health::health))
        // Accounts
        .route("/v1/accounts", post(accounts::create_account))
        .route("/v1/accounts/me", get(accounts::get_account))
        // Credits and orders
        .route("/v1/credits/balance", get(credits::get_balance))
        .route("/v1/orders", post(credits::create_order))
        .route("/v1/orders/:order_id/capture", post(credits::capture_order))
        // Subscriptions
        .route("/v1/subscriptions", post(subscriptions::create_subscription))
        .route(
            "/v1/subscriptions/activate",
            post(subscriptions::activate_subscription),
        )
        .route(
            "/v1/subscriptions/cancel",
            post(subscriptions::cancel_subscription),
        )
        // Generations
        .route("/v1/generations/check", post(generations::check))
        .route("/v1/generations/consume", post(generations::consume))
        // Usage
        .route("/v1/usage", post(usage::record_usage))
        .route("/v1/usage/me", get(usage::my_usage))
        .route("/v1/usage/system", get(usage::system_usage))
        .route("/v1/usage/top", get(usage::top_accounts))
        // Webhooks
        .route("/webhooks/payments", post(webhooks::payments_webhook))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(TimeoutLayer::new(Duration::from_secs(
            request_timeout_seconds,
        )))
        .with_state(state)
}

/// Build the CORS layer from configured origins.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}
