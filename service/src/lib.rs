//! Palette Billing Service - HTTP API for credits, subscriptions and
//! generation admission.
//!
//! The service reconciles payment provider notifications (webhook push
//! and browser-return callbacks) into exactly-once account mutations,
//! and gates generation requests against the resulting balances.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod auth;
pub mod billing;
pub mod config;
pub mod error;
pub mod handlers;
pub mod provider;
pub mod routes;
pub mod state;

pub use config::ServiceConfig;
pub use error::ApiError;
pub use routes::create_router;
pub use state::AppState;
