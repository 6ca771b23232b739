//! Payment provider integration.
//!
//! The provider is consumed as a black box: order and subscription
//! creation, capture, lifecycle queries, and webhook signature
//! verification. Everything the reconciliation engine learns about
//! money arrives through here.

pub mod client;
pub mod types;

pub use client::{sign_webhook_payload, ProviderClient, ProviderError};
pub use types::{Order, Subscription};
