//! API handlers.

pub mod accounts;
pub mod credits;
pub mod generations;
pub mod health;
pub mod subscriptions;
pub mod usage;
pub mod webhooks;
