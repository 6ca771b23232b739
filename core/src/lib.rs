//! Core types for the Palette billing engine.
//!
//! This crate provides the domain model shared by the store and the
//! service:
//!
//! - **Identifiers**: `AccountId`, `EventId`
//! - **Accounts**: `Account`, `Tier`, `SubscriptionStatus`, `Balance`
//! - **Subscriptions**: the lifecycle transition function and
//!   `SubscriptionUpdate`
//! - **Effects**: `EffectKey`, `ProcessedTransaction` (idempotency)
//! - **Usage**: `UsageRecord`, rollups, billing-period math
//!
//! # Credit unit
//!
//! **1 credit = one AI theme generation.** Free credits are granted once
//! at provisioning and never replenished; purchased credits arrive from
//! one-time orders; a Pro subscription bypasses the ledger entirely.
//! Balances are stored as `i64` counters.
//!
//! All state-changing functions take `now: DateTime<Utc>` so callers own
//! the clock.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod account;
pub mod effects;
pub mod events;
pub mod ids;
pub mod period;
pub mod subscription;
pub mod usage;

pub use account::{
    Account, Balance, ProvisioningPolicy, SubscriptionStatus, Tier, DEFAULT_INITIAL_FREE_CREDITS,
    LARGE_PACK_CREDITS, LARGE_PACK_PRICE_CENTS, PRO_PLAN_PRICE_CENTS, SMALL_PACK_CREDITS,
    SMALL_PACK_PRICE_CENTS,
};
pub use effects::{EffectKey, EffectKind, ProcessedTransaction};
pub use events::SubscriptionAuditEvent;
pub use ids::{AccountId, EventId, IdError};
pub use period::PeriodBounds;
pub use subscription::{SubscriptionEventKind, SubscriptionUpdate, TransitionOutcome};
pub use usage::{SystemUsage, UsageRecord};
