//! Key encoding utilities for `RocksDB`.
//!
//! This module provides functions for encoding and decoding keys used in
//! column families.

use chrono::{DateTime, Utc};

use palette_billing_core::{AccountId, EffectKey, EventId};

/// Create an account key from an account ID.
#[must_use]
pub fn account_key(account_id: &AccountId) -> Vec<u8> {
    account_id.as_bytes().to_vec()
}

/// Create a subscription-index key from a provider subscription ID.
#[must_use]
pub fn subscription_index_key(subscription_id: &str) -> Vec<u8> {
    subscription_id.as_bytes().to_vec()
}

/// Create a processed-effect key from an effect key.
#[must_use]
pub fn effect_key(effect: &EffectKey) -> Vec<u8> {
    effect.encode().into_bytes()
}

/// Create a usage-record key.
///
/// Format: `period_start seconds (8 bytes, big-endian) || account_id (16 bytes)`
///
/// Big-endian seconds make keys sort chronologically, so one period's
/// records form a contiguous range under the period prefix.
#[must_use]
pub fn usage_record_key(period_start: DateTime<Utc>, account_id: &AccountId) -> Vec<u8> {
    let mut key = Vec::with_capacity(24);
    key.extend_from_slice(&period_start.timestamp().to_be_bytes());
    key.extend_from_slice(account_id.as_bytes());
    key
}

/// Create a prefix for iterating all usage records in a period.
#[must_use]
pub fn usage_period_prefix(period_start: DateTime<Utc>) -> Vec<u8> {
    period_start.timestamp().to_be_bytes().to_vec()
}

/// Create a subscription audit event key from an event ID.
#[must_use]
pub fn subscription_event_key(event_id: &EventId) -> Vec<u8> {
    event_id.to_bytes().to_vec()
}
