//! Database schema definitions and column families.
//!
//! This module defines the column families used in `RocksDB` storage.

/// Column family names for the `RocksDB` database.
pub mod cf {
    /// Primary account records, keyed by `account_id`.
    pub const ACCOUNTS: &str = "accounts";

    /// Index: account lookup by provider subscription ID.
    /// Value is the 16-byte account ID.
    pub const ACCOUNTS_BY_SUBSCRIPTION: &str = "accounts_by_subscription";

    /// Processed-effect claims (idempotency), keyed by encoded effect key.
    pub const PROCESSED_EFFECTS: &str = "processed_effects";

    /// Usage records, keyed by `period_start || account_id`.
    pub const USAGE_RECORDS: &str = "usage_records";

    /// Append-only subscription audit events, keyed by `event_id` (ULID).
    pub const SUBSCRIPTION_EVENTS: &str = "subscription_events";
}

/// Returns all column family names for database initialization.
#[must_use]
pub fn all_column_families() -> Vec<&'static str> {
    vec![
        cf::ACCOUNTS,
        cf::ACCOUNTS_BY_SUBSCRIPTION,
        cf::PROCESSED_EFFECTS,
        cf::USAGE_RECORDS,
        cf::SUBSCRIPTION_EVENTS,
    ]
}
