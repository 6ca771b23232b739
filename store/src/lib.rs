//! `RocksDB` storage layer for the Palette billing engine.
//!
//! This crate persists accounts, processed-effect claims, usage records,
//! and the subscription audit log using `RocksDB` with column families.
//!
//! # Architecture
//!
//! The storage uses the following column families:
//!
//! - `accounts`: primary account records, keyed by `account_id`
//! - `accounts_by_subscription`: index from provider subscription ID to
//!   account ID
//! - `processed_effects`: idempotency claims, keyed by encoded effect key
//! - `usage_records`: per-period usage, keyed by `period_start || account_id`
//! - `subscription_events`: append-only audit rows, keyed by ULID
//!
//! # Atomicity
//!
//! Ingress handlers race: the webhook and the return-callback can carry
//! the same payment event, and concurrent generation requests debit the
//! same balance. Every compound operation here (claim-then-mutate,
//! check-and-decrement) runs as a single critical section inside the
//! store and lands in one `WriteBatch`, so exactly one racer wins and
//! the rest observe the claim.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod keys;
pub mod rocks;
pub mod schema;

pub use error::{Result, StoreError};
pub use rocks::RocksStore;

use chrono::{DateTime, Utc};

use palette_billing_core::{
    Account, AccountId, EffectKey, PeriodBounds, ProcessedTransaction, SubscriptionUpdate,
    UsageRecord,
};

/// Result of a claimed credit grant.
#[derive(Debug, Clone)]
pub enum GrantOutcome {
    /// The claim succeeded and the credits were added.
    Added(Account),

    /// The effect was already claimed; nothing changed.
    AlreadyProcessed,
}

impl GrantOutcome {
    /// Whether this grant mutated the account.
    #[must_use]
    pub const fn added(&self) -> bool {
        matches!(self, Self::Added(_))
    }
}

/// Which balance a successful consume debited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebitSource {
    /// Pro entitlement; no counter was touched.
    Unlimited,

    /// One free credit.
    Free,

    /// One purchased credit.
    Purchased,
}

/// Result of a successful consume.
#[derive(Debug, Clone)]
pub struct ConsumeOutcome {
    /// The account after the debit.
    pub account: Account,

    /// Which balance was debited.
    pub source: DebitSource,
}

/// Result of a claimed subscription transition.
#[derive(Debug, Clone)]
pub enum ApplyOutcome {
    /// The transition was applied; the account reflects it.
    Applied(Account),

    /// The effect was already claimed (redelivery); nothing changed.
    Duplicate,

    /// The claim was fresh but the event was stale (superseded
    /// subscription ID, activation after expiry). The claim is
    /// persisted so redelivery stays a no-op; the account is unchanged.
    Stale,
}

/// The storage trait defining all database operations.
///
/// This trait abstracts the storage layer, allowing for different
/// implementations.
pub trait Store: Send + Sync {
    // =========================================================================
    // Account Operations
    // =========================================================================

    /// Insert or update an account record.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn put_account(&self, account: &Account) -> Result<()>;

    /// Get an account by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_account(&self, account_id: &AccountId) -> Result<Option<Account>>;

    /// Get an account through the subscription-ID index.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_account_by_subscription(&self, subscription_id: &str) -> Result<Option<Account>>;

    /// Bind a freshly created provider subscription to an account.
    ///
    /// Sets the subscription to pending, upgrades the tier per the
    /// pending-implies-pro invariant, and writes the lookup index in the
    /// same batch. Returns the updated account.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the account doesn't exist.
    fn bind_subscription(
        &self,
        account_id: &AccountId,
        subscription_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Account>;

    // =========================================================================
    // Effect Claims (idempotency)
    // =========================================================================

    /// Atomically claim an effect key: create-if-absent.
    ///
    /// Exactly one concurrent caller per key observes `true`; everyone
    /// else observes `false`, which means "already handled".
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn claim_effect(&self, record: &ProcessedTransaction) -> Result<bool>;

    /// Look up a processed-effect record.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_processed_effect(&self, key: &EffectKey) -> Result<Option<ProcessedTransaction>>;

    // =========================================================================
    // Ledger Compound Operations
    // =========================================================================

    /// Claim an effect and grant purchased credits in one atomic section.
    ///
    /// On a fresh claim the account's `purchased_credits` and
    /// `total_purchased_credits` both grow by `amount` and a free
    /// account is promoted to starter. A duplicate claim returns
    /// [`GrantOutcome::AlreadyProcessed`] without touching the account.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the account doesn't exist.
    fn grant_purchased(
        &self,
        account_id: &AccountId,
        amount: i64,
        claim: &ProcessedTransaction,
        now: DateTime<Utc>,
    ) -> Result<GrantOutcome>;

    /// Atomic check-and-decrement of one credit.
    ///
    /// Pro entitlement at `now` is a no-op success. Otherwise free
    /// credits are debited before purchased ones. Lazy demotion of a
    /// cancelled, period-elapsed account happens (and is persisted)
    /// inside this critical section, before the tier check.
    ///
    /// # Errors
    ///
    /// - `StoreError::NotFound` if the account doesn't exist.
    /// - `StoreError::InsufficientCredits` if both balances are empty.
    fn consume_credit(&self, account_id: &AccountId, now: DateTime<Utc>) -> Result<ConsumeOutcome>;

    // =========================================================================
    // Subscription Compound Operation
    // =========================================================================

    /// Claim an effect and apply a subscription transition atomically.
    ///
    /// On a fresh claim the transition runs against the account; the
    /// claim row, the updated account, the audit row, and the
    /// subscription index land in one write batch. Redelivery returns
    /// [`ApplyOutcome::Duplicate`] with no additional audit row.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the account doesn't exist.
    fn apply_subscription_transition(
        &self,
        account_id: &AccountId,
        update: &SubscriptionUpdate,
        claim: &ProcessedTransaction,
        metadata: serde_json::Value,
        now: DateTime<Utc>,
    ) -> Result<ApplyOutcome>;

    /// List audit rows for an account (reporting only).
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_subscription_events(
        &self,
        account_id: &AccountId,
    ) -> Result<Vec<palette_billing_core::SubscriptionAuditEvent>>;

    // =========================================================================
    // Usage Records
    // =========================================================================

    /// Upsert the account's usage record for the given period.
    ///
    /// Creates the record on first use in a period, folds the counts in
    /// thereafter. Returns the record after the update.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn record_usage(
        &self,
        account_id: &AccountId,
        bounds: PeriodBounds,
        input_tokens: u64,
        output_tokens: u64,
        now: DateTime<Utc>,
    ) -> Result<UsageRecord>;

    /// Get one account's usage record for a period.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_usage(
        &self,
        account_id: &AccountId,
        period_start: DateTime<Utc>,
    ) -> Result<Option<UsageRecord>>;

    /// List all usage records for a period (prefix scan).
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_usage_for_period(&self, period_start: DateTime<Utc>) -> Result<Vec<UsageRecord>>;
}
