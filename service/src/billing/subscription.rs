//! Subscription lifecycle reconciliation.
//!
//! Both the webhook and the user's synchronous return from the
//! provider's approval page funnel into [`SubscriptionLifecycle::apply`],
//! which claims the `subscription_id + event_type` effect key and applies
//! the transition atomically. Whichever channel arrives first wins; the
//! other is absorbed silently.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use palette_billing_core::{
    AccountId, EffectKey, ProcessedTransaction, SubscriptionUpdate,
};
use palette_billing_store::{ApplyOutcome, Result, RocksStore, Store};

/// Applies provider-reported subscription transitions to accounts.
#[derive(Clone)]
pub struct SubscriptionLifecycle {
    store: Arc<RocksStore>,
}

impl SubscriptionLifecycle {
    /// Create a lifecycle engine over the store.
    #[must_use]
    pub fn new(store: Arc<RocksStore>) -> Self {
        Self { store }
    }

    /// Resolve the account a subscription event belongs to.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn resolve_account(&self, subscription_id: &str) -> Result<Option<AccountId>> {
        Ok(self
            .store
            .get_account_by_subscription(subscription_id)?
            .map(|account| account.id))
    }

    /// Bind a newly created provider subscription to an account.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the account doesn't exist.
    pub fn bind(
        &self,
        account_id: &AccountId,
        subscription_id: &str,
        now: DateTime<Utc>,
    ) -> Result<()> {
        self.store.bind_subscription(account_id, subscription_id, now)?;
        tracing::info!(
            account_id = %account_id,
            subscription_id = %subscription_id,
            "Subscription bound, pending approval"
        );
        Ok(())
    }

    /// Apply one lifecycle transition through the idempotency guard.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the account doesn't exist.
    pub fn apply(
        &self,
        account_id: &AccountId,
        update: &SubscriptionUpdate,
        metadata: serde_json::Value,
        now: DateTime<Utc>,
    ) -> Result<ApplyOutcome> {
        let key = EffectKey::subscription_event(&update.subscription_id, update.kind);
        let claim = ProcessedTransaction::new(
            key,
            serde_json::json!({
                "event": update.kind.as_str(),
                "subscription_id": update.subscription_id,
            }),
            now,
        );

        let outcome = self
            .store
            .apply_subscription_transition(account_id, update, &claim, metadata, now)?;

        match &outcome {
            ApplyOutcome::Applied(account) => {
                tracing::info!(
                    account_id = %account_id,
                    subscription_id = %update.subscription_id,
                    event = %update.kind,
                    status = ?account.subscription_status,
                    tier = ?account.tier,
                    "Subscription transition applied"
                );
            }
            ApplyOutcome::Duplicate => {
                tracing::info!(
                    account_id = %account_id,
                    subscription_id = %update.subscription_id,
                    event = %update.kind,
                    "Transition already applied, skipping"
                );
            }
            ApplyOutcome::Stale => {
                tracing::warn!(
                    account_id = %account_id,
                    subscription_id = %update.subscription_id,
                    event = %update.kind,
                    "Stale transition ignored"
                );
            }
        }

        Ok(outcome)
    }
}
