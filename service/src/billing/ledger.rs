//! The credit ledger.
//!
//! Grants are claimed through the shared idempotency key space, so the
//! webhook and the return-callback can both report the same order and
//! exactly one of them lands. Consumes are the atomic admission gate.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use palette_billing_core::{AccountId, Balance, EffectKey, ProcessedTransaction};
use palette_billing_store::{ConsumeOutcome, GrantOutcome, Result, RocksStore, Store};

/// Grant and consume operations over an account's credit balances.
#[derive(Clone)]
pub struct CreditLedger {
    store: Arc<RocksStore>,
}

impl CreditLedger {
    /// Create a ledger over the store.
    #[must_use]
    pub fn new(store: Arc<RocksStore>) -> Self {
        Self { store }
    }

    /// Grant purchased credits for one real-world order, exactly once.
    ///
    /// Both ingress paths call this with the identical `effect_key`
    /// derived from the provider order ID; whichever arrives second
    /// gets `AlreadyProcessed`, which callers treat as success.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the account doesn't exist.
    pub fn grant_purchased(
        &self,
        account_id: &AccountId,
        amount: i64,
        effect_key: EffectKey,
        outcome: serde_json::Value,
        now: DateTime<Utc>,
    ) -> Result<GrantOutcome> {
        let claim = ProcessedTransaction::new(effect_key, outcome, now);
        let result = self.store.grant_purchased(account_id, amount, &claim, now)?;

        match &result {
            GrantOutcome::Added(account) => {
                tracing::info!(
                    account_id = %account_id,
                    effect_key = %claim.key,
                    credits_added = %amount,
                    purchased_credits = %account.purchased_credits,
                    "Credits granted"
                );
            }
            GrantOutcome::AlreadyProcessed => {
                tracing::info!(
                    account_id = %account_id,
                    effect_key = %claim.key,
                    "Grant already processed, skipping"
                );
            }
        }

        Ok(result)
    }

    /// Debit one credit, or pass a pro account through.
    ///
    /// # Errors
    ///
    /// - `StoreError::NotFound` if the account doesn't exist.
    /// - `StoreError::InsufficientCredits` when both balances are empty.
    pub fn consume(&self, account_id: &AccountId, now: DateTime<Utc>) -> Result<ConsumeOutcome> {
        let outcome = self.store.consume_credit(account_id, now)?;
        tracing::debug!(
            account_id = %account_id,
            source = ?outcome.source,
            free = %outcome.account.free_credits_remaining,
            purchased = %outcome.account.purchased_credits,
            "Credit consumed"
        );
        Ok(outcome)
    }

    /// Read the balance at `now` without writing.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the account doesn't exist.
    pub fn balance(&self, account_id: &AccountId, now: DateTime<Utc>) -> Result<Balance> {
        let account = self
            .store
            .get_account(account_id)?
            .ok_or(palette_billing_store::StoreError::NotFound)?;
        Ok(account.balance(now))
    }
}
