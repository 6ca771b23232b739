//! `RocksDB` storage implementation.
//!
//! This module provides the `RocksStore` implementation of the `Store`
//! trait. Compound operations take an internal write lock for the span
//! of their read-modify-write and commit through a single `WriteBatch`:
//! the lock gives exclusivity between racing claims and debits, the
//! batch gives all-or-nothing persistence.

use std::path::Path;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use rocksdb::{
    BoundColumnFamily, ColumnFamilyDescriptor, DBWithThreadMode, IteratorMode, MultiThreaded,
    Options, WriteBatch,
};

use palette_billing_core::{
    Account, AccountId, EffectKey, PeriodBounds, ProcessedTransaction, SubscriptionAuditEvent,
    SubscriptionUpdate, Tier, TransitionOutcome, UsageRecord,
};

use crate::error::{Result, StoreError};
use crate::keys;
use crate::schema::{all_column_families, cf};
use crate::{ApplyOutcome, ConsumeOutcome, DebitSource, GrantOutcome, Store};

/// RocksDB-backed storage implementation.
pub struct RocksStore {
    db: Arc<DBWithThreadMode<MultiThreaded>>,

    // Serializes compound read-modify-write sections. The batch makes a
    // commit atomic; this makes the read-check-write around it exclusive.
    write_lock: Mutex<()>,
}

impl RocksStore {
    /// Open or create a `RocksDB` database at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or created.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_descriptors: Vec<_> = all_column_families()
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect();

        let db = DBWithThreadMode::open_cf_descriptors(&opts, path, cf_descriptors)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(Self {
            db: Arc::new(db),
            write_lock: Mutex::new(()),
        })
    }

    /// Get a column family handle.
    fn cf(&self, name: &str) -> Result<Arc<BoundColumnFamily<'_>>> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StoreError::Database(format!("column family not found: {name}")))
    }

    /// Serialize a value using CBOR.
    fn serialize<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(value, &mut buf)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(buf)
    }

    /// Deserialize a value from CBOR.
    fn deserialize<T: serde::de::DeserializeOwned>(data: &[u8]) -> Result<T> {
        ciborium::from_reader(data).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, ()>> {
        self.write_lock
            .lock()
            .map_err(|_| StoreError::Database("write lock poisoned".into()))
    }

    /// Check for an existing claim. Callers inside a locked section use
    /// this before writing the claim row in their batch.
    fn effect_exists(&self, key: &EffectKey) -> Result<bool> {
        let cf = self.cf(cf::PROCESSED_EFFECTS)?;
        let exists = self
            .db
            .get_cf(&cf, keys::effect_key(key))
            .map_err(|e| StoreError::Database(e.to_string()))?
            .is_some();
        Ok(exists)
    }

    fn load_account(&self, account_id: &AccountId) -> Result<Account> {
        self.get_account(account_id)?.ok_or(StoreError::NotFound)
    }
}

impl Store for RocksStore {
    // =========================================================================
    // Account Operations
    // =========================================================================

    fn put_account(&self, account: &Account) -> Result<()> {
        let cf = self.cf(cf::ACCOUNTS)?;
        let key = keys::account_key(&account.id);
        let value = Self::serialize(account)?;

        self.db
            .put_cf(&cf, key, value)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(())
    }

    fn get_account(&self, account_id: &AccountId) -> Result<Option<Account>> {
        let cf = self.cf(cf::ACCOUNTS)?;
        let key = keys::account_key(account_id);

        self.db
            .get_cf(&cf, key)
            .map_err(|e| StoreError::Database(e.to_string()))?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }

    fn get_account_by_subscription(&self, subscription_id: &str) -> Result<Option<Account>> {
        let cf = self.cf(cf::ACCOUNTS_BY_SUBSCRIPTION)?;
        let key = keys::subscription_index_key(subscription_id);

        let Some(raw) = self
            .db
            .get_cf(&cf, key)
            .map_err(|e| StoreError::Database(e.to_string()))?
        else {
            return Ok(None);
        };

        let mut bytes = [0u8; 16];
        if raw.len() != 16 {
            return Err(StoreError::Database(
                "malformed subscription index entry".into(),
            ));
        }
        bytes.copy_from_slice(&raw);
        let account_id = AccountId::from_bytes(bytes);
        self.get_account(&account_id)
    }

    fn bind_subscription(
        &self,
        account_id: &AccountId,
        subscription_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Account> {
        let _guard = self.lock()?;

        let mut account = self.load_account(account_id)?;
        account.subscription_id = Some(subscription_id.to_string());
        account.subscription_status = palette_billing_core::SubscriptionStatus::Pending;
        account.tier = Tier::Pro;
        account.updated_at = now;

        let cf_accounts = self.cf(cf::ACCOUNTS)?;
        let cf_index = self.cf(cf::ACCOUNTS_BY_SUBSCRIPTION)?;

        let mut batch = WriteBatch::default();
        batch.put_cf(
            &cf_accounts,
            keys::account_key(account_id),
            Self::serialize(&account)?,
        );
        batch.put_cf(
            &cf_index,
            keys::subscription_index_key(subscription_id),
            account_id.as_bytes(),
        );

        self.db
            .write(batch)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(account)
    }

    // =========================================================================
    // Effect Claims
    // =========================================================================

    fn claim_effect(&self, record: &ProcessedTransaction) -> Result<bool> {
        let _guard = self.lock()?;

        if self.effect_exists(&record.key)? {
            return Ok(false);
        }

        let cf = self.cf(cf::PROCESSED_EFFECTS)?;
        self.db
            .put_cf(&cf, keys::effect_key(&record.key), Self::serialize(record)?)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(true)
    }

    fn get_processed_effect(&self, key: &EffectKey) -> Result<Option<ProcessedTransaction>> {
        let cf = self.cf(cf::PROCESSED_EFFECTS)?;

        self.db
            .get_cf(&cf, keys::effect_key(key))
            .map_err(|e| StoreError::Database(e.to_string()))?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }

    // =========================================================================
    // Ledger Compound Operations
    // =========================================================================

    fn grant_purchased(
        &self,
        account_id: &AccountId,
        amount: i64,
        claim: &ProcessedTransaction,
        now: DateTime<Utc>,
    ) -> Result<GrantOutcome> {
        let _guard = self.lock()?;

        if self.effect_exists(&claim.key)? {
            return Ok(GrantOutcome::AlreadyProcessed);
        }

        let mut account = self.load_account(account_id)?;
        account.purchased_credits += amount;
        account.total_purchased_credits += amount;
        if account.tier == Tier::Free {
            account.tier = Tier::Starter;
        }
        account.updated_at = now;

        let cf_accounts = self.cf(cf::ACCOUNTS)?;
        let cf_effects = self.cf(cf::PROCESSED_EFFECTS)?;

        // The claim row and the balance change commit together: a crash
        // can lose the event, never double-apply it.
        let mut batch = WriteBatch::default();
        batch.put_cf(
            &cf_accounts,
            keys::account_key(account_id),
            Self::serialize(&account)?,
        );
        batch.put_cf(
            &cf_effects,
            keys::effect_key(&claim.key),
            Self::serialize(claim)?,
        );

        self.db
            .write(batch)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(GrantOutcome::Added(account))
    }

    fn consume_credit(&self, account_id: &AccountId, now: DateTime<Utc>) -> Result<ConsumeOutcome> {
        let _guard = self.lock()?;

        let mut account = self.load_account(account_id)?;
        let demoted = account.reconcile_expiry(now);

        if account.is_unlimited(now) {
            if demoted {
                self.put_account(&account)?;
            }
            return Ok(ConsumeOutcome {
                account,
                source: DebitSource::Unlimited,
            });
        }

        let source = if account.free_credits_remaining > 0 {
            account.free_credits_remaining -= 1;
            DebitSource::Free
        } else if account.purchased_credits > 0 {
            account.purchased_credits -= 1;
            DebitSource::Purchased
        } else {
            // Persist a lazy demotion even when the debit fails.
            if demoted {
                self.put_account(&account)?;
            }
            return Err(StoreError::InsufficientCredits {
                free: account.free_credits_remaining,
                purchased: account.purchased_credits,
            });
        };

        account.updated_at = now;
        self.put_account(&account)?;

        Ok(ConsumeOutcome { account, source })
    }

    // =========================================================================
    // Subscription Compound Operation
    // =========================================================================

    fn apply_subscription_transition(
        &self,
        account_id: &AccountId,
        update: &SubscriptionUpdate,
        claim: &ProcessedTransaction,
        metadata: serde_json::Value,
        now: DateTime<Utc>,
    ) -> Result<ApplyOutcome> {
        let _guard = self.lock()?;

        if self.effect_exists(&claim.key)? {
            return Ok(ApplyOutcome::Duplicate);
        }

        let mut account = self.load_account(account_id)?;
        let cf_effects = self.cf(cf::PROCESSED_EFFECTS)?;

        match account.apply_subscription(update, now) {
            TransitionOutcome::Ignored => {
                // Claim the key anyway so a redelivered stale event is a
                // duplicate next time, but write no audit row.
                self.db
                    .put_cf(&cf_effects, keys::effect_key(&claim.key), Self::serialize(claim)?)
                    .map_err(|e| StoreError::Database(e.to_string()))?;
                Ok(ApplyOutcome::Stale)
            }
            TransitionOutcome::Applied => {
                let audit = SubscriptionAuditEvent::new(
                    account.id,
                    update.kind,
                    update.subscription_id.clone(),
                    metadata,
                    now,
                );

                let cf_accounts = self.cf(cf::ACCOUNTS)?;
                let cf_events = self.cf(cf::SUBSCRIPTION_EVENTS)?;
                let cf_index = self.cf(cf::ACCOUNTS_BY_SUBSCRIPTION)?;

                let mut batch = WriteBatch::default();
                batch.put_cf(
                    &cf_accounts,
                    keys::account_key(account_id),
                    Self::serialize(&account)?,
                );
                batch.put_cf(
                    &cf_effects,
                    keys::effect_key(&claim.key),
                    Self::serialize(claim)?,
                );
                batch.put_cf(
                    &cf_events,
                    keys::subscription_event_key(&audit.id),
                    Self::serialize(&audit)?,
                );
                if let Some(subscription_id) = &account.subscription_id {
                    batch.put_cf(
                        &cf_index,
                        keys::subscription_index_key(subscription_id),
                        account_id.as_bytes(),
                    );
                }

                self.db
                    .write(batch)
                    .map_err(|e| StoreError::Database(e.to_string()))?;

                Ok(ApplyOutcome::Applied(account))
            }
        }
    }

    fn list_subscription_events(
        &self,
        account_id: &AccountId,
    ) -> Result<Vec<SubscriptionAuditEvent>> {
        let cf = self.cf(cf::SUBSCRIPTION_EVENTS)?;
        let mut events = Vec::new();

        // ULID keys iterate in chronological order.
        for item in self.db.iterator_cf(&cf, IteratorMode::Start) {
            let (_, value) = item.map_err(|e| StoreError::Database(e.to_string()))?;
            let event: SubscriptionAuditEvent = Self::deserialize(&value)?;
            if event.account_id == *account_id {
                events.push(event);
            }
        }

        Ok(events)
    }

    // =========================================================================
    // Usage Records
    // =========================================================================

    fn record_usage(
        &self,
        account_id: &AccountId,
        bounds: PeriodBounds,
        input_tokens: u64,
        output_tokens: u64,
        now: DateTime<Utc>,
    ) -> Result<UsageRecord> {
        let _guard = self.lock()?;

        let cf = self.cf(cf::USAGE_RECORDS)?;
        let key = keys::usage_record_key(bounds.start, account_id);

        let record = match self
            .db
            .get_cf(&cf, &key)
            .map_err(|e| StoreError::Database(e.to_string()))?
        {
            Some(data) => {
                let mut record: UsageRecord = Self::deserialize(&data)?;
                record.record(input_tokens, output_tokens, now);
                record
            }
            None => UsageRecord::first(*account_id, bounds, input_tokens, output_tokens, now),
        };

        self.db
            .put_cf(&cf, key, Self::serialize(&record)?)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(record)
    }

    fn get_usage(
        &self,
        account_id: &AccountId,
        period_start: DateTime<Utc>,
    ) -> Result<Option<UsageRecord>> {
        let cf = self.cf(cf::USAGE_RECORDS)?;
        let key = keys::usage_record_key(period_start, account_id);

        self.db
            .get_cf(&cf, key)
            .map_err(|e| StoreError::Database(e.to_string()))?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }

    fn list_usage_for_period(&self, period_start: DateTime<Utc>) -> Result<Vec<UsageRecord>> {
        let cf = self.cf(cf::USAGE_RECORDS)?;
        let prefix = keys::usage_period_prefix(period_start);

        let mut records = Vec::new();
        let iter = self.db.iterator_cf(
            &cf,
            IteratorMode::From(&prefix, rocksdb::Direction::Forward),
        );

        for item in iter {
            let (key, value) = item.map_err(|e| StoreError::Database(e.to_string()))?;
            if !key.starts_with(&prefix) {
                break;
            }
            records.push(Self::deserialize(&value)?);
        }

        Ok(records)
    }
}
