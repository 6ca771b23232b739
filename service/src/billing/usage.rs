//! Usage aggregation and reporting rollups.
//!
//! One record per account per calendar month, updated in place. The
//! rollups are eventually-consistent reporting views with no
//! transactional coupling to the ledger.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use palette_billing_core::{AccountId, PeriodBounds, SystemUsage, UsageRecord};
use palette_billing_store::{Result, RocksStore, Store};

/// Records generation usage and serves reporting rollups.
#[derive(Clone)]
pub struct UsageAggregator {
    store: Arc<RocksStore>,
}

impl UsageAggregator {
    /// Create an aggregator over the store.
    #[must_use]
    pub fn new(store: Arc<RocksStore>) -> Self {
        Self { store }
    }

    /// Record one successful generation.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn record(
        &self,
        account_id: &AccountId,
        input_tokens: u64,
        output_tokens: u64,
        now: DateTime<Utc>,
    ) -> Result<UsageRecord> {
        let bounds = PeriodBounds::calendar_month(now);
        let record = self
            .store
            .record_usage(account_id, bounds, input_tokens, output_tokens, now)?;

        tracing::debug!(
            account_id = %account_id,
            period_start = %record.period_start,
            prompt_count = %record.prompt_count,
            "Usage recorded"
        );

        Ok(record)
    }

    /// One account's record for the period containing `now`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn account_usage(
        &self,
        account_id: &AccountId,
        now: DateTime<Utc>,
    ) -> Result<Option<UsageRecord>> {
        let bounds = PeriodBounds::calendar_month(now);
        self.store.get_usage(account_id, bounds.start)
    }

    /// System-wide rollup for the period containing `now`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn system_wide(&self, now: DateTime<Utc>) -> Result<SystemUsage> {
        let bounds = PeriodBounds::calendar_month(now);
        let records = self.store.list_usage_for_period(bounds.start)?;
        Ok(SystemUsage::aggregate(&records))
    }

    /// The `n` heaviest accounts this period, by prompt count.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn top_accounts(&self, n: usize, now: DateTime<Utc>) -> Result<Vec<UsageRecord>> {
        let bounds = PeriodBounds::calendar_month(now);
        let mut records = self.store.list_usage_for_period(bounds.start)?;
        records.sort_by(|a, b| b.prompt_count.cmp(&a.prompt_count));
        records.truncate(n);
        Ok(records)
    }
}
