//! Usage records and reporting rollups.
//!
//! One record per account per billing period, created lazily on first
//! use and updated in place. Old periods are left intact for history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::period::PeriodBounds;
use crate::AccountId;

/// Per-account usage within one billing period.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageRecord {
    /// The account this record belongs to.
    pub account_id: AccountId,

    /// Period start (part of the storage key).
    pub period_start: DateTime<Utc>,

    /// Period end.
    pub period_end: DateTime<Utc>,

    /// Successful generations this period.
    pub prompt_count: u64,

    /// Input tokens consumed this period.
    pub input_tokens: u64,

    /// Output tokens produced this period.
    pub output_tokens: u64,

    /// When the most recent generation happened.
    pub last_prompt_at: DateTime<Utc>,
}

impl UsageRecord {
    /// Start a record for an account's first generation in a period.
    #[must_use]
    pub fn first(
        account_id: AccountId,
        bounds: PeriodBounds,
        input_tokens: u64,
        output_tokens: u64,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            account_id,
            period_start: bounds.start,
            period_end: bounds.end,
            prompt_count: 1,
            input_tokens,
            output_tokens,
            last_prompt_at: now,
        }
    }

    /// Fold one more generation into the record.
    pub fn record(&mut self, input_tokens: u64, output_tokens: u64, now: DateTime<Utc>) {
        self.prompt_count += 1;
        self.input_tokens += input_tokens;
        self.output_tokens += output_tokens;
        self.last_prompt_at = now;
    }
}

/// System-wide rollup over one period's usage records.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SystemUsage {
    /// Accounts with at least one generation this period.
    pub active_accounts: u64,

    /// Total generations.
    pub total_prompts: u64,

    /// Total input tokens.
    pub total_input_tokens: u64,

    /// Total output tokens.
    pub total_output_tokens: u64,
}

impl SystemUsage {
    /// Aggregate a set of period records.
    #[must_use]
    pub fn aggregate(records: &[UsageRecord]) -> Self {
        let mut rollup = Self::default();
        for record in records {
            rollup.active_accounts += 1;
            rollup.total_prompts += record.prompt_count;
            rollup.total_input_tokens += record.input_tokens;
            rollup.total_output_tokens += record.output_tokens;
        }
        rollup
    }
}
