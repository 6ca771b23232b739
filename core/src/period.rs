//! Billing-period math.
//!
//! Usage records roll over per calendar month. The bounds are a pure
//! function of `now` so callers (and tests) control the clock.

use chrono::{DateTime, Datelike, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Half-open bounds of one billing period: `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodBounds {
    /// Inclusive start.
    pub start: DateTime<Utc>,

    /// Exclusive end (start of the next period).
    pub end: DateTime<Utc>,
}

impl PeriodBounds {
    /// The UTC calendar month containing `now`.
    ///
    /// # Panics
    ///
    /// Never panics for valid `DateTime<Utc>` inputs; the first of a
    /// month always exists.
    #[must_use]
    pub fn calendar_month(now: DateTime<Utc>) -> Self {
        let start = Utc
            .with_ymd_and_hms(now.year(), now.month(), 1, 0, 0, 0)
            .unwrap();
        let (next_year, next_month) = if now.month() == 12 {
            (now.year() + 1, 1)
        } else {
            (now.year(), now.month() + 1)
        };
        let end = Utc
            .with_ymd_and_hms(next_year, next_month, 1, 0, 0, 0)
            .unwrap();
        Self { start, end }
    }

    /// Whether an instant falls inside this period.
    #[must_use]
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant < self.end
    }
}
