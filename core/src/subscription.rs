//! Subscription lifecycle transitions.
//!
//! Provider notifications arrive over two channels, in any order, any
//! number of times. The transition function here is written so that the
//! same set of events converges to the same account state regardless of
//! arrival order; deduplication of redelivered events is the caller's
//! job (effect claims), convergence is this module's.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::account::{Account, SubscriptionStatus, Tier};

/// Provider-reported subscription lifecycle events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionEventKind {
    /// Subscription approved and active.
    Activated,

    /// Cancelled; runs until period end.
    Cancelled,

    /// Suspended by the provider (payment problem).
    Suspended,

    /// Subscription ended.
    Expired,
}

impl SubscriptionEventKind {
    /// Stable lowercase name, used in effect keys and audit rows.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Activated => "activated",
            Self::Cancelled => "cancelled",
            Self::Suspended => "suspended",
            Self::Expired => "expired",
        }
    }
}

impl fmt::Display for SubscriptionEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One lifecycle transition, normalized from a provider payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionUpdate {
    /// Event kind.
    pub kind: SubscriptionEventKind,

    /// Provider subscription ID the event refers to.
    pub subscription_id: String,

    /// Billing period start, when the provider supplies it.
    pub period_start: Option<DateTime<Utc>>,

    /// Billing period end, when the provider supplies it.
    pub period_end: Option<DateTime<Utc>>,
}

/// What applying a transition did to the account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionOutcome {
    /// The account was mutated.
    Applied,

    /// The event was stale or superseded; the account is unchanged.
    Ignored,
}

impl Account {
    /// Apply a provider subscription transition.
    ///
    /// Transition rules:
    /// - `Activated` with a new subscription ID is a full activation.
    /// - `Activated` with the already-bound ID while `Cancelled` is
    ///   absorbed: pro entitlement and period bounds refresh, the
    ///   cancelled status and flags stay, so `{activated, cancelled}`
    ///   commutes. While `Suspended` it is a reinstatement; while
    ///   `Expired` it is ignored.
    /// - `Cancelled` keeps the tier (access until period end) and sets
    ///   `cancel_at_period_end`.
    /// - `Suspended` / `Expired` downgrade immediately.
    /// - Events for a superseded subscription ID are ignored.
    pub fn apply_subscription(
        &mut self,
        update: &SubscriptionUpdate,
        now: DateTime<Utc>,
    ) -> TransitionOutcome {
        let same_id = self.subscription_id.as_deref() == Some(update.subscription_id.as_str());

        match update.kind {
            SubscriptionEventKind::Activated => {
                if same_id && self.subscription_status == SubscriptionStatus::Expired {
                    return TransitionOutcome::Ignored;
                }
                if same_id && self.subscription_status == SubscriptionStatus::Cancelled {
                    // Cancellation already recorded; restore entitlement
                    // until period end without resurrecting the subscription.
                    self.tier = Tier::Pro;
                    self.set_period_bounds(update);
                    self.updated_at = now;
                    return TransitionOutcome::Applied;
                }

                self.subscription_id = Some(update.subscription_id.clone());
                self.subscription_status = SubscriptionStatus::Active;
                self.tier = Tier::Pro;
                self.set_period_bounds(update);
                self.cancel_at_period_end = false;
                self.cancelled_at = None;
                self.updated_at = now;
                TransitionOutcome::Applied
            }
            SubscriptionEventKind::Cancelled => {
                if self.subscription_id.is_some() && !same_id {
                    return TransitionOutcome::Ignored;
                }
                if self.subscription_id.is_none() {
                    self.subscription_id = Some(update.subscription_id.clone());
                }
                self.subscription_status = SubscriptionStatus::Cancelled;
                self.cancelled_at = Some(now);
                self.cancel_at_period_end = true;
                self.updated_at = now;
                TransitionOutcome::Applied
            }
            SubscriptionEventKind::Suspended | SubscriptionEventKind::Expired => {
                if self.subscription_id.is_some() && !same_id {
                    return TransitionOutcome::Ignored;
                }
                if self.subscription_id.is_none() {
                    self.subscription_id = Some(update.subscription_id.clone());
                }
                self.subscription_status = match update.kind {
                    SubscriptionEventKind::Suspended => SubscriptionStatus::Suspended,
                    _ => SubscriptionStatus::Expired,
                };
                self.tier = self.downgraded_tier();
                self.updated_at = now;
                TransitionOutcome::Applied
            }
        }
    }

    fn set_period_bounds(&mut self, update: &SubscriptionUpdate) {
        if update.period_start.is_some() {
            self.current_period_start = update.period_start;
        }
        if update.period_end.is_some() {
            self.current_period_end = update.period_end;
        }
    }
}
