//! Account types for palette-billing.
//!
//! This module defines the account structure: credit balances, the
//! subscription lifecycle fields, and the provisioning policy applied at
//! account creation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::AccountId;

// ============================================================================
// Constants
// ============================================================================

/// Free credits granted once at account creation.
pub const DEFAULT_INITIAL_FREE_CREDITS: i64 = 3;

/// Small credit pack size.
pub const SMALL_PACK_CREDITS: i64 = 10;

/// Small credit pack price in cents ($5).
pub const SMALL_PACK_PRICE_CENTS: i64 = 500;

/// Large credit pack size.
pub const LARGE_PACK_CREDITS: i64 = 25;

/// Large credit pack price in cents ($10).
pub const LARGE_PACK_PRICE_CENTS: i64 = 1000;

/// Pro subscription monthly price in cents ($12).
pub const PRO_PLAN_PRICE_CENTS: i64 = 1200;

/// Policy inputs applied when an account is provisioned.
///
/// The admin allowlist is a configuration-time input, not a runtime
/// global: callers pass it explicitly into [`Account::provision`].
#[derive(Debug, Clone)]
pub struct ProvisioningPolicy {
    /// Free credits granted to a new account.
    pub initial_free_credits: i64,

    /// Emails that receive the admin flag at creation.
    pub admin_emails: Vec<String>,
}

impl ProvisioningPolicy {
    /// Check whether an email is on the admin allowlist.
    #[must_use]
    pub fn is_admin(&self, email: &str) -> bool {
        self.admin_emails
            .iter()
            .any(|e| e.eq_ignore_ascii_case(email))
    }
}

impl Default for ProvisioningPolicy {
    fn default() -> Self {
        Self {
            initial_free_credits: DEFAULT_INITIAL_FREE_CREDITS,
            admin_emails: Vec::new(),
        }
    }
}

/// A billing account for one user.
///
/// The account tracks free and purchased credit balances plus the
/// subscription lifecycle fields reported by the payment provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    /// The account ID.
    pub id: AccountId,

    /// Email the account was provisioned with.
    pub email: String,

    /// Whether the account was provisioned as an admin.
    pub is_admin: bool,

    /// Current tier.
    pub tier: Tier,

    /// Free credits remaining. Granted once at creation, never replenished.
    pub free_credits_remaining: i64,

    /// Usable purchased credit balance.
    pub purchased_credits: i64,

    /// Lifetime purchased credits. Monotone, never decremented.
    pub total_purchased_credits: i64,

    /// Provider-issued subscription ID, if the account ever subscribed.
    pub subscription_id: Option<String>,

    /// Current subscription lifecycle status.
    pub subscription_status: SubscriptionStatus,

    /// Start of the current billing period.
    pub current_period_start: Option<DateTime<Utc>>,

    /// End of the current billing period.
    pub current_period_end: Option<DateTime<Utc>>,

    /// True when the subscription runs until `current_period_end` and
    /// then reverts to a non-pro tier.
    pub cancel_at_period_end: bool,

    /// When cancellation was received.
    pub cancelled_at: Option<DateTime<Utc>>,

    /// When the account was created.
    pub created_at: DateTime<Utc>,

    /// When the account was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Provision a new account under the given policy.
    #[must_use]
    pub fn provision(
        id: AccountId,
        email: impl Into<String>,
        policy: &ProvisioningPolicy,
        now: DateTime<Utc>,
    ) -> Self {
        let email = email.into();
        let is_admin = policy.is_admin(&email);
        Self {
            id,
            email,
            is_admin,
            tier: Tier::Free,
            free_credits_remaining: policy.initial_free_credits,
            purchased_credits: 0,
            total_purchased_credits: 0,
            subscription_id: None,
            subscription_status: SubscriptionStatus::None,
            current_period_start: None,
            current_period_end: None,
            cancel_at_period_end: false,
            cancelled_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether the account has unlimited generation at `now`.
    ///
    /// Pro entitlement holds while the subscription is active or pending,
    /// and for a cancelled subscription until the current period ends.
    #[must_use]
    pub fn is_unlimited(&self, now: DateTime<Utc>) -> bool {
        match self.subscription_status {
            SubscriptionStatus::Active | SubscriptionStatus::Pending => true,
            SubscriptionStatus::Cancelled => {
                self.tier == Tier::Pro
                    && self.cancel_at_period_end
                    && self.current_period_end.is_some_and(|end| now < end)
            }
            _ => false,
        }
    }

    /// Total consumable credits (free plus purchased).
    #[must_use]
    pub const fn consumable_credits(&self) -> i64 {
        self.free_credits_remaining + self.purchased_credits
    }

    /// Point-in-time balance snapshot.
    #[must_use]
    pub fn balance(&self, now: DateTime<Utc>) -> Balance {
        Balance {
            free_credits_remaining: self.free_credits_remaining,
            purchased_credits: self.purchased_credits,
            total_purchased_credits: self.total_purchased_credits,
            is_unlimited: self.is_unlimited(now),
        }
    }

    /// The tier this account falls back to when pro entitlement ends.
    #[must_use]
    pub const fn downgraded_tier(&self) -> Tier {
        if self.total_purchased_credits > 0 {
            Tier::Starter
        } else {
            Tier::Free
        }
    }

    /// Demote a cancelled account whose paid period has elapsed.
    ///
    /// Returns true if the account was mutated. Callers that persist the
    /// account must do so when this returns true.
    pub fn reconcile_expiry(&mut self, now: DateTime<Utc>) -> bool {
        if self.subscription_status == SubscriptionStatus::Cancelled
            && self.cancel_at_period_end
            && self.current_period_end.is_some_and(|end| end <= now)
        {
            self.subscription_status = SubscriptionStatus::Expired;
            self.tier = self.downgraded_tier();
            self.updated_at = now;
            return true;
        }
        false
    }
}

/// Point-in-time credit balance for an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    /// Free credits remaining.
    pub free_credits_remaining: i64,

    /// Purchased credits remaining.
    pub purchased_credits: i64,

    /// Lifetime purchased credits.
    pub total_purchased_credits: i64,

    /// Whether generation is unlimited (pro entitlement).
    pub is_unlimited: bool,
}

impl Balance {
    /// Whether a generation would be admitted against this balance.
    #[must_use]
    pub const fn can_generate(&self) -> bool {
        self.is_unlimited || self.free_credits_remaining + self.purchased_credits > 0
    }
}

/// Account tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    /// Never paid: initial free credits only.
    Free,

    /// Has purchased credit packs; same ledger shape as free.
    Starter,

    /// Active subscription: unlimited generation.
    Pro,
}

/// Subscription lifecycle status as reported by the payment provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    /// No subscription was ever attached.
    None,

    /// Subscription created, provider approval not yet confirmed.
    Pending,

    /// Subscription is active.
    Active,

    /// Cancelled; access runs until the period end.
    Cancelled,

    /// Provider suspended the subscription (payment problem).
    Suspended,

    /// Subscription ended.
    Expired,
}
