//! Effect keys and processed-transaction records.
//!
//! Both ingress channels (webhook push and browser-return callback) can
//! report the same real-world payment event. An [`EffectKey`] names that
//! event; a persisted [`ProcessedTransaction`] row under the key is the
//! proof that its effect was applied. Both channels must derive the
//! identical key from the provider payload.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::subscription::SubscriptionEventKind;

/// The kind of account mutation an effect performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectKind {
    /// One-time purchase credit grant.
    CreditGrant,

    /// Subscription lifecycle transition.
    SubscriptionEvent,
}

impl EffectKind {
    /// Stable name used in the encoded key.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CreditGrant => "credit-grant",
            Self::SubscriptionEvent => "subscription-event",
        }
    }
}

/// Uniquely names one real-world payment event.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EffectKey {
    /// What kind of mutation the event authorizes.
    pub kind: EffectKind,

    /// Provider-side reference: the order ID for a grant, or
    /// `<subscription_id>:<event>` for a lifecycle transition.
    pub provider_ref: String,
}

impl EffectKey {
    /// Key for a one-time purchase, from the provider's order ID.
    #[must_use]
    pub fn credit_grant(order_id: impl Into<String>) -> Self {
        Self {
            kind: EffectKind::CreditGrant,
            provider_ref: order_id.into(),
        }
    }

    /// Key for a subscription lifecycle transition.
    ///
    /// The provider does not guarantee a stable per-event ID for every
    /// event type, so the key is the subscription ID plus the event kind.
    #[must_use]
    pub fn subscription_event(subscription_id: &str, kind: SubscriptionEventKind) -> Self {
        Self {
            kind: EffectKind::SubscriptionEvent,
            provider_ref: format!("{subscription_id}:{kind}"),
        }
    }

    /// Encoded form used as the storage key.
    #[must_use]
    pub fn encode(&self) -> String {
        format!("{}:{}", self.kind.as_str(), self.provider_ref)
    }
}

impl fmt::Display for EffectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

/// Proof that an effect was applied, persisted under its key.
///
/// Rows are created once inside the claiming critical section and never
/// mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessedTransaction {
    /// The effect key this row claims.
    pub key: EffectKey,

    /// Snapshot of what was applied (amount granted, transition, ...).
    pub outcome: serde_json::Value,

    /// When the claim was persisted.
    pub applied_at: DateTime<Utc>,
}

impl ProcessedTransaction {
    /// Build a claim record for an effect.
    #[must_use]
    pub fn new(key: EffectKey, outcome: serde_json::Value, applied_at: DateTime<Utc>) -> Self {
        Self {
            key,
            outcome,
            applied_at,
        }
    }
}
