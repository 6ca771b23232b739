//! Payment provider API types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A one-time purchase order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    /// Provider order ID.
    pub id: String,

    /// Order status (`CREATED`, `APPROVED`, `COMPLETED`, ...).
    pub status: String,

    /// Approval URL the buyer is redirected to, when present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approve_url: Option<String>,

    /// Amount in cents.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount_cents: Option<i64>,

    /// Our reference (account ID) echoed back by the provider.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_id: Option<String>,
}

impl Order {
    /// Whether the order was captured.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.status.eq_ignore_ascii_case("COMPLETED")
    }
}

/// A recurring subscription.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    /// Provider subscription ID.
    pub id: String,

    /// Subscription status (`APPROVAL_PENDING`, `ACTIVE`, `CANCELLED`,
    /// `SUSPENDED`, `EXPIRED`).
    pub status: String,

    /// The plan the subscription is on.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan_id: Option<String>,

    /// Approval URL the subscriber is redirected to, when present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approve_url: Option<String>,

    /// Start of the current billing cycle.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_period_start: Option<DateTime<Utc>>,

    /// Next billing time; doubles as the current cycle's end.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_billing_time: Option<DateTime<Utc>>,
}

impl Subscription {
    /// Whether the provider reports the subscription as active.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status.eq_ignore_ascii_case("ACTIVE")
    }
}

/// Provider error envelope.
#[derive(Debug, Deserialize)]
pub struct ProviderErrorResponse {
    /// Machine-readable error name.
    pub name: String,

    /// Human-readable message.
    #[serde(default)]
    pub message: String,
}
