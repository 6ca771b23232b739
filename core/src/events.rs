//! Subscription audit events.
//!
//! Append-only log of applied lifecycle transitions. Core logic never
//! reads these rows back; they exist for external reporting.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::subscription::SubscriptionEventKind;
use crate::{AccountId, EventId};

/// One applied subscription transition, written once and never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionAuditEvent {
    /// Time-ordered event ID.
    pub id: EventId,

    /// The account the transition was applied to.
    pub account_id: AccountId,

    /// Which transition was applied.
    pub event_type: SubscriptionEventKind,

    /// Provider subscription ID the event referred to.
    pub external_subscription_id: String,

    /// Opaque snapshot of the provider payload.
    pub metadata: serde_json::Value,

    /// When the transition was applied.
    pub created_at: DateTime<Utc>,
}

impl SubscriptionAuditEvent {
    /// Build an audit row for an applied transition.
    #[must_use]
    pub fn new(
        account_id: AccountId,
        event_type: SubscriptionEventKind,
        external_subscription_id: impl Into<String>,
        metadata: serde_json::Value,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: EventId::generate(),
            account_id,
            event_type,
            external_subscription_id: external_subscription_id.into(),
            metadata,
            created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn audit_rows_get_distinct_ids() {
        let now = Utc.with_ymd_and_hms(2025, 3, 2, 0, 0, 0).unwrap();
        let account_id = AccountId::generate();
        let a = SubscriptionAuditEvent::new(
            account_id,
            SubscriptionEventKind::Activated,
            "I-100",
            serde_json::Value::Null,
            now,
        );
        let b = SubscriptionAuditEvent::new(
            account_id,
            SubscriptionEventKind::Cancelled,
            "I-100",
            serde_json::Value::Null,
            now,
        );
        assert_ne!(a.id, b.id);
    }
}
