//! The reconciliation and admission engine.
//!
//! These components sit between "the payment provider told us something
//! happened" and "the account's entitlement fields reflect it, exactly
//! once". Each is a thin orchestrator over the store's atomic compound
//! operations: the store owns exclusivity, these own the domain flow.

pub mod admission;
pub mod ledger;
pub mod subscription;
pub mod usage;

pub use admission::{AdmissionController, AdmissionDecision, DenialReason};
pub use ledger::CreditLedger;
pub use subscription::SubscriptionLifecycle;
pub use usage::UsageAggregator;
