//! Admission control for generation requests.
//!
//! `can_generate` is the cheap read-only pre-check callers use before
//! spending money on the generation backend; the ledger's `consume` is
//! the atomic gate. A caller that passes the pre-check can still lose
//! the consume race; that late denial is expected and bounded.

use chrono::{DateTime, Utc};
use serde::Serialize;

use palette_billing_core::AccountId;
use palette_billing_store::Result;

use super::ledger::CreditLedger;

/// Why admission was denied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DenialReason {
    /// No free or purchased credits left.
    NoCredits,
}

/// Outcome of the admission pre-check.
#[derive(Debug, Clone, Serialize)]
pub struct AdmissionDecision {
    /// Whether a generation would currently be admitted.
    pub allowed: bool,

    /// Set when `allowed` is false.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<DenialReason>,
}

/// Read-only admission checks over the credit ledger.
#[derive(Clone)]
pub struct AdmissionController {
    ledger: CreditLedger,
}

impl AdmissionController {
    /// Create a controller over the ledger.
    #[must_use]
    pub fn new(ledger: CreditLedger) -> Self {
        Self { ledger }
    }

    /// May this account generate right now?
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the account doesn't exist.
    pub fn can_generate(
        &self,
        account_id: &AccountId,
        now: DateTime<Utc>,
    ) -> Result<AdmissionDecision> {
        let balance = self.ledger.balance(account_id, now)?;

        if balance.can_generate() {
            Ok(AdmissionDecision {
                allowed: true,
                reason: None,
            })
        } else {
            Ok(AdmissionDecision {
                allowed: false,
                reason: Some(DenialReason::NoCredits),
            })
        }
    }
}
