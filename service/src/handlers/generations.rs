//! Generation admission handlers.
//!
//! The check endpoint is a fast, read-only pre-check so the frontend can
//! reject before the expensive generation call; the consume endpoint is
//! the atomic debit. Callers check, generate, then consume.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use chrono::Utc;
use serde::Serialize;

use palette_billing_store::DebitSource;

use crate::billing::DenialReason;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::handlers::credits::BalanceResponse;
use crate::state::AppState;

/// Admission check response.
#[derive(Debug, Serialize)]
pub struct CheckResponse {
    /// Whether a generation would currently be admitted.
    pub allowed: bool,
    /// Denial reason, when not allowed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Balance snapshot for display.
    pub balance: BalanceResponse,
}

/// May this account generate now? Read-only.
pub async fn check(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<CheckResponse>, ApiError> {
    let now = Utc::now();
    let decision = state.admission.can_generate(&auth.account_id, now)?;
    let balance = state.ledger.balance(&auth.account_id, now)?;

    Ok(Json(CheckResponse {
        allowed: decision.allowed,
        reason: decision.reason.map(|r| {
            match r {
                DenialReason::NoCredits => "no_credits",
            }
            .to_string()
        }),
        balance: BalanceResponse::from(balance),
    }))
}

/// Consume response.
#[derive(Debug, Serialize)]
pub struct ConsumeResponse {
    /// Always true on a 200; denials surface as 402.
    pub consumed: bool,
    /// Which balance was debited: "unlimited", "free" or "purchased".
    pub source: String,
    /// Balance after the debit.
    pub balance: BalanceResponse,
}

/// Atomically debit one credit for a generation.
pub async fn consume(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<ConsumeResponse>, ApiError> {
    let now = Utc::now();
    let outcome = state.ledger.consume(&auth.account_id, now)?;

    let source = match outcome.source {
        DebitSource::Unlimited => "unlimited",
        DebitSource::Free => "free",
        DebitSource::Purchased => "purchased",
    };

    Ok(Json(ConsumeResponse {
        consumed: true,
        source: source.to_string(),
        balance: BalanceResponse::from(outcome.account.balance(now)),
    }))
}
