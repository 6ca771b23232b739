//! Account provisioning handlers.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use palette_billing_core::Account;
use palette_billing_store::Store;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;

/// Account creation request.
#[derive(Debug, Deserialize)]
pub struct CreateAccountRequest {
    /// Email to provision the account with.
    pub email: String,
}

/// Account response.
#[derive(Debug, Serialize)]
pub struct AccountResponse {
    /// Account ID.
    pub id: String,
    /// Email.
    pub email: String,
    /// Whether the account is an admin.
    pub is_admin: bool,
    /// Current tier.
    pub tier: String,
    /// Free credits remaining.
    pub free_credits_remaining: i64,
    /// Purchased credits.
    pub purchased_credits: i64,
    /// Lifetime purchased credits.
    pub total_purchased_credits: i64,
    /// Subscription status.
    pub subscription_status: String,
    /// Provider subscription ID, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscription_id: Option<String>,
    /// True when the subscription ends at the period boundary.
    pub cancel_at_period_end: bool,
    /// End of the current billing period.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_period_end: Option<String>,
}

impl From<&Account> for AccountResponse {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id.to_string(),
            email: account.email.clone(),
            is_admin: account.is_admin,
            tier: format!("{:?}", account.tier).to_lowercase(),
            free_credits_remaining: account.free_credits_remaining,
            purchased_credits: account.purchased_credits,
            total_purchased_credits: account.total_purchased_credits,
            subscription_status: format!("{:?}", account.subscription_status).to_lowercase(),
            subscription_id: account.subscription_id.clone(),
            cancel_at_period_end: account.cancel_at_period_end,
            current_period_end: account.current_period_end.map(|t| t.to_rfc3339()),
        }
    }
}

/// Create the caller's account.
///
/// Provisioning is idempotent: a repeated call returns the existing
/// account untouched (free credits are granted exactly once).
pub async fn create_account(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(body): Json<CreateAccountRequest>,
) -> Result<Json<AccountResponse>, ApiError> {
    if let Some(existing) = state.store.get_account(&auth.account_id)? {
        return Ok(Json(AccountResponse::from(&existing)));
    }

    if body.email.is_empty() || !body.email.contains('@') {
        return Err(ApiError::BadRequest("Invalid email".into()));
    }

    let policy = state.config.provisioning_policy();
    let account = Account::provision(auth.account_id, body.email, &policy, Utc::now());
    state.store.put_account(&account)?;

    tracing::info!(
        account_id = %account.id,
        is_admin = %account.is_admin,
        free_credits = %account.free_credits_remaining,
        "Account provisioned"
    );

    Ok(Json(AccountResponse::from(&account)))
}

/// Get the caller's account.
pub async fn get_account(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<AccountResponse>, ApiError> {
    let account = state
        .store
        .get_account(&auth.account_id)?
        .ok_or_else(|| ApiError::NotFound("Account not found".into()))?;

    Ok(Json(AccountResponse::from(&account)))
}
