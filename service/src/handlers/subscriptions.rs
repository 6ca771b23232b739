//! Subscription handlers.
//!
//! The activate endpoint is the synchronous twin of the subscription
//! webhooks: it is driven by the user's own return from the provider's
//! approval page, which is the only channel that works when webhooks
//! cannot reach the deployment. It targets the same state machine and
//! the same effect-key space, so whichever channel lands first wins.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use palette_billing_core::{SubscriptionEventKind, SubscriptionUpdate};
use palette_billing_store::Store;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::handlers::accounts::AccountResponse;
use crate::state::AppState;

/// Subscription creation response.
#[derive(Debug, Serialize)]
pub struct CreateSubscriptionResponse {
    /// Provider subscription ID.
    pub subscription_id: String,
    /// URL the subscriber approves the subscription at.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approve_url: Option<String>,
    /// Local status after binding.
    pub status: String,
}

/// Create a Pro subscription and bind it to the caller's account.
pub async fn create_subscription(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<CreateSubscriptionResponse>, ApiError> {
    state
        .store
        .get_account(&auth.account_id)?
        .ok_or_else(|| ApiError::NotFound("Account not found".into()))?;

    let provider = state.provider()?;
    let return_url = format!("{}/billing/subscribed", state.config.frontend_url);
    let cancel_url = format!("{}/billing/cancelled", state.config.frontend_url);

    let subscription = provider
        .create_subscription(
            &state.config.provider_pro_plan_id,
            &auth.account_id.to_string(),
            &return_url,
            &cancel_url,
        )
        .await
        .map_err(|e| ApiError::ExternalService(e.to_string()))?;

    state
        .subscriptions
        .bind(&auth.account_id, &subscription.id, Utc::now())?;

    Ok(Json(CreateSubscriptionResponse {
        subscription_id: subscription.id,
        approve_url: subscription.approve_url,
        status: "pending".to_string(),
    }))
}

/// Activation request from the browser-return callback.
#[derive(Debug, Deserialize)]
pub struct ActivateSubscriptionRequest {
    /// The subscription the user just approved.
    pub subscription_id: String,
}

/// Activation response.
#[derive(Debug, Serialize)]
pub struct ActivateSubscriptionResponse {
    /// Whether activation is reflected on the account (either applied
    /// now or already applied by the webhook).
    pub activated: bool,
    /// The provider-side status at the time of the check.
    pub provider_status: String,
    /// The account after reconciliation.
    pub account: AccountResponse,
}

/// Synchronously activate a subscription after provider approval.
pub async fn activate_subscription(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(body): Json<ActivateSubscriptionRequest>,
) -> Result<Json<ActivateSubscriptionResponse>, ApiError> {
    let account = state
        .store
        .get_account(&auth.account_id)?
        .ok_or_else(|| ApiError::NotFound("Account not found".into()))?;

    // Only the account the subscription was bound to may activate it.
    if account.subscription_id.as_deref() != Some(body.subscription_id.as_str()) {
        return Err(ApiError::Forbidden);
    }

    let provider = state.provider()?;
    let subscription = provider
        .get_subscription(&body.subscription_id)
        .await
        .map_err(|e| ApiError::ExternalService(e.to_string()))?;

    if !subscription.is_active() {
        return Ok(Json(ActivateSubscriptionResponse {
            activated: false,
            provider_status: subscription.status,
            account: AccountResponse::from(&account),
        }));
    }

    let now = Utc::now();
    let update = SubscriptionUpdate {
        kind: SubscriptionEventKind::Activated,
        subscription_id: body.subscription_id.clone(),
        period_start: subscription.current_period_start,
        period_end: subscription.next_billing_time,
    };

    // Duplicate means the webhook got here first; that is still success.
    state.subscriptions.apply(
        &auth.account_id,
        &update,
        serde_json::json!({ "channel": "return-callback" }),
        now,
    )?;

    let account = state
        .store
        .get_account(&auth.account_id)?
        .ok_or_else(|| ApiError::NotFound("Account not found".into()))?;

    Ok(Json(ActivateSubscriptionResponse {
        activated: true,
        provider_status: subscription.status,
        account: AccountResponse::from(&account),
    }))
}

/// Cancellation response.
#[derive(Debug, Serialize)]
pub struct CancelSubscriptionResponse {
    /// The account after cancellation was applied.
    pub account: AccountResponse,
}

/// Cancel the caller's subscription.
///
/// Cancels at the provider, then applies the transition locally through
/// the same effect-key space the webhook uses, so the provider's own
/// cancellation notification is absorbed as a duplicate.
pub async fn cancel_subscription(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<CancelSubscriptionResponse>, ApiError> {
    let account = state
        .store
        .get_account(&auth.account_id)?
        .ok_or_else(|| ApiError::NotFound("Account not found".into()))?;

    let subscription_id = account
        .subscription_id
        .clone()
        .ok_or_else(|| ApiError::Conflict("No subscription to cancel".into()))?;

    let provider = state.provider()?;
    provider
        .cancel_subscription(&subscription_id, "user requested cancellation")
        .await
        .map_err(|e| ApiError::ExternalService(e.to_string()))?;

    let update = SubscriptionUpdate {
        kind: SubscriptionEventKind::Cancelled,
        subscription_id,
        period_start: None,
        period_end: None,
    };
    state.subscriptions.apply(
        &auth.account_id,
        &update,
        serde_json::json!({ "channel": "user-cancel" }),
        Utc::now(),
    )?;

    let account = state
        .store
        .get_account(&auth.account_id)?
        .ok_or_else(|| ApiError::NotFound("Account not found".into()))?;

    Ok(Json(CancelSubscriptionResponse {
        account: AccountResponse::from(&account),
    }))
}
