//! Credit balance and one-time purchase handlers.
//!
//! The capture endpoint is the synchronous half of the dual ingress:
//! the buyer's browser returns from the provider's approval page and we
//! capture-then-grant right here, racing the webhook for the same order.
//! The shared effect key makes the race harmless.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use palette_billing_core::{
    Balance, EffectKey, LARGE_PACK_CREDITS, LARGE_PACK_PRICE_CENTS, SMALL_PACK_CREDITS,
    SMALL_PACK_PRICE_CENTS,
};
use palette_billing_store::Store;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;

/// Balance response.
#[derive(Debug, Serialize)]
pub struct BalanceResponse {
    /// Free credits remaining.
    pub free_credits_remaining: i64,
    /// Purchased credits remaining.
    pub purchased_credits: i64,
    /// Lifetime purchased credits.
    pub total_purchased_credits: i64,
    /// Whether generation is unlimited.
    pub is_unlimited: bool,
}

impl From<Balance> for BalanceResponse {
    fn from(balance: Balance) -> Self {
        Self {
            free_credits_remaining: balance.free_credits_remaining,
            purchased_credits: balance.purchased_credits,
            total_purchased_credits: balance.total_purchased_credits,
            is_unlimited: balance.is_unlimited,
        }
    }
}

/// Get current credit balance.
pub async fn get_balance(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<BalanceResponse>, ApiError> {
    let balance = state.ledger.balance(&auth.account_id, Utc::now())?;
    Ok(Json(BalanceResponse::from(balance)))
}

/// Available credit packs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CreditPack {
    /// Small pack.
    Small,
    /// Large pack.
    Large,
}

impl CreditPack {
    const fn credits(self) -> i64 {
        match self {
            Self::Small => SMALL_PACK_CREDITS,
            Self::Large => LARGE_PACK_CREDITS,
        }
    }

    const fn price_cents(self) -> i64 {
        match self {
            Self::Small => SMALL_PACK_PRICE_CENTS,
            Self::Large => LARGE_PACK_PRICE_CENTS,
        }
    }
}

/// Map a captured amount back to a pack's credit count.
///
/// Both ingress paths use this, so a webhook and a callback for the
/// same order always grant the same amount.
pub(crate) fn credits_for_amount(amount_cents: i64) -> Option<i64> {
    match amount_cents {
        SMALL_PACK_PRICE_CENTS => Some(SMALL_PACK_CREDITS),
        LARGE_PACK_PRICE_CENTS => Some(LARGE_PACK_CREDITS),
        _ => None,
    }
}

/// Order creation request.
#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    /// Which pack to buy.
    pub pack: CreditPack,
}

/// Order creation response.
#[derive(Debug, Serialize)]
pub struct CreateOrderResponse {
    /// Provider order ID.
    pub order_id: String,
    /// URL the buyer approves the payment at.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approve_url: Option<String>,
    /// Credits the pack grants once captured.
    pub credits: i64,
    /// Price in cents.
    pub amount_cents: i64,
}

/// Create a one-time order for a credit pack.
pub async fn create_order(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(body): Json<CreateOrderRequest>,
) -> Result<Json<CreateOrderResponse>, ApiError> {
    // The account must exist before we take money for it.
    state
        .store
        .get_account(&auth.account_id)?
        .ok_or_else(|| ApiError::NotFound("Account not found".into()))?;

    let provider = state.provider()?;
    let return_url = format!("{}/billing/return", state.config.frontend_url);
    let cancel_url = format!("{}/billing/cancelled", state.config.frontend_url);

    let order = provider
        .create_order(
            body.pack.price_cents(),
            &auth.account_id.to_string(),
            &return_url,
            &cancel_url,
        )
        .await
        .map_err(|e| ApiError::ExternalService(e.to_string()))?;

    tracing::info!(
        account_id = %auth.account_id,
        order_id = %order.id,
        amount_cents = %body.pack.price_cents(),
        "Order created"
    );

    Ok(Json(CreateOrderResponse {
        order_id: order.id,
        approve_url: order.approve_url,
        credits: body.pack.credits(),
        amount_cents: body.pack.price_cents(),
    }))
}

/// Capture response.
#[derive(Debug, Serialize)]
pub struct CaptureOrderResponse {
    /// Whether this call added the credits. False means the grant was
    /// already applied (usually by the webhook) - still a success.
    pub added: bool,
    /// Balance after reconciliation.
    pub balance: BalanceResponse,
}

/// Capture an approved order and grant its credits.
///
/// Safe to race with the webhook for the same order and safe to retry:
/// the grant is claimed under the provider order ID either way.
pub async fn capture_order(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(order_id): Path<String>,
) -> Result<Json<CaptureOrderResponse>, ApiError> {
    let provider = state.provider()?;

    let order = provider
        .capture_order(&order_id)
        .await
        .map_err(|e| ApiError::ExternalService(e.to_string()))?;

    if !order.is_completed() {
        return Err(ApiError::Conflict(format!(
            "Order {order_id} not completed (status: {})",
            order.status
        )));
    }

    let amount_cents = order
        .amount_cents
        .ok_or_else(|| ApiError::ExternalService("Capture missing amount".into()))?;
    let credits = credits_for_amount(amount_cents).ok_or_else(|| {
        ApiError::ExternalService(format!("No credit pack priced at {amount_cents} cents"))
    })?;

    let now = Utc::now();
    let outcome = state.ledger.grant_purchased(
        &auth.account_id,
        credits,
        EffectKey::credit_grant(&order_id),
        serde_json::json!({
            "order_id": order_id,
            "amount_cents": amount_cents,
            "credits": credits,
            "channel": "return-callback",
        }),
        now,
    )?;

    let balance = state.ledger.balance(&auth.account_id, now)?;

    Ok(Json(CaptureOrderResponse {
        added: outcome.added(),
        balance: BalanceResponse::from(balance),
    }))
}
