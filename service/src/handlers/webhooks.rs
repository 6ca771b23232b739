//! Payment provider webhook handler.
//!
//! The asynchronous half of the dual ingress. Deliveries are
//! at-least-once and unordered; every mutation goes through the shared
//! effect-key space, so redelivery and callback races collapse into
//! no-ops. Once the signature checks out we always ack - failing a
//! delivery only invites a redelivery storm for an outcome that will
//! not change.

use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use palette_billing_core::{AccountId, EffectKey, SubscriptionEventKind, SubscriptionUpdate};

use crate::error::ApiError;
use crate::handlers::credits::credits_for_amount;
use crate::state::AppState;

/// Signature header set by the payment provider.
pub const SIGNATURE_HEADER: &str = "x-payments-signature";

/// Payment provider webhook payload.
#[derive(Debug, Deserialize)]
pub struct PaymentWebhook {
    /// Delivery ID (not stable across redeliveries of the same event).
    pub id: String,
    /// Event type.
    pub event_type: String,
    /// Event resource.
    pub resource: serde_json::Value,
}

/// Webhook response.
#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    /// Whether the webhook was received.
    pub received: bool,
}

/// Handle payment provider webhooks.
pub async fn payments_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: String,
) -> Result<Json<WebhookResponse>, ApiError> {
    let signature = headers.get(SIGNATURE_HEADER).and_then(|v| v.to_str().ok());

    // Verify signature if a webhook secret is configured
    if state.config.provider_webhook_secret.is_some() {
        let sig =
            signature.ok_or_else(|| ApiError::BadRequest("Missing webhook signature".into()))?;

        if let Some(provider) = &state.provider {
            provider.verify_webhook_signature(&body, sig).map_err(|e| {
                tracing::warn!(error = %e, "Invalid webhook signature");
                ApiError::BadRequest("Invalid webhook signature".into())
            })?;
        } else {
            tracing::warn!(
                "Webhook secret configured but provider client not available - skipping verification"
            );
        }
    } else {
        // No webhook secret configured - skip verification (development mode)
        tracing::warn!("Provider webhook secret not configured - skipping signature verification");
    }

    // From here on we ack no matter what: the payload is authentic, and
    // redelivery cannot change a business outcome.
    let webhook: PaymentWebhook = match serde_json::from_str(&body) {
        Ok(webhook) => webhook,
        Err(e) => {
            tracing::warn!(error = %e, "Unparseable webhook payload, acking anyway");
            return Ok(Json(WebhookResponse { received: true }));
        }
    };

    tracing::info!(
        event_type = %webhook.event_type,
        delivery_id = %webhook.id,
        "Received payment webhook"
    );

    if let Err(e) = dispatch(&state, &webhook) {
        tracing::warn!(
            event_type = %webhook.event_type,
            delivery_id = %webhook.id,
            error = %e,
            "Webhook processing failed, acking anyway"
        );
    }

    Ok(Json(WebhookResponse { received: true }))
}

fn dispatch(state: &AppState, webhook: &PaymentWebhook) -> Result<(), ApiError> {
    match webhook.event_type.as_str() {
        "PAYMENT.CAPTURE.COMPLETED" => handle_capture_completed(state, &webhook.resource),
        event_type => {
            if let Some(kind) = subscription_event_kind(event_type) {
                handle_subscription_event(state, kind, &webhook.resource)
            } else {
                tracing::debug!(event_type = %event_type, "Unhandled provider event");
                Ok(())
            }
        }
    }
}

fn subscription_event_kind(event_type: &str) -> Option<SubscriptionEventKind> {
    match event_type {
        "BILLING.SUBSCRIPTION.ACTIVATED" => Some(SubscriptionEventKind::Activated),
        "BILLING.SUBSCRIPTION.CANCELLED" => Some(SubscriptionEventKind::Cancelled),
        "BILLING.SUBSCRIPTION.SUSPENDED" => Some(SubscriptionEventKind::Suspended),
        "BILLING.SUBSCRIPTION.EXPIRED" => Some(SubscriptionEventKind::Expired),
        _ => None,
    }
}

fn handle_capture_completed(state: &AppState, resource: &serde_json::Value) -> Result<(), ApiError> {
    let order_id = resource
        .get("order_id")
        .and_then(|v| v.as_str())
        .ok_or_else(|| ApiError::BadRequest("Capture missing order_id".into()))?;

    let amount_cents = resource
        .get("amount_cents")
        .and_then(serde_json::Value::as_i64)
        .ok_or_else(|| ApiError::BadRequest("Capture missing amount_cents".into()))?;

    let account_id = resource
        .get("reference_id")
        .and_then(|v| v.as_str())
        .ok_or_else(|| ApiError::BadRequest("Capture missing reference_id".into()))?
        .parse::<AccountId>()
        .map_err(|_| ApiError::BadRequest("Invalid reference_id".into()))?;

    let credits = credits_for_amount(amount_cents).ok_or_else(|| {
        ApiError::BadRequest(format!("No credit pack priced at {amount_cents} cents"))
    })?;

    // Races the capture callback for the same order; the shared effect
    // key means at most one grant lands.
    state.ledger.grant_purchased(
        &account_id,
        credits,
        EffectKey::credit_grant(order_id),
        serde_json::json!({
            "order_id": order_id,
            "amount_cents": amount_cents,
            "credits": credits,
            "channel": "webhook",
        }),
        Utc::now(),
    )?;

    Ok(())
}

fn handle_subscription_event(
    state: &AppState,
    kind: SubscriptionEventKind,
    resource: &serde_json::Value,
) -> Result<(), ApiError> {
    let subscription_id = resource
        .get("id")
        .and_then(|v| v.as_str())
        .ok_or_else(|| ApiError::BadRequest("Subscription event missing id".into()))?;

    // Prefer the binding created at subscription time; fall back to the
    // reference echoed by the provider.
    let account_id = match state.subscriptions.resolve_account(subscription_id)? {
        Some(account_id) => account_id,
        None => {
            let Some(reference) = resource.get("reference_id").and_then(|v| v.as_str()) else {
                tracing::warn!(
                    subscription_id = %subscription_id,
                    event = %kind,
                    "Subscription event for unknown account, dropping"
                );
                return Ok(());
            };
            reference
                .parse::<AccountId>()
                .map_err(|_| ApiError::BadRequest("Invalid reference_id".into()))?
        }
    };

    let update = SubscriptionUpdate {
        kind,
        subscription_id: subscription_id.to_string(),
        period_start: parse_time(resource, "current_period_start"),
        period_end: parse_time(resource, "next_billing_time"),
    };

    state.subscriptions.apply(
        &account_id,
        &update,
        serde_json::json!({
            "channel": "webhook",
            "resource": resource,
        }),
        Utc::now(),
    )?;

    Ok(())
}

fn parse_time(resource: &serde_json::Value, field: &str) -> Option<DateTime<Utc>> {
    resource
        .get(field)
        .and_then(|v| v.as_str())
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|t| t.with_timezone(&Utc))
}
