//! Webhook ingress integration tests.
//!
//! The default harness has no webhook secret configured, so signature
//! verification is skipped (development mode); the signature tests use
//! a harness with the secret set.

mod common;

use common::{TestHarness, WEBHOOK_SECRET};
use palette_billing_service::provider::sign_webhook_payload;
use serde_json::json;

#[tokio::test]
async fn capture_webhook_grants_credits() {
    let harness = TestHarness::new();
    harness.create_account().await;

    let ack = harness
        .deliver_webhook(&harness.capture_webhook("ORDER-10", 500))
        .await;
    assert_eq!(ack["received"], true);

    let balance = harness.get_balance().await;
    assert_eq!(balance["purchased_credits"], 10);
    assert_eq!(balance["total_purchased_credits"], 10);
}

#[tokio::test]
async fn redelivered_capture_webhook_grants_once() {
    let harness = TestHarness::new();
    harness.create_account().await;

    for _ in 0..3 {
        harness
            .deliver_webhook(&harness.capture_webhook("ORDER-11", 500))
            .await;
    }

    let balance = harness.get_balance().await;
    assert_eq!(balance["purchased_credits"], 10);
}

#[tokio::test]
async fn grant_flips_admission_to_allowed() {
    let harness = TestHarness::new();
    harness.create_account().await;

    // Exhaust the free credits.
    for _ in 0..3 {
        harness
            .server
            .post("/v1/generations/consume")
            .add_header("authorization", harness.user_auth_header())
            .await
            .assert_status_ok();
    }

    let check = harness
        .server
        .post("/v1/generations/check")
        .add_header("authorization", harness.user_auth_header())
        .await;
    check.assert_status_ok();
    let check: serde_json::Value = check.json();
    assert_eq!(check["allowed"], false);
    assert_eq!(check["reason"], "no_credits");

    harness
        .deliver_webhook(&harness.capture_webhook("ORDER-12", 500))
        .await;

    let check = harness
        .server
        .post("/v1/generations/check")
        .add_header("authorization", harness.user_auth_header())
        .await;
    check.assert_status_ok();
    let check: serde_json::Value = check.json();
    assert_eq!(check["allowed"], true);
}

#[tokio::test]
async fn activation_webhook_upgrades_account() {
    let harness = TestHarness::new();
    harness.create_account().await;

    harness
        .deliver_webhook(&harness.subscription_webhook("I-20", "ACTIVATED"))
        .await;

    let account = harness.get_account().await;
    assert_eq!(account["tier"], "pro");
    assert_eq!(account["subscription_status"], "active");
    assert_eq!(account["subscription_id"], "I-20");

    let balance = harness.get_balance().await;
    assert_eq!(balance["is_unlimited"], true);
}

#[tokio::test]
async fn activated_and_cancelled_converge_in_either_order() {
    // Order 1: activated, then cancelled.
    let harness = TestHarness::new();
    harness.create_account().await;
    harness
        .deliver_webhook(&harness.subscription_webhook("I-21", "ACTIVATED"))
        .await;
    harness
        .deliver_webhook(&harness.subscription_webhook("I-21", "CANCELLED"))
        .await;

    let account = harness.get_account().await;
    assert_eq!(account["subscription_status"], "cancelled");
    assert_eq!(account["tier"], "pro");
    assert_eq!(account["cancel_at_period_end"], true);

    // Order 2: cancelled first (out of receipt order), then activated.
    let harness = TestHarness::new();
    harness.create_account().await;
    harness
        .deliver_webhook(&harness.subscription_webhook("I-22", "CANCELLED"))
        .await;
    harness
        .deliver_webhook(&harness.subscription_webhook("I-22", "ACTIVATED"))
        .await;

    let account = harness.get_account().await;
    assert_eq!(account["subscription_status"], "cancelled");
    assert_eq!(account["tier"], "pro");
    assert_eq!(account["cancel_at_period_end"], true);
}

#[tokio::test]
async fn redelivered_cancellation_is_a_noop() {
    let harness = TestHarness::new();
    harness.create_account().await;

    harness
        .deliver_webhook(&harness.subscription_webhook("I-23", "ACTIVATED"))
        .await;
    for _ in 0..3 {
        harness
            .deliver_webhook(&harness.subscription_webhook("I-23", "CANCELLED"))
            .await;
    }

    let account = harness.get_account().await;
    assert_eq!(account["subscription_status"], "cancelled");
    assert_eq!(account["tier"], "pro");
}

#[tokio::test]
async fn suspension_downgrades_immediately() {
    let harness = TestHarness::new();
    harness.create_account().await;

    harness
        .deliver_webhook(&harness.subscription_webhook("I-24", "ACTIVATED"))
        .await;
    harness
        .deliver_webhook(&harness.subscription_webhook("I-24", "SUSPENDED"))
        .await;

    let account = harness.get_account().await;
    assert_eq!(account["subscription_status"], "suspended");
    assert_eq!(account["tier"], "free");

    let balance = harness.get_balance().await;
    assert_eq!(balance["is_unlimited"], false);
}

#[tokio::test]
async fn event_for_unknown_account_is_still_acked() {
    let harness = TestHarness::new();

    // No account exists; the provider must not see a failure.
    let ack = harness
        .deliver_webhook(&json!({
            "id": "WH-UNKNOWN",
            "event_type": "BILLING.SUBSCRIPTION.ACTIVATED",
            "resource": { "id": "I-99" }
        }))
        .await;
    assert_eq!(ack["received"], true);
}

#[tokio::test]
async fn unknown_event_type_is_acked() {
    let harness = TestHarness::new();

    let ack = harness
        .deliver_webhook(&json!({
            "id": "WH-OTHER",
            "event_type": "CUSTOMER.DISPUTE.CREATED",
            "resource": {}
        }))
        .await;
    assert_eq!(ack["received"], true);
}

#[tokio::test]
async fn signed_webhook_is_verified() {
    let harness = TestHarness::with_webhook_secret();
    harness.create_account().await;

    let payload = harness.capture_webhook("ORDER-30", 500).to_string();
    let signature = sign_webhook_payload(WEBHOOK_SECRET, "1700000000", &payload);

    let response = harness
        .server
        .post("/webhooks/payments")
        .add_header("x-payments-signature", signature)
        .add_header("content-type", "application/json")
        .text(payload)
        .await;
    response.assert_status_ok();

    let balance = harness.get_balance().await;
    assert_eq!(balance["purchased_credits"], 10);
}

#[tokio::test]
async fn bad_signature_is_rejected() {
    let harness = TestHarness::with_webhook_secret();
    harness.create_account().await;

    let payload = harness.capture_webhook("ORDER-31", 500).to_string();
    let signature = sign_webhook_payload("wrong-secret", "1700000000", &payload);

    let response = harness
        .server
        .post("/webhooks/payments")
        .add_header("x-payments-signature", signature)
        .add_header("content-type", "application/json")
        .text(payload)
        .await;
    response.assert_status_bad_request();

    // Nothing was granted.
    let balance = harness.get_balance().await;
    assert_eq!(balance["purchased_credits"], 0);
}

#[tokio::test]
async fn missing_signature_is_rejected_when_secret_configured() {
    let harness = TestHarness::with_webhook_secret();
    harness.create_account().await;

    let response = harness
        .server
        .post("/webhooks/payments")
        .json(&harness.capture_webhook("ORDER-32", 500))
        .await;
    response.assert_status_bad_request();
}
