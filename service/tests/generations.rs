//! Generation admission integration tests.

mod common;

use common::TestHarness;

#[tokio::test]
async fn check_allows_account_with_free_credits() {
    let harness = TestHarness::new();
    harness.create_account().await;

    let response = harness
        .server
        .post("/v1/generations/check")
        .add_header("authorization", harness.user_auth_header())
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["allowed"], true);
    assert_eq!(body["balance"]["free_credits_remaining"], 3);
}

#[tokio::test]
async fn consume_debits_free_credits_then_denies() {
    let harness = TestHarness::new();
    harness.create_account().await;

    for expected_remaining in [2, 1, 0] {
        let response = harness
            .server
            .post("/v1/generations/consume")
            .add_header("authorization", harness.user_auth_header())
            .await;
        response.assert_status_ok();
        let body: serde_json::Value = response.json();
        assert_eq!(body["consumed"], true);
        assert_eq!(body["source"], "free");
        assert_eq!(body["balance"]["free_credits_remaining"], expected_remaining);
    }

    // Fourth consume: denied, never a 5xx.
    let response = harness
        .server
        .post("/v1/generations/consume")
        .add_header("authorization", harness.user_auth_header())
        .await;
    response.assert_status(axum::http::StatusCode::PAYMENT_REQUIRED);
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"]["code"], "insufficient_credits");
}

#[tokio::test]
async fn consume_uses_free_before_purchased() {
    let harness = TestHarness::new();
    harness.create_account().await;
    harness
        .deliver_webhook(&harness.capture_webhook("ORDER-40", 500))
        .await;

    // 3 free + 10 purchased; the first three debits come from free.
    for _ in 0..3 {
        let response = harness
            .server
            .post("/v1/generations/consume")
            .add_header("authorization", harness.user_auth_header())
            .await;
        response.assert_status_ok();
        let body: serde_json::Value = response.json();
        assert_eq!(body["source"], "free");
    }

    let response = harness
        .server
        .post("/v1/generations/consume")
        .add_header("authorization", harness.user_auth_header())
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["source"], "purchased");
    assert_eq!(body["balance"]["purchased_credits"], 9);
}

#[tokio::test]
async fn pro_account_consumes_without_debit() {
    let harness = TestHarness::new();
    harness.create_account().await;
    harness
        .deliver_webhook(&harness.subscription_webhook("I-40", "ACTIVATED"))
        .await;

    for _ in 0..5 {
        let response = harness
            .server
            .post("/v1/generations/consume")
            .add_header("authorization", harness.user_auth_header())
            .await;
        response.assert_status_ok();
        let body: serde_json::Value = response.json();
        assert_eq!(body["source"], "unlimited");
    }

    // The free credits were never touched.
    let balance = harness.get_balance().await;
    assert_eq!(balance["free_credits_remaining"], 3);
}

#[tokio::test]
async fn cancelled_pro_keeps_generating_until_period_end() {
    let harness = TestHarness::new();
    harness.create_account().await;
    harness
        .deliver_webhook(&harness.subscription_webhook("I-41", "ACTIVATED"))
        .await;
    harness
        .deliver_webhook(&harness.subscription_webhook("I-41", "CANCELLED"))
        .await;

    // Period end is far in the future in the test fixtures.
    let response = harness
        .server
        .post("/v1/generations/consume")
        .add_header("authorization", harness.user_auth_header())
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["source"], "unlimited");
}

#[tokio::test]
async fn consume_requires_auth() {
    let harness = TestHarness::new();

    let response = harness.server.post("/v1/generations/consume").await;
    response.assert_status_unauthorized();
}
