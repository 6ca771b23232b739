//! Subscription flow integration tests.
//!
//! The provider is a wiremock stand-in; the webhook and the synchronous
//! activate callback target the same state machine.

mod common;

use common::TestHarness;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mount_subscription(mock: &MockServer, id: &str, status: &str) {
    Mock::given(method("POST"))
        .and(path("/v1/subscriptions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": id,
            "status": "APPROVAL_PENDING",
            "approve_url": format!("https://provider.test/approve/{id}"),
        })))
        .mount(mock)
        .await;

    Mock::given(method("GET"))
        .and(path(format!("/v1/subscriptions/{id}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": id,
            "status": status,
            "plan_id": "palette-pro-monthly",
            "current_period_start": "2025-03-01T00:00:00Z",
            "next_billing_time": "2099-01-01T00:00:00Z",
        })))
        .mount(mock)
        .await;

    Mock::given(method("POST"))
        .and(path(format!("/v1/subscriptions/{id}/cancel")))
        .respond_with(ResponseTemplate::new(204))
        .mount(mock)
        .await;
}

#[tokio::test]
async fn create_binds_a_pending_subscription() {
    let mock = MockServer::start().await;
    let harness = TestHarness::with_provider(&mock.uri());
    harness.create_account().await;
    mount_subscription(&mock, "I-50", "ACTIVE").await;

    let response = harness
        .server
        .post("/v1/subscriptions")
        .add_header("authorization", harness.user_auth_header())
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["subscription_id"], "I-50");
    assert_eq!(body["status"], "pending");

    let account = harness.get_account().await;
    assert_eq!(account["subscription_status"], "pending");
    assert_eq!(account["tier"], "pro");
}

#[tokio::test]
async fn activate_after_browser_return() {
    let mock = MockServer::start().await;
    let harness = TestHarness::with_provider(&mock.uri());
    harness.create_account().await;
    mount_subscription(&mock, "I-51", "ACTIVE").await;

    harness
        .server
        .post("/v1/subscriptions")
        .add_header("authorization", harness.user_auth_header())
        .await
        .assert_status_ok();

    let response = harness
        .server
        .post("/v1/subscriptions/activate")
        .add_header("authorization", harness.user_auth_header())
        .json(&json!({ "subscription_id": "I-51" }))
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["activated"], true);
    assert_eq!(body["account"]["subscription_status"], "active");
    assert_eq!(body["account"]["tier"], "pro");
}

#[tokio::test]
async fn activate_is_absorbed_when_webhook_won_the_race() {
    let mock = MockServer::start().await;
    let harness = TestHarness::with_provider(&mock.uri());
    harness.create_account().await;
    mount_subscription(&mock, "I-52", "ACTIVE").await;

    harness
        .server
        .post("/v1/subscriptions")
        .add_header("authorization", harness.user_auth_header())
        .await
        .assert_status_ok();

    // The webhook arrives before the user's browser does.
    harness
        .deliver_webhook(&harness.subscription_webhook("I-52", "ACTIVATED"))
        .await;

    let response = harness
        .server
        .post("/v1/subscriptions/activate")
        .add_header("authorization", harness.user_auth_header())
        .json(&json!({ "subscription_id": "I-52" }))
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["activated"], true);
    assert_eq!(body["account"]["subscription_status"], "active");
}

#[tokio::test]
async fn activate_not_yet_approved_reports_pending() {
    let mock = MockServer::start().await;
    let harness = TestHarness::with_provider(&mock.uri());
    harness.create_account().await;
    mount_subscription(&mock, "I-53", "APPROVAL_PENDING").await;

    harness
        .server
        .post("/v1/subscriptions")
        .add_header("authorization", harness.user_auth_header())
        .await
        .assert_status_ok();

    let response = harness
        .server
        .post("/v1/subscriptions/activate")
        .add_header("authorization", harness.user_auth_header())
        .json(&json!({ "subscription_id": "I-53" }))
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["activated"], false);
    assert_eq!(body["provider_status"], "APPROVAL_PENDING");
}

#[tokio::test]
async fn activate_someone_elses_subscription_is_forbidden() {
    let mock = MockServer::start().await;
    let harness = TestHarness::with_provider(&mock.uri());
    harness.create_account().await;

    let response = harness
        .server
        .post("/v1/subscriptions/activate")
        .add_header("authorization", harness.user_auth_header())
        .json(&json!({ "subscription_id": "I-NOT-MINE" }))
        .await;
    response.assert_status_forbidden();
}

#[tokio::test]
async fn cancel_keeps_pro_until_period_end() {
    let mock = MockServer::start().await;
    let harness = TestHarness::with_provider(&mock.uri());
    harness.create_account().await;
    mount_subscription(&mock, "I-54", "ACTIVE").await;

    harness
        .server
        .post("/v1/subscriptions")
        .add_header("authorization", harness.user_auth_header())
        .await
        .assert_status_ok();
    harness
        .server
        .post("/v1/subscriptions/activate")
        .add_header("authorization", harness.user_auth_header())
        .json(&json!({ "subscription_id": "I-54" }))
        .await
        .assert_status_ok();

    let response = harness
        .server
        .post("/v1/subscriptions/cancel")
        .add_header("authorization", harness.user_auth_header())
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["account"]["subscription_status"], "cancelled");
    assert_eq!(body["account"]["tier"], "pro");
    assert_eq!(body["account"]["cancel_at_period_end"], true);

    // The provider's own cancellation webhook is absorbed as a duplicate.
    harness
        .deliver_webhook(&harness.subscription_webhook("I-54", "CANCELLED"))
        .await;
    let account = harness.get_account().await;
    assert_eq!(account["subscription_status"], "cancelled");
    assert_eq!(account["tier"], "pro");
}

#[tokio::test]
async fn cancel_without_subscription_conflicts() {
    let mock = MockServer::start().await;
    let harness = TestHarness::with_provider(&mock.uri());
    harness.create_account().await;

    let response = harness
        .server
        .post("/v1/subscriptions/cancel")
        .add_header("authorization", harness.user_auth_header())
        .await;
    response.assert_status(axum::http::StatusCode::CONFLICT);
}
