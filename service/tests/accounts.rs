//! Account provisioning integration tests.

mod common;

use common::TestHarness;
use serde_json::json;

#[tokio::test]
async fn create_account_grants_free_credits_once() {
    let harness = TestHarness::new();

    let account = harness.create_account().await;
    assert_eq!(account["tier"], "free");
    assert_eq!(account["free_credits_remaining"], 3);
    assert_eq!(account["purchased_credits"], 0);
    assert_eq!(account["subscription_status"], "none");
    assert_eq!(account["is_admin"], false);

    // Provisioning is idempotent: no second grant of free credits.
    let again = harness.create_account().await;
    assert_eq!(again["id"], account["id"]);
    assert_eq!(again["free_credits_remaining"], 3);
}

#[tokio::test]
async fn allowlisted_email_is_admin() {
    let harness = TestHarness::new();

    let response = harness
        .server
        .post("/v1/accounts")
        .add_header("authorization", harness.user_auth_header())
        .json(&json!({ "email": "ops@palette.test" }))
        .await;

    response.assert_status_ok();
    let account: serde_json::Value = response.json();
    assert_eq!(account["is_admin"], true);
}

#[tokio::test]
async fn create_account_rejects_bad_email() {
    let harness = TestHarness::new();

    let response = harness
        .server
        .post("/v1/accounts")
        .add_header("authorization", harness.user_auth_header())
        .json(&json!({ "email": "not-an-email" }))
        .await;

    response.assert_status_bad_request();
}

#[tokio::test]
async fn get_account_requires_auth() {
    let harness = TestHarness::new();

    let response = harness.server.get("/v1/accounts/me").await;
    response.assert_status_unauthorized();
}

#[tokio::test]
async fn get_account_before_provisioning_fails() {
    let harness = TestHarness::new();

    let response = harness
        .server
        .get("/v1/accounts/me")
        .add_header("authorization", harness.user_auth_header())
        .await;

    response.assert_status_not_found();
}
