//! Usage reporting integration tests.

mod common;

use common::TestHarness;
use serde_json::json;

#[tokio::test]
async fn record_usage_requires_service_key() {
    let harness = TestHarness::new();
    harness.create_account().await;

    let response = harness
        .server
        .post("/v1/usage")
        .json(&json!({
            "account_id": harness.test_account_id.to_string(),
            "input_tokens": 100,
            "output_tokens": 800,
        }))
        .await;
    response.assert_status_unauthorized();

    let response = harness
        .server
        .post("/v1/usage")
        .add_header("x-api-key", "wrong-key")
        .json(&json!({
            "account_id": harness.test_account_id.to_string(),
            "input_tokens": 100,
            "output_tokens": 800,
        }))
        .await;
    response.assert_status_unauthorized();
}

#[tokio::test]
async fn record_usage_accumulates_within_the_period() {
    let harness = TestHarness::new();
    harness.create_account().await;

    let response = harness
        .server
        .post("/v1/usage")
        .add_header("x-api-key", harness.service_api_key.clone())
        .add_header("x-service-name", "theme-generator")
        .json(&json!({
            "account_id": harness.test_account_id.to_string(),
            "input_tokens": 100,
            "output_tokens": 800,
        }))
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["prompt_count"], 1);

    let response = harness
        .server
        .post("/v1/usage")
        .add_header("x-api-key", harness.service_api_key.clone())
        .json(&json!({
            "account_id": harness.test_account_id.to_string(),
            "input_tokens": 50,
            "output_tokens": 400,
        }))
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["prompt_count"], 2);
    assert_eq!(body["input_tokens"], 150);
    assert_eq!(body["output_tokens"], 1200);
}

#[tokio::test]
async fn my_usage_reflects_recorded_generations() {
    let harness = TestHarness::new();
    harness.create_account().await;

    // Nothing recorded yet.
    let response = harness
        .server
        .get("/v1/usage/me")
        .add_header("authorization", harness.user_auth_header())
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert!(body.is_null());

    harness
        .server
        .post("/v1/usage")
        .add_header("x-api-key", harness.service_api_key.clone())
        .json(&json!({
            "account_id": harness.test_account_id.to_string(),
            "input_tokens": 10,
            "output_tokens": 90,
        }))
        .await
        .assert_status_ok();

    let response = harness
        .server
        .get("/v1/usage/me")
        .add_header("authorization", harness.user_auth_header())
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["prompt_count"], 1);
    assert_eq!(body["output_tokens"], 90);
}

#[tokio::test]
async fn system_usage_rolls_up_all_accounts() {
    let harness = TestHarness::new();
    harness.create_account().await;

    // A second account with its own usage.
    let other = palette_billing_core::AccountId::generate();
    harness
        .server
        .post("/v1/accounts")
        .add_header("authorization", TestHarness::auth_header_for(&other))
        .json(&json!({ "email": "second@example.test" }))
        .await
        .assert_status_ok();

    for (account_id, prompts) in [(harness.test_account_id, 3), (other, 1)] {
        for _ in 0..prompts {
            harness
                .server
                .post("/v1/usage")
                .add_header("x-api-key", harness.service_api_key.clone())
                .json(&json!({
                    "account_id": account_id.to_string(),
                    "input_tokens": 10,
                    "output_tokens": 100,
                }))
                .await
                .assert_status_ok();
        }
    }

    let response = harness
        .server
        .get("/v1/usage/system")
        .add_header("x-api-key", harness.service_api_key.clone())
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["active_accounts"], 2);
    assert_eq!(body["total_prompts"], 4);
    assert_eq!(body["total_output_tokens"], 400);
}

#[tokio::test]
async fn top_accounts_sorts_by_prompt_count() {
    let harness = TestHarness::new();
    harness.create_account().await;

    let other = palette_billing_core::AccountId::generate();
    harness
        .server
        .post("/v1/accounts")
        .add_header("authorization", TestHarness::auth_header_for(&other))
        .json(&json!({ "email": "second@example.test" }))
        .await
        .assert_status_ok();

    for (account_id, prompts) in [(harness.test_account_id, 1), (other, 5)] {
        for _ in 0..prompts {
            harness
                .server
                .post("/v1/usage")
                .add_header("x-api-key", harness.service_api_key.clone())
                .json(&json!({
                    "account_id": account_id.to_string(),
                    "input_tokens": 1,
                    "output_tokens": 1,
                }))
                .await
                .assert_status_ok();
        }
    }

    let response = harness
        .server
        .get("/v1/usage/top?n=1")
        .add_header("x-api-key", harness.service_api_key.clone())
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    let top = body.as_array().unwrap();
    assert_eq!(top.len(), 1);
    assert_eq!(top[0]["account_id"], other.to_string());
    assert_eq!(top[0]["prompt_count"], 5);
}
