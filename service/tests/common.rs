//! Common test utilities for palette-billing integration tests.

#![allow(dead_code)] // Some utilities are used by different test files

use std::sync::Arc;

use axum::Router;
use axum_test::TestServer;
use serde_json::json;
use tempfile::TempDir;

use palette_billing_core::AccountId;
use palette_billing_service::{create_router, AppState, ServiceConfig};
use palette_billing_store::RocksStore;

/// Webhook signing secret used by harnesses built with
/// [`TestHarness::with_webhook_secret`].
pub const WEBHOOK_SECRET: &str = "whsec_test";

/// Test harness containing everything needed for integration tests.
pub struct TestHarness {
    /// The test server for making HTTP requests.
    pub server: TestServer,
    /// Temporary directory for the database (kept alive for test duration).
    pub _temp_dir: TempDir,
    /// A test account ID for authenticated requests.
    pub test_account_id: AccountId,
    /// The service API key for service-to-service requests.
    pub service_api_key: String,
}

impl TestHarness {
    /// Create a new test harness with a fresh database and no provider.
    pub fn new() -> Self {
        Self::build(|_| {})
    }

    /// Harness with a provider client pointed at a mock server.
    pub fn with_provider(base_url: &str) -> Self {
        let base_url = base_url.to_string();
        Self::build(move |config| {
            config.provider_base_url = Some(base_url.clone());
            config.provider_api_key = Some("sk_test".into());
        })
    }

    /// Harness with webhook signature verification enabled.
    pub fn with_webhook_secret() -> Self {
        Self::build(|config| {
            config.provider_base_url = Some("http://localhost:1".into());
            config.provider_api_key = Some("sk_test".into());
            config.provider_webhook_secret = Some(WEBHOOK_SECRET.into());
        })
    }

    fn build(customize: impl FnOnce(&mut ServiceConfig)) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = RocksStore::open(temp_dir.path()).expect("Failed to open store");

        let service_api_key = "test-service-key".to_string();

        let mut config = ServiceConfig {
            listen_addr: "127.0.0.1:0".into(),
            data_dir: temp_dir.path().to_string_lossy().to_string(),
            service_api_key: Some(service_api_key.clone()),
            initial_free_credits: 3,
            admin_emails: vec!["ops@palette.test".into()],
            ..ServiceConfig::default()
        };
        customize(&mut config);

        let state = AppState::new(Arc::new(store), config);
        let router: Router = create_router(state);

        let server = TestServer::new(router).expect("Failed to create test server");
        let test_account_id = AccountId::generate();

        Self {
            server,
            _temp_dir: temp_dir,
            test_account_id,
            service_api_key,
        }
    }

    /// Get the authorization header for user authentication.
    pub fn user_auth_header(&self) -> String {
        format!("Bearer test-token:{}", self.test_account_id)
    }

    /// Auth header for an arbitrary account.
    pub fn auth_header_for(account_id: &AccountId) -> String {
        format!("Bearer test-token:{account_id}")
    }

    /// Provision the default test account and return its JSON.
    pub async fn create_account(&self) -> serde_json::Value {
        let response = self
            .server
            .post("/v1/accounts")
            .add_header("authorization", self.user_auth_header())
            .json(&json!({ "email": "user@example.test" }))
            .await;
        response.assert_status_ok();
        response.json()
    }

    /// Fetch the default test account.
    pub async fn get_account(&self) -> serde_json::Value {
        let response = self
            .server
            .get("/v1/accounts/me")
            .add_header("authorization", self.user_auth_header())
            .await;
        response.assert_status_ok();
        response.json()
    }

    /// Fetch the default test account's balance.
    pub async fn get_balance(&self) -> serde_json::Value {
        let response = self
            .server
            .get("/v1/credits/balance")
            .add_header("authorization", self.user_auth_header())
            .await;
        response.assert_status_ok();
        response.json()
    }

    /// Deliver an unsigned webhook (dev-mode harnesses skip verification).
    pub async fn deliver_webhook(&self, payload: &serde_json::Value) -> serde_json::Value {
        let response = self.server.post("/webhooks/payments").json(payload).await;
        response.assert_status_ok();
        response.json()
    }

    /// A capture-completed webhook payload for the default account.
    pub fn capture_webhook(&self, order_id: &str, amount_cents: i64) -> serde_json::Value {
        json!({
            "id": format!("WH-{order_id}"),
            "event_type": "PAYMENT.CAPTURE.COMPLETED",
            "resource": {
                "order_id": order_id,
                "amount_cents": amount_cents,
                "reference_id": self.test_account_id.to_string(),
            }
        })
    }

    /// A subscription lifecycle webhook payload for the default account.
    pub fn subscription_webhook(&self, subscription_id: &str, event: &str) -> serde_json::Value {
        json!({
            "id": format!("WH-{subscription_id}-{event}"),
            "event_type": format!("BILLING.SUBSCRIPTION.{event}"),
            "resource": {
                "id": subscription_id,
                "reference_id": self.test_account_id.to_string(),
                "current_period_start": "2025-03-01T00:00:00Z",
                "next_billing_time": "2099-01-01T00:00:00Z",
            }
        })
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}
