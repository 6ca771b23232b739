//! Payment provider API client implementation.

use reqwest::Client;
use std::time::Duration;

use super::types::{Order, ProviderErrorResponse, Subscription};

/// Error type for provider operations.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Provider API returned an error.
    #[error("provider API error: {name} - {message}")]
    Api {
        /// Error name.
        name: String,
        /// Error message.
        message: String,
    },

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid webhook signature.
    #[error("invalid webhook signature")]
    InvalidSignature,

    /// Configuration error.
    #[error("configuration error: {0}")]
    Configuration(String),
}

/// Payment provider API client.
#[derive(Debug, Clone)]
pub struct ProviderClient {
    client: Client,
    base_url: String,
    api_key: String,
    webhook_secret: Option<String>,
}

impl ProviderClient {
    /// Create a new provider client.
    ///
    /// # Arguments
    ///
    /// * `base_url` - Provider API base URL (points at a sandbox or mock
    ///   in tests)
    /// * `api_key` - Provider secret API key
    /// * `webhook_secret` - Optional webhook signing secret
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be built.
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        webhook_secret: Option<String>,
    ) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            webhook_secret,
        }
    }

    /// Create a one-time order for a credit pack.
    ///
    /// # Arguments
    ///
    /// * `amount_cents` - Amount to charge in cents
    /// * `reference_id` - Our account ID, echoed back in webhooks
    /// * `return_url` / `cancel_url` - Buyer redirect targets
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the provider rejects it.
    pub async fn create_order(
        &self,
        amount_cents: i64,
        reference_id: &str,
        return_url: &str,
        cancel_url: &str,
    ) -> Result<Order, ProviderError> {
        let body = serde_json::json!({
            "amount_cents": amount_cents,
            "currency": "USD",
            "reference_id": reference_id,
            "return_url": return_url,
            "cancel_url": cancel_url,
        });

        let response = self
            .client
            .post(format!("{}/v1/orders", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        Self::handle_response(response).await
    }

    /// Capture an approved order.
    ///
    /// Called from the buyer's browser-return callback. Capturing an
    /// already-captured order is a provider-side no-op that returns the
    /// completed order again.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the provider rejects it.
    pub async fn capture_order(&self, order_id: &str) -> Result<Order, ProviderError> {
        let response = self
            .client
            .post(format!("{}/v1/orders/{order_id}/capture", self.base_url))
            .bearer_auth(&self.api_key)
            .send()
            .await?;

        Self::handle_response(response).await
    }

    /// Create a subscription on a plan.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the provider rejects it.
    pub async fn create_subscription(
        &self,
        plan_id: &str,
        reference_id: &str,
        return_url: &str,
        cancel_url: &str,
    ) -> Result<Subscription, ProviderError> {
        let body = serde_json::json!({
            "plan_id": plan_id,
            "reference_id": reference_id,
            "return_url": return_url,
            "cancel_url": cancel_url,
        });

        let response = self
            .client
            .post(format!("{}/v1/subscriptions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        Self::handle_response(response).await
    }

    /// Fetch current subscription details.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the provider rejects it.
    pub async fn get_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<Subscription, ProviderError> {
        let response = self
            .client
            .get(format!(
                "{}/v1/subscriptions/{subscription_id}",
                self.base_url
            ))
            .bearer_auth(&self.api_key)
            .send()
            .await?;

        Self::handle_response(response).await
    }

    /// Cancel a subscription at the provider.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the provider rejects it.
    pub async fn cancel_subscription(
        &self,
        subscription_id: &str,
        reason: &str,
    ) -> Result<(), ProviderError> {
        let response = self
            .client
            .post(format!(
                "{}/v1/subscriptions/{subscription_id}/cancel",
                self.base_url
            ))
            .bearer_auth(&self.api_key)
            .json(&serde_json::json!({ "reason": reason }))
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        Err(Self::error_from_response(response).await)
    }

    /// Verify a webhook signature.
    ///
    /// # Arguments
    ///
    /// * `payload` - Raw request body
    /// * `signature` - Value of the signature header,
    ///   format `t=<timestamp>,v1=<hex hmac>[,v1=...]`
    ///
    /// # Errors
    ///
    /// Returns `InvalidSignature` when no candidate matches, or
    /// `Configuration` when no webhook secret is set.
    pub fn verify_webhook_signature(
        &self,
        payload: &str,
        signature: &str,
    ) -> Result<(), ProviderError> {
        let secret = self
            .webhook_secret
            .as_ref()
            .ok_or_else(|| ProviderError::Configuration("Webhook secret not configured".into()))?;

        let mut timestamp: Option<&str> = None;
        let mut signatures: Vec<&str> = Vec::new();

        for part in signature.split(',') {
            let mut kv = part.splitn(2, '=');
            match (kv.next(), kv.next()) {
                (Some("t"), Some(ts)) => timestamp = Some(ts),
                (Some("v1"), Some(sig)) => signatures.push(sig),
                _ => {}
            }
        }

        let timestamp =
            timestamp.ok_or_else(|| ProviderError::Configuration("Missing timestamp".into()))?;

        if signatures.is_empty() {
            return Err(ProviderError::InvalidSignature);
        }

        let signed_payload = format!("{timestamp}.{payload}");
        let expected = compute_hmac_sha256(secret, &signed_payload);

        // Check if any signature matches (constant-time comparison)
        let valid = signatures.iter().any(|sig| constant_time_eq(&expected, sig));

        if valid {
            Ok(())
        } else {
            Err(ProviderError::InvalidSignature)
        }
    }

    /// Handle API response and convert errors.
    async fn handle_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ProviderError> {
        let status = response.status();

        if status.is_success() {
            return Ok(response.json().await?);
        }

        Err(Self::error_from_response(response).await)
    }

    async fn error_from_response(response: reqwest::Response) -> ProviderError {
        let status = response.status();
        let error_body: Result<ProviderErrorResponse, _> = response.json().await;

        match error_body {
            Ok(err) => ProviderError::Api {
                name: err.name,
                message: err.message,
            },
            Err(_) => ProviderError::Api {
                name: "unknown".to_string(),
                message: format!("HTTP {status}"),
            },
        }
    }
}

/// Build a signature header for a payload.
///
/// The inverse of [`ProviderClient::verify_webhook_signature`]; used by
/// tests to stand in for the provider.
#[must_use]
pub fn sign_webhook_payload(secret: &str, timestamp: &str, payload: &str) -> String {
    let signed_payload = format!("{timestamp}.{payload}");
    let signature = compute_hmac_sha256(secret, &signed_payload);
    format!("t={timestamp},v1={signature}")
}

/// HMAC block size for SHA256 is 64 bytes.
const HMAC_BLOCK_SIZE: usize = 64;

/// Compute HMAC-SHA256 and return hex-encoded result.
fn compute_hmac_sha256(secret: &str, message: &str) -> String {
    use sha2::{Digest, Sha256};

    let key = secret.as_bytes();
    let message = message.as_bytes();

    // If key is longer than block size, hash it first
    let key = if key.len() > HMAC_BLOCK_SIZE {
        let mut hasher = Sha256::new();
        hasher.update(key);
        hasher.finalize().to_vec()
    } else {
        key.to_vec()
    };

    // Pad key to block size
    let mut key_padded = [0u8; HMAC_BLOCK_SIZE];
    key_padded[..key.len()].copy_from_slice(&key);

    // Create inner and outer padded keys
    let mut i_key_pad = [0x36u8; HMAC_BLOCK_SIZE];
    let mut o_key_pad = [0x5cu8; HMAC_BLOCK_SIZE];

    for i in 0..HMAC_BLOCK_SIZE {
        i_key_pad[i] ^= key_padded[i];
        o_key_pad[i] ^= key_padded[i];
    }

    // Inner hash: H(i_key_pad || message)
    let mut inner_hasher = Sha256::new();
    inner_hasher.update(i_key_pad);
    inner_hasher.update(message);
    let inner_hash = inner_hasher.finalize();

    // Outer hash: H(o_key_pad || inner_hash)
    let mut outer_hasher = Sha256::new();
    outer_hasher.update(o_key_pad);
    outer_hasher.update(inner_hash);
    let hmac = outer_hasher.finalize();

    // Convert to hex
    hex::encode(hmac)
}

/// Constant-time string comparison.
fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }
    result == 0
}
