//! Service configuration.

use serde::Deserialize;
use std::path::Path;

use palette_billing_core::{ProvisioningPolicy, DEFAULT_INITIAL_FREE_CREDITS};

/// Service configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Address to listen on (default: "0.0.0.0:8080").
    pub listen_addr: String,

    /// Path to `RocksDB` data directory (default: "/data/palette-billing").
    pub data_dir: String,

    /// HS256 secret for validating user JWTs. When unset the service
    /// accepts the dev `test-token:<uuid>` format only.
    pub auth_jwt_secret: Option<String>,

    /// Expected JWT audience (default: "palette-billing").
    pub auth_audience: String,

    /// Service API key for service-to-service auth.
    pub service_api_key: Option<String>,

    /// Payment provider API base URL (optional).
    pub provider_base_url: Option<String>,

    /// Payment provider API key (optional).
    pub provider_api_key: Option<String>,

    /// Payment provider webhook signing secret (optional).
    pub provider_webhook_secret: Option<String>,

    /// Provider plan ID for the Pro subscription.
    pub provider_pro_plan_id: String,

    /// Frontend URL for checkout redirects.
    pub frontend_url: String,

    /// CORS allowed origins.
    pub cors_origins: Vec<String>,

    /// Maximum request body size in bytes.
    pub max_body_bytes: usize,

    /// Request timeout in seconds.
    pub request_timeout_seconds: u64,

    /// Free credits granted at account creation.
    pub initial_free_credits: i64,

    /// Admin email allowlist applied at account creation.
    pub admin_emails: Vec<String>,
}

/// Provider secrets file structure.
#[derive(Debug, Deserialize)]
struct ProviderSecrets {
    base_url: String,
    api_key: String,
    #[serde(default)]
    webhook_secret: Option<String>,
}

impl ServiceConfig {
    /// Load configuration from environment variables and secrets files.
    #[must_use]
    pub fn from_env() -> Self {
        // Try to load provider secrets from file first, then fall back to env vars
        let (provider_base_url, provider_api_key, provider_webhook_secret) =
            load_provider_secrets();

        Self {
            listen_addr: std::env::var("LISTEN_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".into()),
            data_dir: std::env::var("DATA_DIR").unwrap_or_else(|_| "/data/palette-billing".into()),
            auth_jwt_secret: std::env::var("AUTH_JWT_SECRET").ok(),
            auth_audience: std::env::var("AUTH_AUDIENCE")
                .unwrap_or_else(|_| "palette-billing".into()),
            service_api_key: std::env::var("SERVICE_API_KEY").ok(),
            provider_base_url,
            provider_api_key,
            provider_webhook_secret,
            provider_pro_plan_id: std::env::var("PROVIDER_PRO_PLAN_ID")
                .unwrap_or_else(|_| "palette-pro-monthly".into()),
            frontend_url: std::env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:3000".into()),
            cors_origins: std::env::var("CORS_ORIGINS")
                .unwrap_or_else(|_| "*".into())
                .split(',')
                .map(|s| s.trim().to_string())
                .collect(),
            max_body_bytes: std::env::var("MAX_BODY_BYTES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(1024 * 1024), // 1MB
            request_timeout_seconds: std::env::var("REQUEST_TIMEOUT_SECONDS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(30),
            initial_free_credits: std::env::var("INITIAL_FREE_CREDITS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_INITIAL_FREE_CREDITS),
            admin_emails: std::env::var("ADMIN_EMAILS")
                .unwrap_or_default()
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect(),
        }
    }

    /// The provisioning policy applied to new accounts.
    #[must_use]
    pub fn provisioning_policy(&self) -> ProvisioningPolicy {
        ProvisioningPolicy {
            initial_free_credits: self.initial_free_credits,
            admin_emails: self.admin_emails.clone(),
        }
    }
}

/// Load provider secrets from file or environment.
fn load_provider_secrets() -> (Option<String>, Option<String>, Option<String>) {
    let secret_paths = [
        ".secrets/provider.json",
        "palette-billing/.secrets/provider.json",
        "../.secrets/provider.json",
    ];

    for path in &secret_paths {
        if let Ok(secrets) = load_secrets_file::<ProviderSecrets>(path) {
            tracing::info!(path = %path, "Loaded provider secrets from file");
            return (
                Some(secrets.base_url),
                Some(secrets.api_key),
                secrets.webhook_secret,
            );
        }
    }

    // Fall back to environment variables
    tracing::debug!("Provider secrets file not found, using environment variables");
    (
        std::env::var("PROVIDER_BASE_URL").ok(),
        std::env::var("PROVIDER_API_KEY").ok(),
        std::env::var("PROVIDER_WEBHOOK_SECRET").ok(),
    )
}

/// Load secrets from a JSON file.
fn load_secrets_file<T: serde::de::DeserializeOwned>(path: &str) -> Result<T, std::io::Error> {
    let path = Path::new(path);
    if !path.exists() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "Secrets file not found",
        ));
    }
    let contents = std::fs::read_to_string(path)?;
    serde_json::from_str(&contents)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".into(),
            data_dir: "/data/palette-billing".into(),
            auth_jwt_secret: None,
            auth_audience: "palette-billing".into(),
            service_api_key: None,
            provider_base_url: None,
            provider_api_key: None,
            provider_webhook_secret: None,
            provider_pro_plan_id: "palette-pro-monthly".into(),
            frontend_url: "http://localhost:3000".into(),
            cors_origins: vec!["*".into()],
            max_body_bytes: 1024 * 1024,
            request_timeout_seconds: 30,
            initial_free_credits: DEFAULT_INITIAL_FREE_CREDITS,
            admin_emails: Vec::new(),
        }
    }
}
