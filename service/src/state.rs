//! Application state.

use std::sync::Arc;

use palette_billing_store::RocksStore;

use crate::billing::{AdmissionController, CreditLedger, SubscriptionLifecycle, UsageAggregator};
use crate::config::ServiceConfig;
use crate::provider::ProviderClient;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// The storage backend.
    pub store: Arc<RocksStore>,

    /// Service configuration.
    pub config: ServiceConfig,

    /// Payment provider client (optional).
    pub provider: Option<Arc<ProviderClient>>,

    /// Credit ledger.
    pub ledger: CreditLedger,

    /// Subscription lifecycle engine.
    pub subscriptions: SubscriptionLifecycle,

    /// Admission controller.
    pub admission: AdmissionController,

    /// Usage aggregator.
    pub usage: UsageAggregator,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(store: Arc<RocksStore>, config: ServiceConfig) -> Self {
        // Create the provider client if configured
        let provider = config
            .provider_base_url
            .as_ref()
            .zip(config.provider_api_key.as_ref())
            .map(|(url, key)| {
                tracing::info!(provider_url = %url, "Payment provider integration enabled");
                Arc::new(ProviderClient::new(
                    url,
                    key,
                    config.provider_webhook_secret.clone(),
                ))
            });

        if provider.is_none() {
            tracing::warn!("Payment provider not configured - purchases will not be available");
        }

        let ledger = CreditLedger::new(Arc::clone(&store));
        let subscriptions = SubscriptionLifecycle::new(Arc::clone(&store));
        let admission = AdmissionController::new(ledger.clone());
        let usage = UsageAggregator::new(Arc::clone(&store));

        Self {
            store,
            config,
            provider,
            ledger,
            subscriptions,
            admission,
            usage,
        }
    }

    /// Check if the payment provider is configured.
    #[must_use]
    pub fn has_provider(&self) -> bool {
        self.provider.is_some()
    }

    /// The provider client, or a consistent error when unconfigured.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::ExternalService` when no provider is configured.
    pub fn provider(&self) -> Result<&ProviderClient, crate::error::ApiError> {
        self.provider.as_deref().ok_or_else(|| {
            crate::error::ApiError::ExternalService("Payment provider not configured".into())
        })
    }
}
