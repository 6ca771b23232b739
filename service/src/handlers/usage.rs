//! Usage reporting handlers.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use palette_billing_core::{AccountId, SystemUsage, UsageRecord};

use crate::auth::{AuthUser, ServiceAuth};
use crate::error::ApiError;
use crate::state::AppState;

/// Usage report request from the generation backend.
#[derive(Debug, Deserialize)]
pub struct RecordUsageRequest {
    /// Account the generation ran for.
    pub account_id: String,
    /// Input tokens consumed.
    pub input_tokens: u64,
    /// Output tokens produced.
    pub output_tokens: u64,
}

/// Usage record response.
#[derive(Debug, Serialize)]
pub struct UsageRecordResponse {
    /// Account ID.
    pub account_id: String,
    /// Period start.
    pub period_start: String,
    /// Period end.
    pub period_end: String,
    /// Generations this period.
    pub prompt_count: u64,
    /// Input tokens this period.
    pub input_tokens: u64,
    /// Output tokens this period.
    pub output_tokens: u64,
    /// Most recent generation.
    pub last_prompt_at: String,
}

impl From<&UsageRecord> for UsageRecordResponse {
    fn from(record: &UsageRecord) -> Self {
        Self {
            account_id: record.account_id.to_string(),
            period_start: record.period_start.to_rfc3339(),
            period_end: record.period_end.to_rfc3339(),
            prompt_count: record.prompt_count,
            input_tokens: record.input_tokens,
            output_tokens: record.output_tokens,
            last_prompt_at: record.last_prompt_at.to_rfc3339(),
        }
    }
}

/// Record one generation's usage.
pub async fn record_usage(
    State(state): State<Arc<AppState>>,
    auth: ServiceAuth,
    Json(body): Json<RecordUsageRequest>,
) -> Result<Json<UsageRecordResponse>, ApiError> {
    let account_id = body
        .account_id
        .parse::<AccountId>()
        .map_err(|_| ApiError::BadRequest("Invalid account ID".into()))?;

    tracing::debug!(
        service = %auth.service_name,
        account_id = %account_id,
        input_tokens = %body.input_tokens,
        output_tokens = %body.output_tokens,
        "Recording usage"
    );

    let record = state.usage.record(
        &account_id,
        body.input_tokens,
        body.output_tokens,
        Utc::now(),
    )?;

    Ok(Json(UsageRecordResponse::from(&record)))
}

/// The caller's usage for the current period.
pub async fn my_usage(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<Option<UsageRecordResponse>>, ApiError> {
    let record = state.usage.account_usage(&auth.account_id, Utc::now())?;
    Ok(Json(record.as_ref().map(UsageRecordResponse::from)))
}

/// System-wide rollup response.
#[derive(Debug, Serialize)]
pub struct SystemUsageResponse {
    /// Accounts with at least one generation this period.
    pub active_accounts: u64,
    /// Total generations.
    pub total_prompts: u64,
    /// Total input tokens.
    pub total_input_tokens: u64,
    /// Total output tokens.
    pub total_output_tokens: u64,
}

impl From<SystemUsage> for SystemUsageResponse {
    fn from(rollup: SystemUsage) -> Self {
        Self {
            active_accounts: rollup.active_accounts,
            total_prompts: rollup.total_prompts,
            total_input_tokens: rollup.total_input_tokens,
            total_output_tokens: rollup.total_output_tokens,
        }
    }
}

/// System-wide usage for the current period.
pub async fn system_usage(
    State(state): State<Arc<AppState>>,
    _auth: ServiceAuth,
) -> Result<Json<SystemUsageResponse>, ApiError> {
    let rollup = state.usage.system_wide(Utc::now())?;
    Ok(Json(SystemUsageResponse::from(rollup)))
}

/// Top accounts query parameters.
#[derive(Debug, Deserialize)]
pub struct TopAccountsQuery {
    /// How many accounts to return (default: 10).
    #[serde(default = "default_top_n")]
    pub n: usize,
}

fn default_top_n() -> usize {
    10
}

/// The heaviest accounts this period.
pub async fn top_accounts(
    State(state): State<Arc<AppState>>,
    _auth: ServiceAuth,
    Query(query): Query<TopAccountsQuery>,
) -> Result<Json<Vec<UsageRecordResponse>>, ApiError> {
    let records = state.usage.top_accounts(query.n, Utc::now())?;
    Ok(Json(records.iter().map(UsageRecordResponse::from).collect()))
}
