//! Admin AI dashboard models.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::db::models::usage::{AiUsageLog, UsageTotals};
use crate::types::{AiOperation, AiProvider, UserId};

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UsageLogResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: Uuid,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub user_id: Option<UserId>,
    pub provider: AiProvider,
    pub model: String,
    pub operation: AiOperation,
    pub prompt_tokens: i64,
    pub completion_tokens: i64,
    pub total_tokens: i64,
    pub created_at: DateTime<Utc>,
}

impl From<AiUsageLog> for UsageLogResponse {
    fn from(log: AiUsageLog) -> Self {
        Self {
            id: log.id,
            user_id: log.user_id,
            provider: log.provider,
            model: log.model,
            operation: log.operation,
            prompt_tokens: log.prompt_tokens,
            completion_tokens: log.completion_tokens,
            total_tokens: log.total_tokens,
            created_at: log.created_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UsageTotalsResponse {
    pub requests: i64,
    pub prompt_tokens: i64,
    pub completion_tokens: i64,
    pub total_tokens: i64,
}

impl From<UsageTotals> for UsageTotalsResponse {
    fn from(totals: UsageTotals) -> Self {
        Self {
            requests: totals.requests,
            prompt_tokens: totals.prompt_tokens,
            completion_tokens: totals.completion_tokens,
            total_tokens: totals.total_tokens,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AiSettingsResponse {
    /// Most recent usage entries, newest first
    pub logs: Vec<UsageLogResponse>,
    /// Provider order used for text generation
    pub priority: Vec<AiProvider>,
    /// Totals keyed by provider name; empty object when nothing was logged
    pub usage: BTreeMap<String, UsageTotalsResponse>,
    /// Stored `ai_quotas`, or an empty object
    #[schema(value_type = Object)]
    pub quotas: Value,
}
