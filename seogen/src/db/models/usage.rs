//! Store models for AI usage logs.

use crate::types::{AiOperation, AiProvider, UserId};
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// Default number of log entries returned by the admin dashboard
pub const DEFAULT_RECENT_LOGS: i64 = 50;

#[derive(Debug, Clone, FromRow)]
pub struct AiUsageLog {
    pub id: Uuid,
    pub user_id: Option<UserId>,
    pub provider: AiProvider,
    pub model: String,
    pub operation: AiOperation,
    pub prompt_tokens: i64,
    pub completion_tokens: i64,
    pub total_tokens: i64,
    pub created_at: DateTime<Utc>,
}

/// Request for appending a usage log entry after a generation call
#[derive(Debug, Clone)]
pub struct NewUsageLog {
    pub user_id: Option<UserId>,
    pub provider: AiProvider,
    pub model: String,
    pub operation: AiOperation,
    pub prompt_tokens: i64,
    pub completion_tokens: i64,
    pub total_tokens: i64,
}

/// Filter for listing usage logs. `user_id: None` lists every user's entries.
#[derive(Debug, Clone)]
pub struct UsageLogFilter {
    pub user_id: Option<UserId>,
    pub limit: i64,
}

impl UsageLogFilter {
    pub fn recent(limit: i64) -> Self {
        Self { user_id: None, limit }
    }
}

/// Aggregated usage for one provider
#[derive(Debug, Clone, Default, PartialEq, Eq, FromRow)]
pub struct UsageTotals {
    pub requests: i64,
    pub prompt_tokens: i64,
    pub completion_tokens: i64,
    pub total_tokens: i64,
}

impl UsageTotals {
    pub fn add(&mut self, log: &AiUsageLog) {
        self.requests += 1;
        self.prompt_tokens += log.prompt_tokens;
        self.completion_tokens += log.completion_tokens;
        self.total_tokens += log.total_tokens;
    }
}
