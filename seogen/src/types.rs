//! Common type definitions shared across the API, store and provider layers.
//!
//! # ID Types
//!
//! Entity IDs are UUIDs wrapped in type aliases:
//!
//! - [`UserId`]: account identifier issued by the hosted auth service
//! - [`ArticleId`]: article identifier
//! - [`KeywordId`]: keyword identifier
//!
//! Payment transactions are keyed by [`OrderCode`], the integer the payment provider requires.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;

pub type UserId = Uuid;
pub type ArticleId = Uuid;
pub type KeywordId = Uuid;

/// Order codes must stay within the integer range JavaScript clients can represent exactly.
pub type OrderCode = i64;

/// Largest order code accepted by the payment provider (2^53 - 1).
pub const MAX_ORDER_CODE: OrderCode = 9_007_199_254_740_991;

/// Abbreviate a UUID to its first 8 characters for more readable logs and traces
/// Example: "550e8400-e29b-41d4-a716-446655440000" -> "550e8400"
pub fn abbrev_uuid(uuid: &Uuid) -> String {
    uuid.to_string().chars().take(8).collect()
}

/// AI providers the service knows how to talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "text", rename_all = "lowercase")]
pub enum AiProvider {
    Gemini,
    OpenAi,
}

impl AiProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            AiProvider::Gemini => "gemini",
            AiProvider::OpenAi => "openai",
        }
    }
}

impl fmt::Display for AiProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AiProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gemini" => Ok(AiProvider::Gemini),
            "openai" => Ok(AiProvider::OpenAi),
            other => Err(format!("unknown AI provider '{other}'")),
        }
    }
}

/// What a usage log entry was recorded for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "text", rename_all = "lowercase")]
pub enum AiOperation {
    Text,
    Image,
}

impl AiOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            AiOperation::Text => "text",
            AiOperation::Image => "image",
        }
    }
}
