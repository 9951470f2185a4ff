//! Store models for key/value settings, and the typed view of the keys the service understands.

use crate::types::{AiProvider, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sqlx::FromRow;
use std::collections::{BTreeMap, HashSet};

pub const MODEL_PRIORITY_KEY: &str = "model_priority";
pub const AI_QUOTAS_KEY: &str = "ai_quotas";
pub const SEO_CONFIG_KEY: &str = "seo_config";
pub const SMTP_CONFIG_KEY: &str = "smtp_config";

#[derive(Debug, Clone, FromRow)]
pub struct Setting {
    pub key: String,
    pub user_id: Option<UserId>,
    pub value: Value,
    pub updated_at: DateTime<Utc>,
}

/// SMTP settings as stored under `smtp_config`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SmtpSettings {
    pub host: String,
    pub user: String,
    pub pass: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secure: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
}

/// A setting value checked against the shape its key requires.
#[derive(Debug, Clone, PartialEq)]
pub enum SettingValue {
    ModelPriority(Vec<AiProvider>),
    AiQuotas(BTreeMap<AiProvider, u64>),
    SeoConfig(Map<String, Value>),
    SmtpConfig(SmtpSettings),
    Custom(Value),
}

impl SettingValue {
    /// Validate `value` for `key`. The error message names the key and what was expected.
    pub fn parse(key: &str, value: Value) -> Result<Self, String> {
        match key {
            MODEL_PRIORITY_KEY => parse_model_priority(&value).map(SettingValue::ModelPriority),
            AI_QUOTAS_KEY => parse_quotas(&value).map(SettingValue::AiQuotas),
            SEO_CONFIG_KEY => match value {
                Value::Object(map) => Ok(SettingValue::SeoConfig(map)),
                _ => Err(format!("Invalid value for {SEO_CONFIG_KEY}: expected an object")),
            },
            SMTP_CONFIG_KEY => serde_json::from_value(value)
                .map(SettingValue::SmtpConfig)
                .map_err(|e| format!("Invalid value for {SMTP_CONFIG_KEY}: {e}")),
            _ => Ok(SettingValue::Custom(value)),
        }
    }

    pub fn into_json(self) -> Value {
        match self {
            SettingValue::ModelPriority(providers) => {
                Value::Array(providers.iter().map(|p| Value::String(p.as_str().to_string())).collect())
            }
            SettingValue::AiQuotas(quotas) => Value::Object(
                quotas
                    .into_iter()
                    .map(|(provider, quota)| (provider.as_str().to_string(), Value::from(quota)))
                    .collect(),
            ),
            SettingValue::SeoConfig(map) => Value::Object(map),
            // Serializing a plain struct of strings and numbers cannot fail
            SettingValue::SmtpConfig(smtp) => serde_json::to_value(smtp).unwrap_or(Value::Null),
            SettingValue::Custom(value) => value,
        }
    }
}

pub fn default_model_priority() -> Vec<AiProvider> {
    vec![AiProvider::Gemini, AiProvider::OpenAi]
}

/// Read a stored priority list, falling back to the default when absent or malformed.
pub fn model_priority_or_default(stored: Option<&Value>) -> Vec<AiProvider> {
    stored
        .and_then(|value| parse_model_priority(value).ok())
        .unwrap_or_else(default_model_priority)
}

fn parse_model_priority(value: &Value) -> Result<Vec<AiProvider>, String> {
    let invalid = |detail: &str| format!("Invalid value for {MODEL_PRIORITY_KEY}: {detail}");
    let items = value.as_array().ok_or_else(|| invalid("expected an array of provider names"))?;
    if items.is_empty() {
        return Err(invalid("at least one provider is required"));
    }

    let mut seen = HashSet::new();
    let mut providers = Vec::with_capacity(items.len());
    for item in items {
        let name = item.as_str().ok_or_else(|| invalid("provider names must be strings"))?;
        let provider: AiProvider = name.parse().map_err(|e: String| invalid(&e))?;
        if !seen.insert(provider) {
            return Err(invalid(&format!("duplicate provider '{provider}'")));
        }
        providers.push(provider);
    }
    Ok(providers)
}

fn parse_quotas(value: &Value) -> Result<BTreeMap<AiProvider, u64>, String> {
    let invalid = |detail: &str| format!("Invalid value for {AI_QUOTAS_KEY}: {detail}");
    let object = value.as_object().ok_or_else(|| invalid("expected an object"))?;

    object
        .iter()
        .map(|(name, quota)| {
            let provider: AiProvider = name.parse().map_err(|e: String| invalid(&e))?;
            let quota = quota
                .as_u64()
                .ok_or_else(|| invalid(&format!("quota for '{name}' must be a non-negative integer")))?;
            Ok((provider, quota))
        })
        .collect()
}
