//! Settings request/response models.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::{IntoParams, ToSchema};

use crate::db::models::settings::SmtpSettings;
use crate::errors::{Error, Result};

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(default)]
#[into_params(parameter_in = Query)]
pub struct SettingQuery {
    /// Setting key to read
    pub key: Option<String>,
}

/// Write one setting. `value` must match the shape of known keys
/// (`model_priority`, `ai_quotas`, `seo_config`, `smtp_config`); other keys accept any JSON.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct SetSettingRequest {
    pub key: Option<String>,
    #[schema(value_type = Object)]
    pub value: Option<Value>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SettingValueResponse {
    /// `null` when the key has never been set
    #[schema(value_type = Object, nullable)]
    pub value: Value,
}

/// SMTP settings as typed into the settings form. Every field is optional on the wire so the
/// missing one can be named in the error.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct SmtpSettingsInput {
    pub host: Option<String>,
    pub user: Option<String>,
    pub pass: Option<String>,
    pub port: Option<u16>,
    pub secure: Option<bool>,
    pub from: Option<String>,
}

impl SmtpSettingsInput {
    pub fn validate(self) -> Result<SmtpSettings> {
        fn required(field: &str, value: Option<String>) -> Result<String> {
            value
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| Error::missing_field(field))
        }

        Ok(SmtpSettings {
            host: required("smtp.host", self.host)?.trim().to_string(),
            user: required("smtp.user", self.user)?,
            pass: required("smtp.pass", self.pass)?,
            port: self.port,
            secure: self.secure,
            from: self.from.filter(|f| !f.trim().is_empty()),
        })
    }
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct TestEmailRequest {
    pub smtp: Option<SmtpSettingsInput>,
    pub test_email: Option<String>,
}
