//! Route handlers, one module per resource.
//!
//! Handlers resolve the caller through the [`crate::api::models::users::CurrentUser`] or
//! [`crate::auth::current_user::AdminUser`] extractors, call the store and outbound adapters in
//! sequence, and return [`crate::errors::Error`] for every failure.

pub mod admin_ai_settings;
pub mod admin_users;
pub mod analysis;
pub mod articles;
pub mod health;
pub mod images;
pub mod payments;
pub mod settings;

use crate::errors::{Error, Result};
use uuid::Uuid;

/// A required string field, trimmed. Absent or blank values are reported by name.
pub(crate) fn required(field: &str, value: Option<String>) -> Result<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| Error::missing_field(field))
}

pub(crate) fn parse_uuid(field: &str, value: &str) -> Result<Uuid> {
    value
        .parse()
        .map_err(|_| Error::bad_request(format!("Invalid {field}: '{value}' is not a UUID")))
}
