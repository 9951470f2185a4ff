//! Per-user settings and the SMTP test action.

use crate::{
    AppState,
    api::handlers::required,
    api::json::Json,
    api::models::{
        SuccessResponse,
        settings::{SetSettingRequest, SettingQuery, SettingValueResponse, TestEmailRequest},
        users::CurrentUser,
    },
    db::models::settings::SettingValue,
    email::EmailService,
    errors::{Error, Result},
    types::abbrev_uuid,
};
use axum::extract::{Query, State};
use serde_json::Value;
use tracing::debug;

/// Read one of the caller's settings
#[utoipa::path(
    get,
    path = "/settings",
    tag = "settings",
    summary = "Get setting",
    params(SettingQuery),
    responses(
        (status = 200, description = "Stored value, or null when unset", body = SettingValueResponse),
        (status = 400, description = "Missing key"),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error"),
    ),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all, fields(user_id = %abbrev_uuid(&user.id)))]
pub async fn get_setting(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<SettingQuery>,
) -> Result<Json<SettingValueResponse>> {
    let key = required("key", query.key)?;
    let setting = state.store.get_setting(&key, Some(user.id)).await?;
    Ok(Json(SettingValueResponse {
        value: setting.map(|s| s.value).unwrap_or(Value::Null),
    }))
}

/// Write one of the caller's settings
#[utoipa::path(
    post,
    path = "/settings",
    tag = "settings",
    summary = "Set setting",
    request_body = SetSettingRequest,
    responses(
        (status = 200, description = "Setting stored", body = SuccessResponse),
        (status = 400, description = "Missing key or value, or invalid value for a known key"),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error"),
    ),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all, fields(user_id = %abbrev_uuid(&user.id)))]
pub async fn set_setting(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(request): Json<SetSettingRequest>,
) -> Result<Json<SuccessResponse>> {
    let key = required("key", request.key)?;
    let value = request.value.ok_or_else(|| Error::missing_field("value"))?;
    let value = SettingValue::parse(&key, value).map_err(Error::bad_request)?;

    state.store.set_setting(&key, Some(user.id), &value.into_json()).await?;
    debug!(%key, "Setting stored");

    Ok(Json(SuccessResponse::ok()))
}

/// Send a test message through caller-supplied SMTP settings
#[utoipa::path(
    post,
    path = "/settings/test-email",
    tag = "settings",
    summary = "Send SMTP test email",
    request_body = TestEmailRequest,
    responses(
        (status = 200, description = "Message accepted by the SMTP server", body = SuccessResponse),
        (status = 400, description = "Missing SMTP field or testEmail, or invalid address"),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "SMTP delivery failed"),
    ),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all, fields(user_id = %abbrev_uuid(&user.id)))]
pub async fn send_test_email(user: CurrentUser, Json(request): Json<TestEmailRequest>) -> Result<Json<SuccessResponse>> {
    let smtp = request.smtp.ok_or_else(|| Error::missing_field("smtp"))?.validate()?;
    let to = required("testEmail", request.test_email)?;

    EmailService::from_smtp(&smtp)?.send_test_email(&to).await?;
    Ok(Json(SuccessResponse::ok()))
}
