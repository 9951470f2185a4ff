//! Admin dashboard for AI usage, provider priority and quotas.

use crate::{
    AppState,
    api::handlers::required,
    api::json::Json,
    api::models::{
        SuccessResponse,
        ai_settings::{AiSettingsResponse, UsageLogResponse, UsageTotalsResponse},
        settings::SetSettingRequest,
    },
    auth::current_user::AdminUser,
    db::models::{
        settings::{AI_QUOTAS_KEY, MODEL_PRIORITY_KEY, SettingValue, model_priority_or_default},
        usage::{DEFAULT_RECENT_LOGS, UsageLogFilter},
    },
    errors::{Error, Result},
};
use axum::extract::State;
use serde_json::{Value, json};
use tracing::info;

/// Get AI usage logs, totals, provider priority and quotas
#[utoipa::path(
    get,
    path = "/admin/ai/settings",
    tag = "admin",
    summary = "Get AI settings and usage",
    responses(
        (status = 200, description = "Usage and settings", body = AiSettingsResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - requires admin role"),
        (status = 500, description = "Internal server error"),
    ),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn get_ai_settings(State(state): State<AppState>, _admin: AdminUser) -> Result<Json<AiSettingsResponse>> {
    let logs = state.store.list_usage_logs(&UsageLogFilter::recent(DEFAULT_RECENT_LOGS)).await?;
    let priority = state.store.get_setting(MODEL_PRIORITY_KEY, None).await?;
    let quotas = state.store.get_setting(AI_QUOTAS_KEY, None).await?;
    let totals = state.store.usage_totals(None).await?;

    Ok(Json(AiSettingsResponse {
        logs: logs.into_iter().map(UsageLogResponse::from).collect(),
        priority: model_priority_or_default(priority.as_ref().map(|s| &s.value)),
        usage: totals
            .into_iter()
            .map(|(provider, totals)| (provider.to_string(), UsageTotalsResponse::from(totals)))
            .collect(),
        quotas: quotas.map(|s| s.value).unwrap_or_else(|| json!({})),
    }))
}

/// Update one global AI setting
#[utoipa::path(
    post,
    path = "/admin/ai/settings",
    tag = "admin",
    summary = "Update an AI setting",
    description = "Writes a global setting such as `model_priority` or `ai_quotas`. Values for known keys are validated.",
    request_body = SetSettingRequest,
    responses(
        (status = 200, description = "Setting stored", body = SuccessResponse),
        (status = 400, description = "Missing key or value, or invalid value for a known key"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - requires admin role"),
        (status = 500, description = "Internal server error"),
    ),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn update_ai_settings(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Json(request): Json<SetSettingRequest>,
) -> Result<Json<SuccessResponse>> {
    let key = required("key", request.key)?;
    let value = request.value.ok_or_else(|| Error::missing_field("value"))?;
    let value = SettingValue::parse(&key, value).map_err(Error::bad_request)?;

    let stored: Value = value.into_json();
    state.store.set_setting(&key, None, &stored).await?;
    info!(%key, admin = %admin.id, "Global AI setting updated");

    Ok(Json(SuccessResponse::ok()))
}

#[cfg(test)]
mod tests {
    use crate::db::models::usage::NewUsageLog;
    use crate::db::store::Store;
    use crate::test_utils::*;
    use crate::types::{AiOperation, AiProvider};
    use serde_json::{Value, json};

    #[test_log::test(tokio::test)]
    async fn test_requires_admin() {
        let app = create_test_app().await;

        let response = app.server.get("/admin/ai/settings").await;
        response.assert_status_unauthorized();
        response.assert_json(&json!({ "error": "Unauthorized" }));

        let response = app.server.get("/admin/ai/settings").authorization_bearer(USER_TOKEN).await;
        response.assert_status_forbidden();
        response.assert_json(&json!({ "error": "Forbidden" }));
    }

    #[test_log::test(tokio::test)]
    async fn test_defaults_when_nothing_stored() {
        let app = create_test_app().await;

        let response = app.server.get("/admin/ai/settings").authorization_bearer(ADMIN_TOKEN).await;
        response.assert_status_ok();
        response.assert_json(&json!({
            "logs": [],
            "priority": ["gemini", "openai"],
            "usage": {},
            "quotas": {}
        }));
    }

    #[test_log::test(tokio::test)]
    async fn test_model_priority_round_trip() {
        let app = create_test_app().await;

        let response = app
            .server
            .post("/admin/ai/settings")
            .authorization_bearer(ADMIN_TOKEN)
            .json(&json!({ "key": "model_priority", "value": ["gemini"] }))
            .await;
        response.assert_status_ok();
        response.assert_json(&json!({ "success": true }));

        let body: Value = app.server.get("/admin/ai/settings").authorization_bearer(ADMIN_TOKEN).await.json();
        assert_eq!(body["priority"], json!(["gemini"]));
    }

    #[test_log::test(tokio::test)]
    async fn test_invalid_priority_is_rejected() {
        let app = create_test_app().await;

        let response = app
            .server
            .post("/admin/ai/settings")
            .authorization_bearer(ADMIN_TOKEN)
            .json(&json!({ "key": "model_priority", "value": ["claude"] }))
            .await;
        response.assert_status_bad_request();
        let body: Value = response.json();
        assert!(body["error"].as_str().unwrap().contains("model_priority"));
    }

    #[test_log::test(tokio::test)]
    async fn test_missing_key_is_named() {
        let app = create_test_app().await;

        let response = app
            .server
            .post("/admin/ai/settings")
            .authorization_bearer(ADMIN_TOKEN)
            .json(&json!({ "value": {} }))
            .await;
        response.assert_status_bad_request();
        response.assert_json(&json!({ "error": "Missing required field: key" }));
    }

    #[test_log::test(tokio::test)]
    async fn test_usage_totals_and_quotas() {
        let app = create_test_app().await;
        for (provider, total) in [(AiProvider::Gemini, 10), (AiProvider::Gemini, 20), (AiProvider::OpenAi, 5)] {
            app.store
                .record_usage(&NewUsageLog {
                    user_id: Some(user_id()),
                    provider,
                    model: "m".to_string(),
                    operation: AiOperation::Text,
                    prompt_tokens: total,
                    completion_tokens: 0,
                    total_tokens: total,
                })
                .await
                .unwrap();
        }
        app.server
            .post("/admin/ai/settings")
            .authorization_bearer(ADMIN_TOKEN)
            .json(&json!({ "key": "ai_quotas", "value": { "openai": 100000 } }))
            .await
            .assert_status_ok();

        let body: Value = app.server.get("/admin/ai/settings").authorization_bearer(ADMIN_TOKEN).await.json();
        assert_eq!(body["logs"].as_array().unwrap().len(), 3);
        assert_eq!(body["logs"][0]["totalTokens"], 5);
        assert_eq!(
            body["usage"]["gemini"],
            json!({ "requests": 2, "promptTokens": 30, "completionTokens": 0, "totalTokens": 30 })
        );
        assert_eq!(body["usage"]["openai"]["requests"], 1);
        assert_eq!(body["quotas"], json!({ "openai": 100000 }));
    }
}
