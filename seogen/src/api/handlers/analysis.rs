use crate::{
    analysis::readability::{self, ReadabilityReport},
    api::json::Json,
    api::models::{analysis::ReadabilityRequest, users::CurrentUser},
    errors::{Error, Result},
};

/// Analyze the readability of a piece of content
#[utoipa::path(
    post,
    path = "/analyze/readability",
    tag = "analysis",
    summary = "Readability report",
    description = "Strips markup, then scores the text with Flesch reading ease and lists suggestions.",
    request_body = ReadabilityRequest,
    responses(
        (status = 200, description = "Readability report", body = ReadabilityReport),
        (status = 400, description = "Content is required"),
        (status = 401, description = "Unauthorized"),
    ),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn analyze_readability(_user: CurrentUser, Json(request): Json<ReadabilityRequest>) -> Result<Json<ReadabilityReport>> {
    let content = request.content.unwrap_or_default();
    readability::analyze(&content)
        .map(Json)
        .ok_or_else(|| Error::bad_request("Content is required"))
}

#[cfg(test)]
mod tests {
    use crate::test_utils::*;
    use serde_json::{Value, json};

    #[test_log::test(tokio::test)]
    async fn test_report_shape() {
        let app = create_test_app().await;

        let response = app
            .server
            .post("/analyze/readability")
            .authorization_bearer(USER_TOKEN)
            .json(&json!({ "content": "<p>The cat sat on the mat.</p><p>It was happy.</p>" }))
            .await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["wordCount"], 9);
        assert_eq!(body["sentenceCount"], 2);
        assert_eq!(body["readingTimeMinutes"], 1);
        assert!(body["score"].as_f64().unwrap() <= 100.0);
        assert!(body["level"].is_string());
        assert!(body["suggestions"].is_array());
    }

    #[test_log::test(tokio::test)]
    async fn test_blank_content_is_rejected() {
        let app = create_test_app().await;

        for body in [json!({ "content": "   " }), json!({})] {
            let response = app
                .server
                .post("/analyze/readability")
                .authorization_bearer(USER_TOKEN)
                .json(&body)
                .await;
            response.assert_status_bad_request();
            response.assert_json(&json!({ "error": "Content is required" }));
        }
    }

    #[test_log::test(tokio::test)]
    async fn test_requires_session() {
        let app = create_test_app().await;
        app.server
            .post("/analyze/readability")
            .json(&json!({ "content": "Hello." }))
            .await
            .assert_status_unauthorized();
    }
}
