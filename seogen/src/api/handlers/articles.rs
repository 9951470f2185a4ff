//! Article listing and publishing.

use crate::{
    AppState,
    api::handlers::{parse_uuid, required},
    api::json::Json,
    api::models::{
        articles::{ArticleListResponse, ArticleResponse, PublishArticleRequest, PublishArticleResponse},
        users::CurrentUser,
    },
    db::models::articles::{Article, Keyword},
    errors::{Error, Result},
    providers::ProviderError,
    publishing::{ArticlePayload, ArticlePublisher},
    types::{ArticleId, abbrev_uuid},
};
use axum::extract::State;
use futures::future::try_join_all;
use tracing::{debug, info};
use url::Url;

/// Load an article the caller may act on. Articles owned by someone else are reported as missing
/// unless the caller is an admin.
pub(crate) async fn owned_article(state: &AppState, user: &CurrentUser, id: ArticleId) -> Result<Article> {
    let not_found = || Error::NotFound {
        resource: "Article".to_string(),
        id: id.to_string(),
    };
    let article = state.store.get_article(id).await?.ok_or_else(not_found)?;
    if article.user_id != user.id && !user.is_admin() {
        debug!(article_id = %abbrev_uuid(&id), "Article belongs to another user");
        return Err(not_found());
    }
    Ok(article)
}

async fn keyword_for(state: &AppState, article: &Article) -> Result<Option<Keyword>> {
    match article.keyword_id {
        Some(id) => Ok(state.store.get_keyword(id).await?),
        None => Ok(None),
    }
}

/// List the caller's articles with their keywords
#[utoipa::path(
    get,
    path = "/articles",
    tag = "articles",
    summary = "List articles",
    description = "The caller's articles, newest first, each with its target keyword resolved (or null).",
    responses(
        (status = 200, description = "Articles", body = ArticleListResponse),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error"),
    ),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all, fields(user_id = %abbrev_uuid(&user.id)))]
pub async fn list_articles(State(state): State<AppState>, user: CurrentUser) -> Result<Json<ArticleListResponse>> {
    let articles = state.store.list_articles(user.id).await?;

    // One lookup per article, all in flight together
    let keywords = try_join_all(articles.iter().map(|article| keyword_for(&state, article))).await?;

    let data = articles
        .into_iter()
        .zip(keywords)
        .map(|(article, keyword)| ArticleResponse::new(article, keyword))
        .collect();
    Ok(Json(ArticleListResponse { data }))
}

/// Publish an article to a third-party site
#[utoipa::path(
    post,
    path = "/articles/publish",
    tag = "articles",
    summary = "Publish article",
    description = "Posts the article to `{siteUrl}/receive-article` with the shared webhook secret and stores the returned link. \
                   siteUrl must be one of the configured publishing sites.",
    request_body = PublishArticleRequest,
    responses(
        (status = 200, description = "Published", body = PublishArticleResponse),
        (status = 400, description = "Missing or invalid articleId, or siteUrl not a configured site"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Article not found"),
        (status = 500, description = "Receiving site error or webhook secret not configured"),
    ),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all, fields(user_id = %abbrev_uuid(&user.id)))]
pub async fn publish_article(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(request): Json<PublishArticleRequest>,
) -> Result<Json<PublishArticleResponse>> {
    let article_id = parse_uuid("articleId", &required("articleId", request.article_id)?)?;
    let site_url = required("siteUrl", request.site_url)?;
    let site_url = Url::parse(&site_url).map_err(|e| Error::bad_request(format!("Invalid siteUrl '{site_url}': {e}")))?;
    if !matches!(site_url.scheme(), "http" | "https") {
        return Err(Error::bad_request("Invalid siteUrl: only http and https are supported"));
    }
    if !state.config.is_publish_site(&site_url) {
        debug!(site = %site_url, "Publish to unlisted site refused");
        return Err(Error::bad_request(format!("Invalid siteUrl: '{site_url}' is not a configured publishing site")));
    }

    let secret = state
        .config
        .webhook_secret
        .clone()
        .ok_or_else(|| ProviderError::NotConfigured("Webhook secret is not configured".to_string()))?;

    let article = owned_article(&state, &user, article_id).await?;
    let keyword = keyword_for(&state, &article).await?;
    let slug = article.slug_or_derived();
    let payload = ArticlePayload {
        title: &article.title,
        content: &article.content,
        slug: &slug,
        image_url: article.image_url.as_deref(),
        keyword: keyword.as_ref().map(|k| k.keyword.as_str()),
    };

    let link = ArticlePublisher::new(state.http.clone(), secret)
        .publish(&site_url, &payload)
        .await?;
    state.store.update_article_published_url(article.id, &link).await?;
    info!(article_id = %abbrev_uuid(&article.id), %link, "Article published");

    Ok(Json(PublishArticleResponse { success: true, link }))
}

#[cfg(test)]
mod tests {
    use crate::db::store::Store;
    use crate::test_utils::*;
    use serde_json::{Value, json};
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, ResponseTemplate};

    /// Publishing enabled for the mock site root and its `/blog` path.
    fn with_publishing(config: &mut crate::Config) {
        config.webhook_secret = Some("shh".to_string());
        config.publish_sites = vec![config.supabase.url.clone(), config.supabase.url.join("blog").unwrap()];
    }

    #[test_log::test(tokio::test)]
    async fn test_list_requires_session() {
        let app = create_test_app().await;
        let response = app.server.get("/articles").await;
        response.assert_status_unauthorized();
        response.assert_json(&json!({ "error": "Unauthorized" }));
    }

    #[test_log::test(tokio::test)]
    async fn test_list_enriches_with_keywords() {
        let app = create_test_app().await;
        let keyword = seed_keyword(&app.store, "rust web frameworks");
        let with_keyword = seed_article(&app.store, user_id(), "Choosing a framework", Some(keyword.id));
        let without_keyword = seed_article(&app.store, user_id(), "Untargeted notes", None);
        let dangling = seed_article(&app.store, user_id(), "Old draft", Some(uuid::Uuid::new_v4()));
        seed_article(&app.store, admin_id(), "Someone else's", None);

        let response = app.server.get("/articles").authorization_bearer(USER_TOKEN).await;
        response.assert_status_ok();
        let body: Value = response.json();
        let data = body["data"].as_array().unwrap();
        assert_eq!(data.len(), 3);

        let find = |id: uuid::Uuid| data.iter().find(|a| a["id"] == id.to_string()).unwrap();
        assert_eq!(find(with_keyword.id)["keyword"]["keyword"], "rust web frameworks");
        assert_eq!(find(with_keyword.id)["keywordId"], keyword.id.to_string());
        assert!(find(without_keyword.id)["keyword"].is_null());
        assert!(find(dangling.id)["keyword"].is_null());
    }

    #[test_log::test(tokio::test)]
    async fn test_publish_posts_article_and_stores_link() {
        let app = create_test_app_with(with_publishing).await;
        let keyword = seed_keyword(&app.store, "seo tips");
        let article = seed_article(&app.store, user_id(), "Ten SEO Tips!", Some(keyword.id));

        Mock::given(method("POST"))
            .and(path("/blog/receive-article"))
            .and(header("authorization", "Bearer shh"))
            .and(body_partial_json(json!({
                "title": "Ten SEO Tips!",
                "slug": "ten-seo-tips",
                "keyword": "seo tips"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "link": "https://blog.example.com/ten-seo-tips"
            })))
            .expect(1)
            .mount(&app.upstream)
            .await;

        let response = app
            .server
            .post("/articles/publish")
            .authorization_bearer(USER_TOKEN)
            .json(&json!({ "articleId": article.id.to_string(), "siteUrl": format!("{}/blog", app.upstream.uri()) }))
            .await;
        response.assert_status_ok();
        response.assert_json(&json!({ "success": true, "link": "https://blog.example.com/ten-seo-tips" }));

        let stored = app.store.get_article(article.id).await.unwrap().unwrap();
        assert_eq!(stored.published_url.as_deref(), Some("https://blog.example.com/ten-seo-tips"));
    }

    #[test_log::test(tokio::test)]
    async fn test_publish_secret_mismatch() {
        let app = create_test_app_with(|config| {
            with_publishing(config);
            config.webhook_secret = Some("wrong".to_string());
        })
        .await;
        let article = seed_article(&app.store, user_id(), "Title", None);
        Mock::given(method("POST"))
            .and(path("/receive-article"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "error": "Unauthorized" })))
            .mount(&app.upstream)
            .await;

        let response = app
            .server
            .post("/articles/publish")
            .authorization_bearer(USER_TOKEN)
            .json(&json!({ "articleId": article.id.to_string(), "siteUrl": app.upstream.uri() }))
            .await;
        response.assert_status_internal_server_error();
        let body: Value = response.json();
        assert!(body["error"].as_str().unwrap().contains("secret mismatch"));

        let stored = app.store.get_article(article.id).await.unwrap().unwrap();
        assert!(stored.published_url.is_none());
    }

    #[test_log::test(tokio::test)]
    async fn test_publish_someone_elses_article_is_not_found() {
        let app = create_test_app_with(with_publishing).await;
        let article = seed_article(&app.store, admin_id(), "Admin's", None);

        let response = app
            .server
            .post("/articles/publish")
            .authorization_bearer(USER_TOKEN)
            .json(&json!({ "articleId": article.id.to_string(), "siteUrl": app.upstream.uri() }))
            .await;
        response.assert_status_not_found();
        response.assert_json(&json!({ "error": format!("Article {} not found", article.id) }));
    }

    #[test_log::test(tokio::test)]
    async fn test_publish_to_unlisted_site_never_sends_secret() {
        let app = create_test_app_with(with_publishing).await;
        let article = seed_article(&app.store, user_id(), "Title", None);
        Mock::given(method("POST"))
            .and(path("/elsewhere/receive-article"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true, "link": "https://x" })))
            .expect(0)
            .mount(&app.upstream)
            .await;

        let response = app
            .server
            .post("/articles/publish")
            .authorization_bearer(USER_TOKEN)
            .json(&json!({ "articleId": article.id.to_string(), "siteUrl": format!("{}/elsewhere", app.upstream.uri()) }))
            .await;
        response.assert_status_bad_request();
        let body: Value = response.json();
        assert!(body["error"].as_str().unwrap().contains("not a configured publishing site"));

        let stored = app.store.get_article(article.id).await.unwrap().unwrap();
        assert!(stored.published_url.is_none());
    }

    #[test_log::test(tokio::test)]
    async fn test_publish_validation() {
        let app = create_test_app_with(with_publishing).await;

        let response = app
            .server
            .post("/articles/publish")
            .authorization_bearer(USER_TOKEN)
            .json(&json!({ "siteUrl": "https://blog.example.com" }))
            .await;
        response.assert_status_bad_request();
        response.assert_json(&json!({ "error": "Missing required field: articleId" }));

        let response = app
            .server
            .post("/articles/publish")
            .authorization_bearer(USER_TOKEN)
            .json(&json!({ "articleId": uuid::Uuid::new_v4().to_string(), "siteUrl": "ftp://blog.example.com" }))
            .await;
        response.assert_status_bad_request();
    }
}
