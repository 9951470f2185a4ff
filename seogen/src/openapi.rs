//! OpenAPI document for the HTTP API, served by Scalar at `/docs`.

use utoipa::{
    Modify, OpenApi,
    openapi::security::{ApiKey, ApiKeyValue, HttpAuthScheme, HttpBuilder, SecurityScheme},
};

use crate::api;

/// Session credentials: the auth service's access token, as a cookie or a bearer header.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.security_schemes.insert(
                "BearerAuth".to_string(),
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("Access token issued by the hosted auth service"))
                        .build(),
                ),
            );
            components.security_schemes.insert(
                "CookieAuth".to_string(),
                SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::new("sb-access-token"))),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(title = "seogen", description = "Backend for the SEO content dashboard"),
    modifiers(&SecurityAddon),
    paths(
        api::handlers::health::healthz,
        api::handlers::admin_ai_settings::get_ai_settings,
        api::handlers::admin_ai_settings::update_ai_settings,
        api::handlers::admin_users::list_users,
        api::handlers::admin_users::create_user,
        api::handlers::admin_users::update_user_role,
        api::handlers::admin_users::delete_user,
        api::handlers::analysis::analyze_readability,
        api::handlers::articles::list_articles,
        api::handlers::articles::publish_article,
        api::handlers::images::generate_image,
        api::handlers::payments::create_payment_link,
        api::handlers::settings::get_setting,
        api::handlers::settings::set_setting,
        api::handlers::settings::send_test_email,
    ),
    components(
        schemas(
            crate::errors::ErrorBody,
            crate::types::AiProvider,
            crate::types::AiOperation,
            crate::analysis::readability::ReadabilityReport,
            api::models::SuccessResponse,
            api::models::ai_settings::AiSettingsResponse,
            api::models::ai_settings::UsageLogResponse,
            api::models::ai_settings::UsageTotalsResponse,
            api::models::analysis::ReadabilityRequest,
            api::models::articles::ArticleResponse,
            api::models::articles::ArticleListResponse,
            api::models::articles::KeywordResponse,
            api::models::articles::PublishArticleRequest,
            api::models::articles::PublishArticleResponse,
            api::models::images::GenerateImageRequest,
            api::models::images::GenerateImageResponse,
            api::models::payments::CreatePaymentLinkRequest,
            api::models::payments::PaymentLinkResponse,
            api::models::settings::SetSettingRequest,
            api::models::settings::SettingValueResponse,
            api::models::settings::SmtpSettingsInput,
            api::models::settings::TestEmailRequest,
            api::models::users::Role,
            api::models::users::UserResponse,
            api::models::users::UserListResponse,
            api::models::users::UserEnvelope,
            api::models::users::CreateUserRequest,
            api::models::users::UpdateUserRoleRequest,
            api::models::users::DeleteUserRequest,
        )
    ),
    tags(
        (name = "admin", description = "User management and AI usage (admin role)"),
        (name = "articles", description = "Article listing and publishing"),
        (name = "generation", description = "AI image generation"),
        (name = "analysis", description = "Content analysis"),
        (name = "payments", description = "Payment links"),
        (name = "settings", description = "Per-user settings"),
        (name = "health", description = "Liveness"),
    )
)]
pub struct ApiDoc;
