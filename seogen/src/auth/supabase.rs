//! Client for the hosted auth service (Supabase GoTrue).
//!
//! Session lookups use the anon key plus the caller's access token. The admin user API needs the
//! service-role key.

use chrono::{DateTime, Utc};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, instrument};
use url::Url;

use crate::api::models::users::{CurrentUser, Role, UserResponse};
use crate::config::SupabaseConfig;
use crate::providers::{ProviderError, check_status, join_url, read_json};
use crate::types::UserId;

const PROVIDER: &str = "supabase";

/// Page size for the admin user listing
const USERS_PAGE_SIZE: u32 = 1000;

#[derive(Clone)]
pub struct SupabaseAuth {
    client: Client,
    base_url: Url,
    anon_key: String,
    service_role_key: Option<String>,
    users_page_size: u32,
}

/// User object as returned by the auth API.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthUser {
    pub id: UserId,
    pub email: Option<String>,
    #[serde(default)]
    pub app_metadata: Value,
    pub created_at: Option<DateTime<Utc>>,
    pub last_sign_in_at: Option<DateTime<Utc>>,
}

impl AuthUser {
    /// Role from `app_metadata.role`; anything missing or unrecognised is a plain user.
    pub fn role(&self) -> Role {
        self.app_metadata
            .get("role")
            .and_then(Value::as_str)
            .and_then(|role| role.parse().ok())
            .unwrap_or_default()
    }
}

impl From<AuthUser> for CurrentUser {
    fn from(user: AuthUser) -> Self {
        Self {
            id: user.id,
            role: user.role(),
            email: user.email,
        }
    }
}

impl From<AuthUser> for UserResponse {
    fn from(user: AuthUser) -> Self {
        Self {
            id: user.id,
            role: user.role(),
            email: user.email,
            created_at: user.created_at,
            last_sign_in_at: user.last_sign_in_at,
        }
    }
}

#[derive(Debug, Deserialize)]
struct AdminUserList {
    #[serde(default)]
    users: Vec<AuthUser>,
}

impl SupabaseAuth {
    pub fn new(client: Client, config: &SupabaseConfig) -> Self {
        Self {
            client,
            base_url: config.url.clone(),
            anon_key: config.anon_key.clone(),
            service_role_key: config.service_role_key.clone(),
            users_page_size: USERS_PAGE_SIZE,
        }
    }

    fn admin_request(&self, build: impl FnOnce(&Client, Url) -> RequestBuilder, path: &str) -> Result<RequestBuilder, ProviderError> {
        let key = self
            .service_role_key
            .as_deref()
            .ok_or_else(|| ProviderError::NotConfigured("Supabase service role key is not configured".to_string()))?;
        let url = join_url(PROVIDER, &self.base_url, path)?;
        Ok(build(&self.client, url).header("apikey", key).bearer_auth(key))
    }

    /// Resolve an access token to its user. `None` when the token is rejected.
    #[instrument(skip_all)]
    pub async fn get_user(&self, access_token: &str) -> Result<Option<AuthUser>, ProviderError> {
        let url = join_url(PROVIDER, &self.base_url, "auth/v1/user")?;
        let response = self
            .client
            .get(url)
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(ProviderError::transport(PROVIDER))?;

        if matches!(response.status(), StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
            debug!(status = response.status().as_u16(), "Access token rejected");
            return Ok(None);
        }
        let response = check_status(PROVIDER, response).await?;
        Ok(Some(read_json(PROVIDER, response).await?))
    }

    /// Every user, following pages until a short one comes back.
    #[instrument(skip_all)]
    pub async fn list_users(&self) -> Result<Vec<AuthUser>, ProviderError> {
        let mut users = Vec::new();
        for page in 1.. {
            let batch = self.list_users_page(page).await?;
            let last = batch.len() < self.users_page_size as usize;
            users.extend(batch);
            if last {
                break;
            }
        }
        debug!(count = users.len(), "Listed users");
        Ok(users)
    }

    async fn list_users_page(&self, page: u32) -> Result<Vec<AuthUser>, ProviderError> {
        let per_page = self.users_page_size.to_string();
        let request = self.admin_request(
            |c, mut url| {
                url.query_pairs_mut()
                    .append_pair("page", &page.to_string())
                    .append_pair("per_page", &per_page);
                c.get(url)
            },
            "auth/v1/admin/users",
        )?;
        let response = request.send().await.map_err(ProviderError::transport(PROVIDER))?;
        let response = check_status(PROVIDER, response).await?;
        let list: AdminUserList = read_json(PROVIDER, response).await?;
        Ok(list.users)
    }

    /// Create a confirmed user with the given role.
    #[instrument(skip_all, fields(role = %role))]
    pub async fn create_user(&self, email: &str, password: &str, role: Role) -> Result<AuthUser, ProviderError> {
        let request = self.admin_request(|c, url| c.post(url), "auth/v1/admin/users")?;
        let response = request
            .json(&json!({
                "email": email,
                "password": password,
                "email_confirm": true,
                "app_metadata": { "role": role },
            }))
            .send()
            .await
            .map_err(ProviderError::transport(PROVIDER))?;
        let response = check_status(PROVIDER, response).await?;
        read_json(PROVIDER, response).await
    }

    #[instrument(skip_all, fields(role = %role))]
    pub async fn update_user_role(&self, user_id: UserId, role: Role) -> Result<AuthUser, ProviderError> {
        let request = self.admin_request(|c, url| c.put(url), &format!("auth/v1/admin/users/{user_id}"))?;
        let response = request
            .json(&json!({ "app_metadata": { "role": role } }))
            .send()
            .await
            .map_err(ProviderError::transport(PROVIDER))?;
        let response = check_status(PROVIDER, response).await?;
        read_json(PROVIDER, response).await
    }

    #[instrument(skip_all)]
    pub async fn delete_user(&self, user_id: UserId) -> Result<(), ProviderError> {
        let request = self.admin_request(|c, url| c.delete(url), &format!("auth/v1/admin/users/{user_id}"))?;
        let response = request.send().await.map_err(ProviderError::transport(PROVIDER))?;
        check_status(PROVIDER, response).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn auth_for(server: &MockServer, service_role_key: Option<&str>) -> SupabaseAuth {
        let config = SupabaseConfig {
            url: Url::parse(&server.uri()).unwrap(),
            anon_key: "anon".to_string(),
            service_role_key: service_role_key.map(str::to_string),
            session_cookie: "sb-access-token".to_string(),
        };
        SupabaseAuth::new(crate::test_utils::test_client(), &config)
    }

    fn user_json(id: &str, role: Option<&str>) -> Value {
        json!({
            "id": id,
            "aud": "authenticated",
            "email": "someone@example.com",
            "app_metadata": match role {
                Some(role) => json!({ "provider": "email", "role": role }),
                None => json!({ "provider": "email" }),
            },
            "user_metadata": {},
            "created_at": "2025-01-01T00:00:00Z",
            "last_sign_in_at": null
        })
    }

    #[tokio::test]
    async fn test_get_user_reads_role() {
        let server = MockServer::start().await;
        let id = "5d1e8f8e-8a8e-4c5f-9e55-6f1b0f1c2d3e";
        Mock::given(method("GET"))
            .and(path("/auth/v1/user"))
            .and(header("apikey", "anon"))
            .and(header("authorization", "Bearer token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(user_json(id, Some("editor"))))
            .mount(&server)
            .await;

        let user = auth_for(&server, None).get_user("token").await.unwrap().unwrap();
        assert_eq!(user.id.to_string(), id);
        assert_eq!(user.role(), Role::Editor);
    }

    #[tokio::test]
    async fn test_rejected_token_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/auth/v1/user"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "msg": "invalid JWT" })))
            .mount(&server)
            .await;

        assert!(auth_for(&server, None).get_user("expired").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_missing_role_defaults_to_user() {
        let user: AuthUser = serde_json::from_value(user_json("5d1e8f8e-8a8e-4c5f-9e55-6f1b0f1c2d3e", None)).unwrap();
        assert_eq!(user.role(), Role::User);
    }

    #[tokio::test]
    async fn test_admin_calls_need_service_role_key() {
        let server = MockServer::start().await;
        let err = auth_for(&server, None).list_users().await.unwrap_err();
        assert!(matches!(err, ProviderError::NotConfigured(_)));
    }

    #[tokio::test]
    async fn test_list_users_follows_pages() {
        let server = MockServer::start().await;
        let ids = [
            "5d1e8f8e-8a8e-4c5f-9e55-6f1b0f1c2d31",
            "5d1e8f8e-8a8e-4c5f-9e55-6f1b0f1c2d32",
            "5d1e8f8e-8a8e-4c5f-9e55-6f1b0f1c2d33",
        ];
        Mock::given(method("GET"))
            .and(path("/auth/v1/admin/users"))
            .and(query_param("page", "1"))
            .and(query_param("per_page", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "users": [user_json(ids[0], None), user_json(ids[1], Some("admin"))]
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/auth/v1/admin/users"))
            .and(query_param("page", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "users": [user_json(ids[2], None)] })))
            .expect(1)
            .mount(&server)
            .await;

        let mut auth = auth_for(&server, Some("service"));
        auth.users_page_size = 2;
        let users = auth.list_users().await.unwrap();

        assert_eq!(users.iter().map(|u| u.id.to_string()).collect::<Vec<_>>(), ids);
        assert_eq!(users[1].role(), Role::Admin);
    }

    #[tokio::test]
    async fn test_create_user_sets_role_in_app_metadata() {
        let server = MockServer::start().await;
        let id = "5d1e8f8e-8a8e-4c5f-9e55-6f1b0f1c2d3e";
        Mock::given(method("POST"))
            .and(path("/auth/v1/admin/users"))
            .and(header("apikey", "service"))
            .and(header("authorization", "Bearer service"))
            .and(body_partial_json(json!({
                "email": "new@example.com",
                "email_confirm": true,
                "app_metadata": { "role": "admin" }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(user_json(id, Some("admin"))))
            .expect(1)
            .mount(&server)
            .await;

        let user = auth_for(&server, Some("service"))
            .create_user("new@example.com", "secret123", Role::Admin)
            .await
            .unwrap();
        assert_eq!(user.role(), Role::Admin);
    }

    #[tokio::test]
    async fn test_admin_error_is_relayed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/admin/users"))
            .respond_with(ResponseTemplate::new(422).set_body_json(json!({
                "code": 422,
                "error_code": "email_exists",
                "msg": "A user with this email address has already been registered"
            })))
            .mount(&server)
            .await;

        let err = auth_for(&server, Some("service"))
            .create_user("dup@example.com", "secret123", Role::User)
            .await
            .unwrap_err();
        assert_eq!(err.code().as_deref(), Some("422"));
        assert!(err.to_string().contains("already been registered"));
    }
}
