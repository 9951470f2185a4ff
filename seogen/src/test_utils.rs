//! Test harness: a router backed by the in-memory store, with every outside collaborator pointed
//! at one wiremock server.

use crate::{
    Config, build_router, build_state,
    config::{AiConfig, GeminiConfig, OpenAiConfig, SupabaseConfig},
    db::{
        models::articles::{Article, Keyword},
        store::in_memory::InMemoryStore,
    },
    types::{KeywordId, UserId},
};
use axum_test::TestServer;
use chrono::{Duration, Utc};
use serde_json::{Value, json};
use std::sync::Arc;
use url::Url;
use uuid::Uuid;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Access token the auth mock resolves to a plain user
pub const USER_TOKEN: &str = "user-token";
/// Access token the auth mock resolves to an admin
pub const ADMIN_TOKEN: &str = "admin-token";
pub const SERVICE_ROLE_KEY: &str = "service-role-key";

pub fn user_id() -> UserId {
    Uuid::from_u128(0x1111_1111_1111_4111_8111_1111_1111_1111)
}

pub fn admin_id() -> UserId {
    Uuid::from_u128(0xaaaa_aaaa_aaaa_4aaa_8aaa_aaaa_aaaa_aaaa)
}

/// reqwest is built without a default TLS provider; tests install the same one `main` does.
pub fn install_crypto_provider() {
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();
}

pub fn test_client() -> reqwest::Client {
    install_crypto_provider();
    reqwest::Client::new()
}

pub struct TestApp {
    pub server: TestServer,
    pub store: Arc<InMemoryStore>,
    /// Stands in for the auth service, the AI providers, PayOS and publishing sites
    pub upstream: MockServer,
}

/// User object in the shape the auth service returns.
pub fn auth_user_json(id: UserId, role: &str) -> Value {
    json!({
        "id": id,
        "aud": "authenticated",
        "email": format!("{role}@example.com"),
        "app_metadata": { "provider": "email", "role": role },
        "user_metadata": {},
        "created_at": "2025-01-01T00:00:00Z",
        "last_sign_in_at": "2025-06-01T12:00:00Z"
    })
}

async fn mount_session_lookup(upstream: &MockServer) {
    for (token, id, role) in [(USER_TOKEN, user_id(), "user"), (ADMIN_TOKEN, admin_id(), "admin")] {
        Mock::given(method("GET"))
            .and(path("/auth/v1/user"))
            .and(header("authorization", format!("Bearer {token}").as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(auth_user_json(id, role)))
            .mount(upstream)
            .await;
    }
    Mock::given(method("GET"))
        .and(path("/auth/v1/user"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "msg": "invalid JWT" })))
        .with_priority(10)
        .mount(upstream)
        .await;
}

/// Configuration with every collaborator at `upstream`. AI keys, payments and the webhook secret
/// are left unset for tests to opt into.
pub fn create_test_config(upstream: &MockServer) -> Config {
    let base = Url::parse(&upstream.uri()).expect("mock server URI is a valid URL");
    let mut openai_base = base.clone();
    openai_base.set_path("/v1");

    Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        supabase: SupabaseConfig {
            url: base.clone(),
            anon_key: "anon-key".to_string(),
            service_role_key: Some(SERVICE_ROLE_KEY.to_string()),
            session_cookie: "sb-access-token".to_string(),
        },
        ai: AiConfig {
            gemini: GeminiConfig {
                base_url: base,
                ..Default::default()
            },
            openai: OpenAiConfig {
                base_url: openai_base,
                ..Default::default()
            },
        },
        ..Default::default()
    }
}

pub async fn create_test_app() -> TestApp {
    create_test_app_with(|_| {}).await
}

/// Like [`create_test_app`], letting the test adjust the configuration first.
pub async fn create_test_app_with(configure: impl FnOnce(&mut Config)) -> TestApp {
    install_crypto_provider();
    let upstream = MockServer::start().await;
    mount_session_lookup(&upstream).await;

    let mut config = create_test_config(&upstream);
    configure(&mut config);

    let store = Arc::new(InMemoryStore::new());
    let state = build_state(config, store.clone()).expect("Failed to build test state");
    let router = build_router(state).expect("Failed to build router");
    let server = TestServer::new(router).expect("Failed to create test server");

    TestApp {
        server,
        store,
        upstream,
    }
}

pub fn seed_keyword(store: &InMemoryStore, keyword: &str) -> Keyword {
    let keyword = Keyword {
        id: Uuid::new_v4(),
        keyword: keyword.to_string(),
        search_volume: Some(1200),
        difficulty: Some(35),
    };
    store.insert_keyword(keyword.clone());
    keyword
}

/// Seeded articles get strictly increasing creation times.
pub fn seed_article(store: &InMemoryStore, owner: UserId, title: &str, keyword_id: Option<KeywordId>) -> Article {
    static SEEDED: std::sync::atomic::AtomicI64 = std::sync::atomic::AtomicI64::new(0);
    let offset = SEEDED.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
    let created_at = Utc::now() - Duration::days(1) + Duration::seconds(offset);

    let article = Article {
        id: Uuid::new_v4(),
        user_id: owner,
        title: title.to_string(),
        content: format!("<h1>{title}</h1><p>Body text.</p>"),
        slug: None,
        keyword_id,
        image_url: None,
        published_url: None,
        created_at,
        updated_at: created_at,
    };
    store.insert_article(article.clone());
    article
}
