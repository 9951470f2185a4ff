//! # seogen: backend for an SEO content-generation dashboard
//!
//! `seogen` serves the JSON API behind the dashboard. It has no algorithmic core of its own: each
//! route resolves the caller against the hosted auth service, then reads or writes the store or
//! relays to an outside provider.
//!
//! ## Collaborators
//!
//! - **Hosted auth** ([`auth::supabase`]): session lookup and the admin user API
//! - **Store** ([`db::store`]): settings, AI usage logs, articles, keywords and transactions,
//!   in Postgres or in memory
//! - **AI providers** ([`providers`]): Gemini and OpenAI-compatible text generation, image generation
//! - **Payments** ([`payment_providers`]): PayOS payment links
//! - **Email** ([`email`]): SMTP test messages built from caller-supplied settings
//! - **Publishing** ([`publishing`]): pushing finished articles to third-party sites
//!
//! Everything is built once at startup and handed to handlers through [`AppState`].
//!
//! ## Quick Start
//!
//! ```no_run
//! use clap::Parser;
//! use seogen::{Application, Config, config::Args, telemetry};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load(&Args::parse())?;
//!     telemetry::init_telemetry(config.enable_otel_export)?;
//!
//!     Application::new(config).await?.serve(async {
//!         let _ = tokio::signal::ctrl_c().await;
//!     }).await
//! }
//! ```
pub mod analysis;
pub mod api;
pub mod auth;
pub mod config;
pub mod db;
mod email;
pub mod errors;
mod openapi;
pub mod payment_providers;
pub mod providers;
mod publishing;
pub mod telemetry;
pub mod types;

#[cfg(test)]
pub mod test_utils;

use crate::{
    auth::supabase::SupabaseAuth, config::CorsOrigin, db::store::Store, openapi::ApiDoc, payment_providers::PaymentProvider,
    providers::AiProviders,
};
use axum::{
    Router,
    http::{self, HeaderValue},
    routing::{get, post},
};
use bon::Builder;
pub use config::Config;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{Level, debug, info, instrument};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

/// Shared resources handed to every request handler.
///
/// ```ignore
/// let state = AppState::builder()
///     .config(config)
///     .store(store)
///     .auth(auth)
///     .ai(Arc::new(ai))
///     .http(http)
///     .maybe_payments(payments)
///     .build();
/// ```
#[derive(Clone, Builder)]
pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn Store>,
    pub auth: SupabaseAuth,
    pub ai: Arc<AiProviders>,
    /// `None` when no payment provider is configured
    pub payments: Option<Arc<dyn PaymentProvider>>,
    /// Shared outbound client, with the configured request timeout
    pub http: reqwest::Client,
}

/// Outbound HTTP client shared by every adapter.
pub fn build_http_client(config: &Config) -> anyhow::Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .timeout(config.http.request_timeout)
        .user_agent(concat!("seogen/", env!("CARGO_PKG_VERSION")))
        .build()?;
    Ok(client)
}

/// Build the state from configuration around an already constructed store.
pub fn build_state(config: Config, store: Arc<dyn Store>) -> anyhow::Result<AppState> {
    let http = build_http_client(&config)?;
    let auth = SupabaseAuth::new(http.clone(), &config.supabase);
    let ai = AiProviders::from_config(&config.ai, &http);
    if ai.configured().is_empty() {
        info!("No AI provider API key configured; generation routes will fail");
    }
    let payments = config
        .payment
        .clone()
        .map(|payment| payment_providers::create_provider(payment, http.clone()));

    Ok(AppState::builder()
        .config(config)
        .store(store)
        .auth(auth)
        .ai(Arc::new(ai))
        .maybe_payments(payments)
        .http(http)
        .build())
}

fn create_cors_layer(config: &Config) -> anyhow::Result<CorsLayer> {
    let mut origins = Vec::new();
    for origin in &config.cors.allowed_origins {
        let header_value = match origin {
            CorsOrigin::Wildcard => "*".parse::<HeaderValue>()?,
            // Origins never carry a path; Url's serialization adds a trailing slash
            CorsOrigin::Url(url) => url.as_str().trim_end_matches('/').parse::<HeaderValue>()?,
        };
        origins.push(header_value);
    }

    let mut cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([http::Method::GET, http::Method::POST, http::Method::PATCH, http::Method::DELETE])
        .allow_headers([http::header::CONTENT_TYPE, http::header::AUTHORIZATION])
        .allow_credentials(config.cors.allow_credentials);

    if let Some(max_age) = config.cors.max_age {
        cors = cors.max_age(std::time::Duration::from_secs(max_age));
    }

    Ok(cors)
}

/// Build the router with every route, the API docs, CORS and request tracing.
#[instrument(skip_all)]
pub fn build_router(state: AppState) -> anyhow::Result<Router> {
    use api::handlers::{admin_ai_settings, admin_users, analysis, articles, health, images, payments, settings};

    let cors = create_cors_layer(&state.config)?;

    let routes = Router::new()
        .route(
            "/admin/ai/settings",
            get(admin_ai_settings::get_ai_settings).post(admin_ai_settings::update_ai_settings),
        )
        .route(
            "/admin/users",
            get(admin_users::list_users)
                .post(admin_users::create_user)
                .patch(admin_users::update_user_role)
                .delete(admin_users::delete_user),
        )
        .route("/analyze/readability", post(analysis::analyze_readability))
        .route("/articles", get(articles::list_articles))
        .route("/articles/publish", post(articles::publish_article))
        .route("/generate/image", post(images::generate_image))
        .route("/payment/create-link", post(payments::create_payment_link))
        .route("/settings", get(settings::get_setting).post(settings::set_setting))
        .route("/settings/test-email", post(settings::send_test_email))
        .route("/healthz", get(health::healthz))
        .with_state(state);

    let router = routes
        .merge(Scalar::with_url("/docs", ApiDoc::openapi()))
        .layer(
            ServiceBuilder::new()
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                        .on_request(DefaultOnRequest::new().level(Level::DEBUG))
                        .on_response(DefaultOnResponse::new().level(Level::INFO)),
                )
                .layer(cors),
        );

    debug!("Router built");
    Ok(router)
}

/// A configured, not yet listening, server.
pub struct Application {
    router: Router,
    config: Config,
}

impl Application {
    /// Connect the store (running migrations when configured) and build the router.
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        debug!("Starting seogen with configuration: {:#?}", config);

        let store = db::store::create_store(&config.database).await?;
        let state = build_state(config.clone(), store)?;
        let router = build_router(state)?;

        Ok(Self { router, config })
    }

    #[cfg(test)]
    pub fn into_test_server(self) -> axum_test::TestServer {
        axum_test::TestServer::new(self.router).expect("Failed to create test server")
    }

    /// Serve until `shutdown` resolves.
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!("seogen listening on http://{}, docs at /docs", bind_addr);

        axum::serve(listener, self.router).with_graceful_shutdown(shutdown).await?;

        info!("Shutting down telemetry...");
        telemetry::shutdown_telemetry();
        Ok(())
    }
}
