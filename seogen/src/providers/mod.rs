//! Outbound adapters for AI text and image generation.
//!
//! Each adapter builds one request, awaits one response and either normalizes it or fails with a
//! [`ProviderError`] that carries the provider's status and body. [`AiProviders`] picks the text
//! provider according to the stored `model_priority` setting and appends a usage log entry after
//! every successful call.

pub mod gemini;
pub mod openai;

use crate::config::AiConfig;
use crate::db::models::settings::{MODEL_PRIORITY_KEY, model_priority_or_default};
use crate::db::models::usage::NewUsageLog;
use crate::db::store::Store;
use crate::errors::Result;
use crate::types::{AiOperation, AiProvider, UserId, abbrev_uuid};
use async_trait::async_trait;
use reqwest::Response;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, instrument, warn};
use url::Url;

/// Failure talking to an external collaborator.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The provider answered with a non-success HTTP status
    #[error("{provider} API error {status}: {message}")]
    Api {
        provider: &'static str,
        status: u16,
        message: String,
        body: String,
    },

    /// The provider answered 2xx but refused the request with its own result code
    #[error("{provider} rejected the request ({code}): {message}")]
    Rejected {
        provider: &'static str,
        code: String,
        message: String,
    },

    /// The request never got a response
    #[error("{provider} request failed: {source}")]
    Transport {
        provider: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{provider} returned an unexpected response: {message}")]
    InvalidResponse { provider: &'static str, message: String },

    /// The adapter needed for the operation has no credentials
    #[error("{0}")]
    NotConfigured(String),

    #[error("Email delivery failed: {0}")]
    Email(String),
}

impl ProviderError {
    /// Provider-side code surfaced in the error envelope
    pub fn code(&self) -> Option<String> {
        match self {
            ProviderError::Api { status, .. } => Some(status.to_string()),
            ProviderError::Rejected { code, .. } => Some(code.clone()),
            _ => None,
        }
    }

    /// Raw provider body, when there is one worth relaying
    pub fn details(&self) -> Option<String> {
        match self {
            ProviderError::Api { body, .. } if !body.trim().is_empty() => Some(body.clone()),
            _ => None,
        }
    }

    pub(crate) fn transport(provider: &'static str) -> impl FnOnce(reqwest::Error) -> ProviderError {
        move |source| ProviderError::Transport { provider, source }
    }
}

/// Pass successful responses through; turn anything else into [`ProviderError::Api`].
pub(crate) async fn check_status(provider: &'static str, response: Response) -> std::result::Result<Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = extract_error_message(&body).unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string());
    warn!(provider, status = status.as_u16(), "Provider returned an error response");
    Err(ProviderError::Api {
        provider,
        status: status.as_u16(),
        message,
        body,
    })
}

/// Read a JSON body, reporting undecodable payloads as [`ProviderError::InvalidResponse`].
pub(crate) async fn read_json<T: DeserializeOwned>(provider: &'static str, response: Response) -> std::result::Result<T, ProviderError> {
    let body = response.text().await.map_err(ProviderError::transport(provider))?;
    serde_json::from_str(&body).map_err(|e| ProviderError::InvalidResponse {
        provider,
        message: e.to_string(),
    })
}

/// Pull a human-readable message out of the error bodies the providers we talk to return:
/// `{"error": {"message": ..}}`, `{"error": ".."}`, `{"msg": ..}`, `{"message": ..}` or `{"desc": ..}`.
fn extract_error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    let candidates = [
        value.pointer("/error/message"),
        value.get("error_description"),
        value.get("error"),
        value.get("msg"),
        value.get("message"),
        value.get("desc"),
    ];
    candidates
        .into_iter()
        .flatten()
        .find_map(|v| v.as_str().map(str::to_string))
}

/// Makes sure a url has a trailing slash.
///
/// `Url::join` replaces the last path segment unless the base ends in '/', so joining
/// '/v1' with 'chat/completions' would give '/chat/completions'. Call this before `.join`.
pub(crate) fn ensure_slash(url: &Url) -> Url {
    if url.path().ends_with('/') {
        url.clone()
    } else {
        let mut new_url = url.clone();
        let mut path = new_url.path().to_string();
        path.push('/');
        new_url.set_path(&path);
        new_url
    }
}

pub(crate) fn join_url(provider: &'static str, base: &Url, path: &str) -> std::result::Result<Url, ProviderError> {
    ensure_slash(base).join(path).map_err(|e| ProviderError::InvalidResponse {
        provider,
        message: format!("cannot build request URL from '{base}': {e}"),
    })
}

/// A text-generation request, independent of the provider that serves it.
#[derive(Debug, Clone)]
pub struct TextRequest {
    pub system: Option<String>,
    pub prompt: String,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

impl TextRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            system: None,
            prompt: prompt.into(),
            max_tokens: None,
            temperature: None,
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub prompt_tokens: i64,
    pub completion_tokens: i64,
    pub total_tokens: i64,
}

#[derive(Debug, Clone)]
pub struct TextCompletion {
    pub text: String,
    pub usage: TokenUsage,
}

#[derive(Debug, Clone)]
pub struct GeneratedImage {
    /// Hosted URL, or a `data:` URL when the provider returned base64
    pub url: String,
    pub revised_prompt: Option<String>,
    pub usage: TokenUsage,
}

#[async_trait]
pub trait TextGenerator: Send + Sync {
    fn provider(&self) -> AiProvider;

    fn model(&self) -> &str;

    async fn generate(&self, request: &TextRequest) -> std::result::Result<TextCompletion, ProviderError>;
}

#[async_trait]
pub trait ImageGenerator: Send + Sync {
    fn provider(&self) -> AiProvider;

    fn model(&self) -> &str;

    async fn generate_image(&self, prompt: &str) -> std::result::Result<GeneratedImage, ProviderError>;
}

/// The configured AI adapters.
#[derive(Clone)]
pub struct AiProviders {
    text: Vec<Arc<dyn TextGenerator>>,
    image: Option<Arc<dyn ImageGenerator>>,
}

impl AiProviders {
    pub fn new(text: Vec<Arc<dyn TextGenerator>>, image: Option<Arc<dyn ImageGenerator>>) -> Self {
        Self { text, image }
    }

    /// Build adapters for every provider that has an API key.
    pub fn from_config(config: &AiConfig, http: &reqwest::Client) -> Self {
        let mut text: Vec<Arc<dyn TextGenerator>> = Vec::new();
        let mut image: Option<Arc<dyn ImageGenerator>> = None;

        if let Some(api_key) = &config.gemini.api_key {
            text.push(Arc::new(gemini::GeminiClient::new(http.clone(), &config.gemini, api_key.clone())));
        }
        if let Some(api_key) = &config.openai.api_key {
            let client = Arc::new(openai::OpenAiClient::new(http.clone(), &config.openai, api_key.clone()));
            text.push(client.clone());
            image = Some(client);
        }

        debug!(
            text_providers = ?text.iter().map(|t| t.provider()).collect::<Vec<_>>(),
            image_provider = image.is_some(),
            "Configured AI providers"
        );
        Self { text, image }
    }

    /// Providers that can serve text requests
    pub fn configured(&self) -> Vec<AiProvider> {
        self.text.iter().map(|t| t.provider()).collect()
    }

    fn select_text(&self, priority: &[AiProvider]) -> std::result::Result<&Arc<dyn TextGenerator>, ProviderError> {
        priority
            .iter()
            .find_map(|wanted| self.text.iter().find(|t| t.provider() == *wanted))
            .ok_or_else(|| {
                let names: Vec<&str> = priority.iter().map(|p| p.as_str()).collect();
                ProviderError::NotConfigured(format!(
                    "No AI provider configured for model priority [{}]",
                    names.join(", ")
                ))
            })
    }

    /// Generate text with the first configured provider in the stored priority order.
    #[instrument(skip_all, fields(user_id = ?user_id.as_ref().map(abbrev_uuid)))]
    pub async fn generate_text(&self, store: &dyn Store, user_id: Option<UserId>, request: &TextRequest) -> Result<TextCompletion> {
        let stored = store.get_setting(MODEL_PRIORITY_KEY, None).await?;
        let priority = model_priority_or_default(stored.as_ref().map(|s| &s.value));

        let generator = self.select_text(&priority)?;
        let completion = generator.generate(request).await?;
        debug!(provider = %generator.provider(), tokens = completion.usage.total_tokens, "Text generated");

        record_usage(store, user_id, generator.provider(), generator.model(), AiOperation::Text, completion.usage).await;
        Ok(completion)
    }

    #[instrument(skip_all, fields(user_id = ?user_id.as_ref().map(abbrev_uuid)))]
    pub async fn generate_image(&self, store: &dyn Store, user_id: Option<UserId>, prompt: &str) -> Result<GeneratedImage> {
        let generator = self
            .image
            .as_ref()
            .ok_or_else(|| ProviderError::NotConfigured("No image provider configured".to_string()))?;

        let image = generator.generate_image(prompt).await?;
        record_usage(store, user_id, generator.provider(), generator.model(), AiOperation::Image, image.usage).await;
        Ok(image)
    }
}

/// Usage logging is best effort; the generated content is still returned when it fails.
async fn record_usage(store: &dyn Store, user_id: Option<UserId>, provider: AiProvider, model: &str, operation: AiOperation, usage: TokenUsage) {
    let log = NewUsageLog {
        user_id,
        provider,
        model: model.to_string(),
        operation,
        prompt_tokens: usage.prompt_tokens,
        completion_tokens: usage.completion_tokens,
        total_tokens: usage.total_tokens,
    };
    if let Err(e) = store.record_usage(&log).await {
        warn!(%provider, operation = operation.as_str(), "Failed to record AI usage: {e}");
    }
}
