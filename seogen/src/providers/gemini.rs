//! Gemini `generateContent` adapter.

use super::{ProviderError, TextCompletion, TextGenerator, TextRequest, TokenUsage, check_status, join_url, read_json};
use crate::config::GeminiConfig;
use crate::types::AiProvider;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use url::Url;

const PROVIDER: &str = "gemini";

pub struct GeminiClient {
    client: Client,
    base_url: Url,
    api_key: String,
    model: String,
}

impl GeminiClient {
    pub fn new(client: Client, config: &GeminiConfig, api_key: String) -> Self {
        Self {
            client,
            base_url: config.base_url.clone(),
            api_key,
            model: config.model.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content<'a>>,
    contents: Vec<Content<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: i64,
    #[serde(default)]
    candidates_token_count: i64,
    #[serde(default)]
    total_token_count: i64,
}

impl From<UsageMetadata> for TokenUsage {
    fn from(usage: UsageMetadata) -> Self {
        TokenUsage {
            prompt_tokens: usage.prompt_token_count,
            completion_tokens: usage.candidates_token_count,
            total_tokens: usage.total_token_count,
        }
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    fn provider(&self) -> AiProvider {
        AiProvider::Gemini
    }

    fn model(&self) -> &str {
        &self.model
    }

    #[instrument(skip_all, fields(model = %self.model))]
    async fn generate(&self, request: &TextRequest) -> Result<TextCompletion, ProviderError> {
        let url = join_url(PROVIDER, &self.base_url, &format!("v1beta/models/{}:generateContent", self.model))?;
        let body = GenerateContentRequest {
            system_instruction: request.system.as_deref().map(|system| Content {
                role: None,
                parts: vec![Part { text: system }],
            }),
            contents: vec![Content {
                role: Some("user"),
                parts: vec![Part { text: &request.prompt }],
            }],
            generation_config: (request.max_tokens.is_some() || request.temperature.is_some()).then_some(GenerationConfig {
                max_output_tokens: request.max_tokens,
                temperature: request.temperature,
            }),
        };

        debug!("Calling Gemini generateContent");
        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(ProviderError::transport(PROVIDER))?;
        let response = check_status(PROVIDER, response).await?;
        let parsed: GenerateContentResponse = read_json(PROVIDER, response).await?;

        let candidate = parsed.candidates.into_iter().next().ok_or_else(|| ProviderError::InvalidResponse {
            provider: PROVIDER,
            message: "response contained no candidates".to_string(),
        })?;
        let text: String = candidate
            .content
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();
        if text.trim().is_empty() {
            return Err(ProviderError::InvalidResponse {
                provider: PROVIDER,
                message: format!(
                    "candidate contained no text (finish reason: {})",
                    candidate.finish_reason.as_deref().unwrap_or("unknown")
                ),
            });
        }

        Ok(TextCompletion {
            text,
            usage: parsed.usage_metadata.unwrap_or_default().into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> GeminiClient {
        let config = GeminiConfig {
            api_key: None,
            base_url: Url::parse(&server.uri()).unwrap(),
            model: "gemini-test".to_string(),
        };
        GeminiClient::new(crate::test_utils::test_client(), &config, "g-key".to_string())
    }

    #[tokio::test]
    async fn test_generate_joins_parts_and_reads_usage() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-test:generateContent"))
            .and(header("x-goog-api-key", "g-key"))
            .and(body_partial_json(json!({
                "systemInstruction": { "parts": [{ "text": "be brief" }] },
                "contents": [{ "role": "user", "parts": [{ "text": "hello" }] }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{
                    "content": { "role": "model", "parts": [{ "text": "Hi " }, { "text": "there" }] },
                    "finishReason": "STOP"
                }],
                "usageMetadata": { "promptTokenCount": 5, "candidatesTokenCount": 2, "totalTokenCount": 7 }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let completion = client_for(&server)
            .generate(&TextRequest::new("hello").with_system("be brief"))
            .await
            .unwrap();

        assert_eq!(completion.text, "Hi there");
        assert_eq!(
            completion.usage,
            TokenUsage {
                prompt_tokens: 5,
                completion_tokens: 2,
                total_tokens: 7
            }
        );
    }

    #[tokio::test]
    async fn test_error_status_embeds_provider_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": { "code": 400, "message": "API key not valid", "status": "INVALID_ARGUMENT" }
            })))
            .mount(&server)
            .await;

        let err = client_for(&server).generate(&TextRequest::new("hello")).await.unwrap_err();
        match err {
            ProviderError::Api { status, message, .. } => {
                assert_eq!(status, 400);
                assert_eq!(message, "API key not valid");
            }
            other => panic!("expected API error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_blocked_candidate_is_invalid_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{ "finishReason": "SAFETY" }]
            })))
            .mount(&server)
            .await;

        let err = client_for(&server).generate(&TextRequest::new("hello")).await.unwrap_err();
        assert!(err.to_string().contains("SAFETY"));
    }
}
