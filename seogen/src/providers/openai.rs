//! OpenAI-compatible adapter: chat completions for text, `images/generations` for images.

use super::{
    GeneratedImage, ImageGenerator, ProviderError, TextCompletion, TextGenerator, TextRequest, TokenUsage, check_status, join_url,
    read_json,
};
use crate::config::OpenAiConfig;
use crate::types::AiProvider;
use async_openai::types::chat::CreateChatCompletionResponse;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, instrument};
use url::Url;

const PROVIDER: &str = "openai";

pub struct OpenAiClient {
    client: Client,
    base_url: Url,
    api_key: String,
    model: String,
    image_model: String,
    image_size: String,
}

impl OpenAiClient {
    pub fn new(client: Client, config: &OpenAiConfig, api_key: String) -> Self {
        Self {
            client,
            base_url: config.base_url.clone(),
            api_key,
            model: config.model.clone(),
            image_model: config.image_model.clone(),
            image_size: config.image_size.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ImagesResponse {
    #[serde(default)]
    data: Vec<ImageData>,
    usage: Option<ImageUsage>,
}

#[derive(Debug, Deserialize)]
struct ImageData {
    url: Option<String>,
    b64_json: Option<String>,
    revised_prompt: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ImageUsage {
    #[serde(default)]
    input_tokens: i64,
    #[serde(default)]
    output_tokens: i64,
    #[serde(default)]
    total_tokens: i64,
}

#[async_trait]
impl TextGenerator for OpenAiClient {
    fn provider(&self) -> AiProvider {
        AiProvider::OpenAi
    }

    fn model(&self) -> &str {
        &self.model
    }

    #[instrument(skip_all, fields(model = %self.model))]
    async fn generate(&self, request: &TextRequest) -> Result<TextCompletion, ProviderError> {
        let url = join_url(PROVIDER, &self.base_url, "chat/completions")?;

        let mut messages = Vec::with_capacity(2);
        if let Some(system) = &request.system {
            messages.push(json!({ "role": "system", "content": system }));
        }
        messages.push(json!({ "role": "user", "content": request.prompt }));

        let mut body = json!({ "model": self.model, "messages": messages });
        if let Some(max_tokens) = request.max_tokens {
            body["max_tokens"] = json!(max_tokens);
        }
        if let Some(temperature) = request.temperature {
            body["temperature"] = json!(temperature);
        }

        debug!("Calling chat completions");
        let response = self
            .client
            .post(url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(ProviderError::transport(PROVIDER))?;
        let response = check_status(PROVIDER, response).await?;
        let parsed: CreateChatCompletionResponse = read_json(PROVIDER, response).await?;

        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| ProviderError::InvalidResponse {
                provider: PROVIDER,
                message: "completion contained no message content".to_string(),
            })?;

        let usage = parsed
            .usage
            .map(|usage| TokenUsage {
                prompt_tokens: usage.prompt_tokens as i64,
                completion_tokens: usage.completion_tokens as i64,
                total_tokens: usage.total_tokens as i64,
            })
            .unwrap_or_default();

        Ok(TextCompletion { text, usage })
    }
}

#[async_trait]
impl ImageGenerator for OpenAiClient {
    fn provider(&self) -> AiProvider {
        AiProvider::OpenAi
    }

    fn model(&self) -> &str {
        &self.image_model
    }

    #[instrument(skip_all, fields(model = %self.image_model))]
    async fn generate_image(&self, prompt: &str) -> Result<GeneratedImage, ProviderError> {
        let url = join_url(PROVIDER, &self.base_url, "images/generations")?;
        let body = json!({
            "model": self.image_model,
            "prompt": prompt,
            "n": 1,
            "size": self.image_size,
        });

        debug!("Calling image generation");
        let response = self
            .client
            .post(url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(ProviderError::transport(PROVIDER))?;
        let response = check_status(PROVIDER, response).await?;
        let parsed: ImagesResponse = read_json(PROVIDER, response).await?;

        let image = parsed.data.into_iter().next().ok_or_else(|| ProviderError::InvalidResponse {
            provider: PROVIDER,
            message: "image response contained no data".to_string(),
        })?;
        let url = match (image.url, image.b64_json) {
            (Some(url), _) => url,
            (None, Some(b64)) => format!("data:image/png;base64,{b64}"),
            (None, None) => {
                return Err(ProviderError::InvalidResponse {
                    provider: PROVIDER,
                    message: "image entry had neither url nor b64_json".to_string(),
                });
            }
        };

        let usage = parsed
            .usage
            .map(|usage| TokenUsage {
                prompt_tokens: usage.input_tokens,
                completion_tokens: usage.output_tokens,
                total_tokens: usage.total_tokens,
            })
            .unwrap_or_default();

        Ok(GeneratedImage {
            url,
            revised_prompt: image.revised_prompt,
            usage,
        })
    }
}
