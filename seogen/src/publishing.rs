//! Publishing articles to third-party sites.
//!
//! A receiving site exposes `POST /receive-article`, authenticates the shared secret from the
//! `Authorization: Bearer` header and answers `{"success": true, "link": "<public url>"}`.

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use url::Url;

use crate::providers::{ProviderError, check_status, join_url, read_json};

const PROVIDER: &str = "publisher";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticlePayload<'a> {
    pub title: &'a str,
    pub content: &'a str,
    pub slug: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keyword: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct ReceiveArticleResponse {
    #[serde(default)]
    success: bool,
    link: Option<String>,
    error: Option<String>,
}

pub struct ArticlePublisher {
    client: Client,
    secret: String,
}

impl ArticlePublisher {
    pub fn new(client: Client, secret: String) -> Self {
        Self { client, secret }
    }

    /// Post the article and return the public link the site reports.
    #[instrument(skip_all, fields(site = %site_url))]
    pub async fn publish(&self, site_url: &Url, article: &ArticlePayload<'_>) -> Result<String, ProviderError> {
        let url = join_url(PROVIDER, site_url, "receive-article")?;
        let response = self
            .client
            .post(url)
            .bearer_auth(&self.secret)
            .json(article)
            .send()
            .await
            .map_err(ProviderError::transport(PROVIDER))?;

        if response.status() == StatusCode::UNAUTHORIZED {
            return Err(ProviderError::Rejected {
                provider: PROVIDER,
                code: "401".to_string(),
                message: "secret mismatch".to_string(),
            });
        }
        let response = check_status(PROVIDER, response).await?;
        let parsed: ReceiveArticleResponse = read_json(PROVIDER, response).await?;

        match (parsed.success, parsed.link) {
            (true, Some(link)) => {
                info!(%link, "Article published");
                Ok(link)
            }
            (_, _) => Err(ProviderError::InvalidResponse {
                provider: PROVIDER,
                message: parsed.error.unwrap_or_else(|| "site did not confirm publication".to_string()),
            }),
        }
    }
}
