//! Article request/response models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::db::models::articles::{Article, Keyword};
use crate::types::{ArticleId, KeywordId, UserId};

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct KeywordResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: KeywordId,
    pub keyword: String,
    pub search_volume: Option<i32>,
    pub difficulty: Option<i32>,
}

impl From<Keyword> for KeywordResponse {
    fn from(keyword: Keyword) -> Self {
        Self {
            id: keyword.id,
            keyword: keyword.keyword,
            search_volume: keyword.search_volume,
            difficulty: keyword.difficulty,
        }
    }
}

/// An article with its target keyword resolved.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ArticleResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: ArticleId,
    #[schema(value_type = String, format = "uuid")]
    pub user_id: UserId,
    pub title: String,
    pub content: String,
    pub slug: Option<String>,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub keyword_id: Option<KeywordId>,
    pub image_url: Option<String>,
    pub published_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// `null` when the article has no keyword or it was deleted
    pub keyword: Option<KeywordResponse>,
}

impl ArticleResponse {
    pub fn new(article: Article, keyword: Option<Keyword>) -> Self {
        Self {
            id: article.id,
            user_id: article.user_id,
            title: article.title,
            content: article.content,
            slug: article.slug,
            keyword_id: article.keyword_id,
            image_url: article.image_url,
            published_url: article.published_url,
            created_at: article.created_at,
            updated_at: article.updated_at,
            keyword: keyword.map(KeywordResponse::from),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ArticleListResponse {
    pub data: Vec<ArticleResponse>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct PublishArticleRequest {
    pub article_id: Option<String>,
    /// Base URL of the receiving site; `/receive-article` is appended
    pub site_url: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PublishArticleResponse {
    pub success: bool,
    /// Public URL reported by the receiving site
    pub link: String,
}
