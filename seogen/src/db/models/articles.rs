//! Store models for articles and the keywords they target.

use crate::types::{ArticleId, KeywordId, UserId};
use chrono::{DateTime, Utc};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow)]
pub struct Article {
    pub id: ArticleId,
    pub user_id: UserId,
    pub title: String,
    pub content: String,
    pub slug: Option<String>,
    pub keyword_id: Option<KeywordId>,
    pub image_url: Option<String>,
    pub published_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Article {
    /// Slug used when publishing: the stored slug, or one derived from the title.
    pub fn slug_or_derived(&self) -> String {
        match &self.slug {
            Some(slug) if !slug.trim().is_empty() => slug.clone(),
            _ => slugify(&self.title),
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct Keyword {
    pub id: KeywordId,
    pub keyword: String,
    pub search_volume: Option<i32>,
    pub difficulty: Option<i32>,
}

/// Lowercase ASCII slug: alphanumerics kept, everything else collapsed into single dashes.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_dash = false;
    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    slug
}
