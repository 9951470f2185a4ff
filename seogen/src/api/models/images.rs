use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Either `title` or `prompt` is required. With only a title, an image prompt is written first.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct GenerateImageRequest {
    pub title: Option<String>,
    pub prompt: Option<String>,
    /// When set, the generated image is stored on this article
    pub article_id: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GenerateImageResponse {
    pub image_url: String,
    /// The prompt the image was generated from
    pub prompt: String,
}
