use serde::Deserialize;
use utoipa::ToSchema;

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct ReadabilityRequest {
    /// HTML, Markdown or plain text
    pub content: Option<String>,
}
