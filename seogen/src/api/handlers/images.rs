//! Featured-image generation.

use crate::{
    AppState,
    api::handlers::{articles::owned_article, parse_uuid},
    api::json::Json,
    api::models::{
        images::{GenerateImageRequest, GenerateImageResponse},
        users::CurrentUser,
    },
    errors::{Error, Result},
    providers::TextRequest,
    types::abbrev_uuid,
};
use axum::extract::State;
use tracing::{debug, info};

const IMAGE_PROMPT_SYSTEM: &str = "You write prompts for an image generation model. \
Reply with the prompt only, as a single paragraph, without quotes or commentary.";

const IMAGE_PROMPT_MAX_TOKENS: u32 = 300;
const IMAGE_PROMPT_TEMPERATURE: f32 = 0.7;

fn image_prompt_request(title: &str) -> TextRequest {
    TextRequest::new(format!(
        "Write a prompt for a photorealistic featured image for a blog article titled \"{title}\". \
         Describe the subject, setting, composition and lighting. The image must not contain any text, \
         letters or logos."
    ))
    .with_system(IMAGE_PROMPT_SYSTEM)
    .with_max_tokens(IMAGE_PROMPT_MAX_TOKENS)
    .with_temperature(IMAGE_PROMPT_TEMPERATURE)
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Generate a featured image
#[utoipa::path(
    post,
    path = "/generate/image",
    tag = "generation",
    summary = "Generate image",
    description = "With only a title, an image prompt is written by the text model first. \
                   With a prompt, it is used as given. When articleId is set the image URL is saved on the article.",
    request_body = GenerateImageRequest,
    responses(
        (status = 200, description = "Generated image", body = GenerateImageResponse),
        (status = 400, description = "Neither title nor prompt given, or invalid articleId"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Article not found"),
        (status = 500, description = "AI provider error"),
    ),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all, fields(user_id = %abbrev_uuid(&user.id)))]
pub async fn generate_image(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(request): Json<GenerateImageRequest>,
) -> Result<Json<GenerateImageResponse>> {
    let title = non_blank(request.title);
    let prompt = non_blank(request.prompt);
    if title.is_none() && prompt.is_none() {
        return Err(Error::missing_field("title or prompt"));
    }

    // Resolve the target article before spending any tokens
    let article = match non_blank(request.article_id) {
        Some(raw) => Some(owned_article(&state, &user, parse_uuid("articleId", &raw)?).await?),
        None => None,
    };

    let prompt = match (prompt, title) {
        (Some(prompt), _) => prompt,
        (None, Some(title)) => {
            let completion = state
                .ai
                .generate_text(state.store.as_ref(), Some(user.id), &image_prompt_request(&title))
                .await?;
            debug!("Image prompt written from title");
            completion.text.trim().to_string()
        }
        (None, None) => return Err(Error::missing_field("title or prompt")),
    };

    let image = state.ai.generate_image(state.store.as_ref(), Some(user.id), &prompt).await?;

    if let Some(article) = article {
        state.store.update_article_image(article.id, &image.url).await?;
        info!(article_id = %abbrev_uuid(&article.id), "Featured image saved on article");
    }

    Ok(Json(GenerateImageResponse {
        image_url: image.url,
        prompt,
    }))
}
