//! Request and response types for the HTTP API. Wire field names are camelCase.

pub mod ai_settings;
pub mod analysis;
pub mod articles;
pub mod images;
pub mod payments;
pub mod settings;
pub mod users;

use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct SuccessResponse {
    pub success: bool,
}

impl SuccessResponse {
    pub fn ok() -> Self {
        Self { success: true }
    }
}
