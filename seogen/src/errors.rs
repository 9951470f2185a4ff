use crate::db::errors::DbError;
use crate::providers::ProviderError;
use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error as ThisError;
use utoipa::ToSchema;

#[derive(ThisError, Debug)]
pub enum Error {
    /// No valid session was presented
    #[error("Unauthorized")]
    Unauthenticated,

    /// Authenticated, but the caller's role does not allow the operation
    #[error("Forbidden")]
    Forbidden,

    /// Missing or invalid request data
    #[error("{message}")]
    BadRequest { message: String },

    /// Requested resource not found
    #[error("{resource} {id} not found")]
    NotFound { resource: String, id: String },

    /// An external collaborator (auth admin API, AI, payment, SMTP, publishing site) failed
    #[error(transparent)]
    Upstream(#[from] ProviderError),

    /// Store operation error
    #[error(transparent)]
    Database(#[from] DbError),

    /// Unexpected error with full context chain
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// JSON error envelope returned by every route.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl Error {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Error::BadRequest { message: message.into() }
    }

    /// A required request field is absent or empty.
    pub fn missing_field(field: &str) -> Self {
        Error::BadRequest {
            message: format!("Missing required field: {field}"),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Unauthenticated => StatusCode::UNAUTHORIZED,
            Error::Forbidden => StatusCode::FORBIDDEN,
            Error::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Error::NotFound { .. } => StatusCode::NOT_FOUND,
            Error::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::Database(db_err) => match db_err {
                DbError::NotFound => StatusCode::NOT_FOUND,
                DbError::UniqueViolation { .. } => StatusCode::CONFLICT,
                DbError::ForeignKeyViolation { .. } | DbError::CheckViolation { .. } => StatusCode::BAD_REQUEST,
                DbError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Error::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Build the response envelope. Upstream failures keep the provider's code and body so the
    /// caller can diagnose them.
    pub fn body(&self) -> ErrorBody {
        match self {
            Error::Upstream(provider_err) => ErrorBody {
                error: provider_err.to_string(),
                code: provider_err.code(),
                details: provider_err.details(),
            },
            Error::Database(DbError::NotFound) => ErrorBody {
                error: "Resource not found".to_string(),
                code: None,
                details: None,
            },
            Error::Database(DbError::UniqueViolation { .. }) => ErrorBody {
                error: "Resource already exists".to_string(),
                code: None,
                details: None,
            },
            Error::Database(DbError::ForeignKeyViolation { .. }) => ErrorBody {
                error: "Invalid reference to related resource".to_string(),
                code: None,
                details: None,
            },
            Error::Database(DbError::CheckViolation { .. }) => ErrorBody {
                error: "Invalid data provided".to_string(),
                code: None,
                details: None,
            },
            other => ErrorBody {
                error: other.to_string(),
                code: None,
                details: None,
            },
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match &self {
            Error::Database(DbError::Other(_)) | Error::Upstream(_) | Error::Other(_) => {
                tracing::error!("Internal service error: {:#}", self);
            }
            Error::Database(_) => {
                tracing::warn!("Database constraint error: {}", self);
            }
            Error::Unauthenticated | Error::Forbidden => {
                tracing::info!("Authorization error: {}", self);
            }
            Error::BadRequest { .. } | Error::NotFound { .. } => {
                tracing::debug!("Client error: {}", self);
            }
        }

        (self.status_code(), Json(self.body())).into_response()
    }
}

/// Unparseable or mistyped request bodies. Content-type and size failures read the same to a client.
impl From<JsonRejection> for Error {
    fn from(rejection: JsonRejection) -> Self {
        Error::BadRequest {
            message: rejection.body_text(),
        }
    }
}

/// Type alias for handler results
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use serde_json::{Value, json};

    async fn render(err: Error) -> (StatusCode, Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_unauthenticated_envelope() {
        let (status, body) = render(Error::Unauthenticated).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body, json!({ "error": "Unauthorized" }));
    }

    #[tokio::test]
    async fn test_missing_field_names_the_field() {
        let (status, body) = render(Error::missing_field("key")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("key"));
    }

    #[tokio::test]
    async fn test_upstream_error_keeps_provider_code() {
        let err = Error::from(ProviderError::Rejected {
            provider: "payos",
            code: "20".to_string(),
            message: "Invalid amount".to_string(),
        });
        let (status, body) = render(err).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["code"], "20");
        assert!(body["error"].as_str().unwrap().contains("Invalid amount"));
    }

    #[tokio::test]
    async fn test_store_not_found_maps_to_404() {
        let (status, body) = render(Error::Database(DbError::NotFound)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Resource not found");
    }
}
