use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use townboard_shared::DomainError;
use townboard_store::StoreError;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Not found: {0}")]
    NotFound(String),

    /// A table lacks a column the operation needs. Configuration fault.
    #[error("Schema error: {0}")]
    Schema(String),

    /// Submitter is not an approved member.
    #[error("Not authorized: {0}")]
    NotAuthorized(String),

    /// Missing or wrong moderator credentials.
    #[error("Moderator login required")]
    Unauthorized,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Store temporarily unavailable: {0}")]
    Transient(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for ServerError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { .. } => {
                tracing::warn!(error = %err, "Record not found");
                ServerError::NotFound(err.to_string())
            }
            StoreError::Schema { .. } | StoreError::UnknownTable(_) => {
                tracing::error!(error = %err, "Record store schema fault");
                ServerError::Schema(err.to_string())
            }
            StoreError::Domain(e) => e.into(),
            e if e.is_transient() => ServerError::Transient(e.to_string()),
            e => ServerError::Internal(e.to_string()),
        }
    }
}

impl From<DomainError> for ServerError {
    fn from(err: DomainError) -> Self {
        ServerError::BadRequest(err.to_string())
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ServerError::NotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            ServerError::Schema(_) => (StatusCode::CONFLICT, self.to_string()),
            ServerError::NotAuthorized(_) => (StatusCode::FORBIDDEN, self.to_string()),
            ServerError::Unauthorized => (StatusCode::UNAUTHORIZED, self.to_string()),
            ServerError::Forbidden(_) => (StatusCode::FORBIDDEN, self.to_string()),
            ServerError::Conflict(_) => (StatusCode::CONFLICT, self.to_string()),
            ServerError::Transient(cause) => {
                tracing::warn!(%cause, "Record store unavailable");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "The directory is busy, please try again shortly".to_string(),
                )
            }
            ServerError::BadRequest(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            ServerError::Internal(cause) => {
                tracing::error!(%cause, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
        };

        let body = serde_json::json!({
            "error": message,
        });

        let mut response = (status, axum::Json(body)).into_response();
        if matches!(self, ServerError::Unauthorized) {
            response.headers_mut().insert(
                axum::http::header::WWW_AUTHENTICATE,
                axum::http::HeaderValue::from_static("Basic realm=\"townboard\""),
            );
        }
        response
    }
}
