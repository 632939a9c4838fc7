use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    ValidationError(String),
    #[error("{0}")]
    Conflict(String),
    #[error("Invalid username or password")]
    InvalidCredentials,
    /// No Authorization header, or one that does not use the bearer scheme.
    #[error("{0}")]
    NoCredential(String),
    /// A bearer token was presented but is malformed, badly signed or expired.
    #[error("Invalid token")]
    InvalidCredential,
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    StorageError(#[from] sqlx::Error),
    #[error("Internal server error: {0}")]
    InternalError(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_)
            | AppError::Conflict(_)
            | AppError::InvalidCredentials => StatusCode::BAD_REQUEST,
            AppError::NoCredential(_) => StatusCode::FORBIDDEN,
            AppError::InvalidCredential => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::StorageError(_) | AppError::InternalError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            AppError::StorageError(e) => tracing::error!("Database error: {}", e),
            AppError::InternalError(msg) => tracing::error!("Internal error: {}", msg),
            _ => {}
        }

        let body = Json(json!({
            "error": self.to_string(),
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_failures_map_to_distinct_statuses() {
        assert_eq!(
            AppError::NoCredential("No token provided".into()).status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(AppError::InvalidCredential.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::InvalidCredentials.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn storage_errors_pass_their_message_through() {
        let err = AppError::from(sqlx::Error::RowNotFound);
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.to_string(), sqlx::Error::RowNotFound.to_string());
    }
}
