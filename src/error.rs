use crate::{auth::AuthError, resource::TreeError};
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum WeaverError {
    #[error("{0}")]
    IO(#[from] std::io::Error),

    #[error("{0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("{0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("{0}")]
    PasswordHash(#[from] argon2::password_hash::Error),

    #[error("resource tree is inconsistent: {0}")]
    Tree(#[from] TreeError),

    #[error("{0}")]
    Auth(#[from] AuthError),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Validation(String),
}

impl WeaverError {
    pub fn status(&self) -> StatusCode {
        match self {
            WeaverError::NotFound(_) => StatusCode::NOT_FOUND,
            WeaverError::Forbidden(_) => StatusCode::FORBIDDEN,
            WeaverError::Conflict(_) => StatusCode::CONFLICT,
            WeaverError::Validation(_) | WeaverError::Json(_) => StatusCode::BAD_REQUEST,
            WeaverError::Auth(e) => e.status(),
            WeaverError::IO(_)
            | WeaverError::Sqlx(_)
            | WeaverError::Migrate(_)
            | WeaverError::PasswordHash(_)
            | WeaverError::Tree(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for WeaverError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();

        if status.is_server_error() {
            error!("{self}");
        }

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert_eq!(
            StatusCode::NOT_FOUND,
            WeaverError::NotFound("course".to_string()).status()
        );
        assert_eq!(
            StatusCode::FORBIDDEN,
            WeaverError::Forbidden("course".to_string()).status()
        );
        assert_eq!(
            StatusCode::CONFLICT,
            WeaverError::Conflict("username".to_string()).status()
        );
        assert_eq!(
            StatusCode::BAD_REQUEST,
            WeaverError::Validation("name".to_string()).status()
        );
        assert_eq!(
            StatusCode::UNAUTHORIZED,
            WeaverError::from(AuthError::NoSession).status()
        );
        assert_eq!(
            StatusCode::INTERNAL_SERVER_ERROR,
            WeaverError::from(TreeError::Cycle("a".to_string())).status()
        );
    }

    #[test]
    fn tree_error_message() {
        let e = WeaverError::from(TreeError::DuplicateId("a".to_string()));
        assert_eq!("resource tree is inconsistent: duplicate resource id: a", e.to_string());
    }
}
