use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::{models::ArticleStatus, repository::RepositoryError};

/// CoreError
///
/// Every failure the core reports to its callers. Authorization and validation errors carry
/// the capability or field name verbatim; persistence failures are reported without any
/// storage detail (the cause is logged where it is caught).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    #[error("authentication required")]
    Unauthenticated,

    /// `required` names the missing capability, or `admin` for admin-only actions.
    #[error("missing permission: {required}")]
    Unauthorized { required: String },

    #[error("unknown role: {0}")]
    UnknownRole(String),

    #[error("unknown capability: {0}")]
    UnknownCapability(String),

    #[error("invalid `{field}`: {message}")]
    Validation { field: String, message: String },

    #[error("cannot move an article from `{from}` to `{to}`")]
    InvalidTransition { from: ArticleStatus, to: ArticleStatus },

    #[error("article {id} was modified concurrently; reload and retry")]
    StaleState { id: i64 },

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    #[error("the operation could not be persisted")]
    Persistence,
}

impl CoreError {
    pub fn unauthorized(required: impl Into<String>) -> Self {
        CoreError::Unauthorized {
            required: required.into(),
        }
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        CoreError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn article_not_found(id: i64) -> Self {
        CoreError::NotFound {
            entity: "article",
            id: id.to_string(),
        }
    }

    /// Stable machine-readable kind, used as the `error` field of HTTP responses.
    pub fn kind(&self) -> &'static str {
        match self {
            CoreError::Unauthenticated => "unauthenticated",
            CoreError::Unauthorized { .. } => "unauthorized",
            CoreError::UnknownRole(_) => "unknown_role",
            CoreError::UnknownCapability(_) => "unknown_capability",
            CoreError::Validation { .. } => "validation_error",
            CoreError::InvalidTransition { .. } => "invalid_transition",
            CoreError::StaleState { .. } => "stale_state",
            CoreError::NotFound { .. } => "not_found",
            CoreError::Persistence => "persistence_error",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            CoreError::Unauthenticated => StatusCode::UNAUTHORIZED,
            CoreError::Unauthorized { .. } => StatusCode::FORBIDDEN,
            // Catalog errors are configuration faults, not client mistakes.
            CoreError::UnknownRole(_) | CoreError::UnknownCapability(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            CoreError::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            CoreError::InvalidTransition { .. } | CoreError::StaleState { .. } => {
                StatusCode::CONFLICT
            }
            CoreError::NotFound { .. } => StatusCode::NOT_FOUND,
            CoreError::Persistence => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for CoreError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(kind = self.kind(), "request failed: {}", self);
        }
        let body = Json(json!({
            "error": self.kind(),
            "message": self.to_string(),
        }));
        (status, body).into_response()
    }
}

/// article_failure
///
/// Maps a repository failure on an article operation into the core taxonomy. Storage
/// details are logged here and never leave the service boundary.
pub(crate) fn article_failure(
    operation: &'static str,
    article_id: i64,
) -> impl FnOnce(RepositoryError) -> CoreError {
    move |error| match error {
        RepositoryError::NotFound => CoreError::article_not_found(article_id),
        RepositoryError::Conflict => CoreError::StaleState { id: article_id },
        other => {
            tracing::error!(operation, article_id, error = %other, "persistence failure");
            CoreError::Persistence
        }
    }
}

/// persistence_failure
///
/// Maps a repository failure that has no article context.
pub(crate) fn persistence_failure(operation: &'static str) -> impl FnOnce(RepositoryError) -> CoreError {
    move |error| {
        tracing::error!(operation, error = %error, "persistence failure");
        CoreError::Persistence
    }
}
