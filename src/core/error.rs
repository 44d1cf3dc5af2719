//! API error taxonomy.
//!
//! Every failure a handler can produce maps to exactly one variant, and every
//! variant maps to exactly one HTTP status. Persistence failures never leak
//! driver details to the client; they are traced server-side with enough
//! context to reconstruct the failed attempt.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use tracing::error;

use crate::core::shared::enums::IssueStatus;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Authentication required: {0}")]
    Unauthorized(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Invalid transition from {from} to {to}")]
    InvalidTransition { from: IssueStatus, to: IssueStatus },
    #[error("Issue is locked in terminal state {0}")]
    LockedIssue(IssueStatus),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Database error: {0}")]
    Database(#[from] diesel::result::Error),
    #[error("Connection pool error: {0}")]
    Pool(#[from] diesel::r2d2::PoolError),
}

impl ApiError {
    fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::Unauthorized(_) => "unauthorized",
            Self::Forbidden(_) => "forbidden",
            Self::NotFound(_) => "not_found",
            Self::InvalidTransition { .. } => "invalid_transition",
            Self::LockedIssue(_) => "issue_locked",
            Self::Conflict(_) => "conflict",
            Self::Database(_) | Self::Pool(_) => "internal_error",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::InvalidTransition { .. } | Self::LockedIssue(_) | Self::Conflict(_) => {
                StatusCode::CONFLICT
            }
            Self::Database(_) | Self::Pool(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        let message = match &self {
            // Opaque message for store failures; details go to the log only.
            Self::Database(e) => {
                error!("Database error: {e}");
                "Internal server error".to_string()
            }
            Self::Pool(e) => {
                error!("Connection pool error: {e}");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        let body = serde_json::json!({
            "error": self.code(),
            "message": message,
        });

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(ApiError::Validation("x".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::Unauthorized("x".into()).status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::Forbidden("x".into()).status(), StatusCode::FORBIDDEN);
        assert_eq!(ApiError::NotFound("x".into()).status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::InvalidTransition {
                from: IssueStatus::Created,
                to: IssueStatus::Closed
            }
            .status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::LockedIssue(IssueStatus::Completed).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(ApiError::Conflict("x".into()).status(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_database_error_is_opaque() {
        let err = ApiError::Database(diesel::result::Error::NotFound);
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.code(), "internal_error");
    }
}
