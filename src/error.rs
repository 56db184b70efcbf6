//! Service error taxonomy and its JSON rendering.
//!
//! Every failure returns a structured payload with a human-readable
//! message; validation failures additionally carry per-field violations.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("validation failed")]
    Validation(Vec<FieldViolation>),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Conflict(String),

    #[error("forbidden")]
    Forbidden,

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone, Serialize)]
pub struct FieldViolation {
    pub field: String,
    pub message: String,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    violations: Option<Vec<FieldViolation>>,
}

impl AppError {
    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let violations = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| FieldViolation {
                    field: field.to_string(),
                    message: e
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| e.code.to_string()),
                })
            })
            .collect();
        Self::Validation(violations)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Unique-key races that slip past the proactive checks still
        // surface as conflicts, not internal errors.
        if let Self::Database(sqlx::Error::Database(ref db)) = self {
            if db.is_unique_violation() {
                let body = ErrorBody {
                    error: "duplicate value for a unique field".to_string(),
                    violations: None,
                };
                return (StatusCode::CONFLICT, Json(body)).into_response();
            }
        }

        let status = self.status();
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "request failed");
        }
        let body = match self {
            Self::Validation(violations) => ErrorBody {
                error: "validation failed".to_string(),
                violations: Some(violations),
            },
            Self::Database(_) => ErrorBody {
                error: "internal error".to_string(),
                violations: None,
            },
            other => ErrorBody {
                error: other.to_string(),
                violations: None,
            },
        };
        (status, Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_map_to_taxonomy() {
        assert_eq!(
            AppError::NotFound("product").status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::conflict("insufficient stock").status(),
            StatusCode::CONFLICT
        );
        assert_eq!(AppError::Forbidden.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            AppError::Validation(vec![]).status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }
}
