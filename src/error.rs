use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use utoipa::ToSchema;

use crate::repository::StorageError;

/// Field-level detail attached to 400/409 responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct FieldError {
    #[schema(example = "check_out")]
    pub field: String,
    #[schema(example = "Check-out time must be after check-in time")]
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{message}")]
    Validation {
        message: String,
        details: Vec<FieldError>,
    },

    #[error("{0}")]
    NotFound(String),

    #[error("{message}")]
    Conflict {
        message: String,
        details: Vec<FieldError>,
        /// Number of dependent rows that blocked the operation.
        count: Option<i64>,
    },

    #[error("{0}")]
    Unauthorized(String),

    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Failure outside the repository, such as hashing or token signing.
    #[error("internal error: {0}")]
    Internal(String),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn validation(message: impl Into<String>, field: &str, detail: impl Into<String>) -> Self {
        AppError::Validation {
            message: message.into(),
            details: vec![FieldError::new(field, detail)],
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        AppError::NotFound(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        AppError::Conflict {
            message: message.into(),
            details: Vec::new(),
            count: None,
        }
    }

    /// Conflict caused by rows still referencing the target; `count` is
    /// `None` when only the storage constraint noticed them.
    pub fn in_use(
        message: impl Into<String>,
        field: &str,
        count: Option<i64>,
        detail: impl Into<String>,
    ) -> Self {
        AppError::Conflict {
            message: message.into(),
            details: vec![FieldError::new(field, detail)],
            count,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            AppError::Validation { .. } => "Validation Error",
            AppError::NotFound(_) => "Not Found",
            AppError::Conflict { .. } => "Conflict",
            AppError::Unauthorized(_) => "Unauthorized",
            AppError::Storage(StorageError::UniqueViolation { .. }) => "Duplicate entry",
            AppError::Storage(StorageError::ForeignKeyViolation { .. }) => "Invalid reference",
            AppError::Storage(StorageError::Backend(_)) | AppError::Internal(_) => {
                "Internal Server Error"
            }
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation { .. } => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict { .. } => StatusCode::CONFLICT,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Storage(StorageError::UniqueViolation { .. }) => StatusCode::CONFLICT,
            AppError::Storage(StorageError::ForeignKeyViolation { .. }) => StatusCode::BAD_REQUEST,
            AppError::Storage(StorageError::Backend(_)) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let mut body = json!({
            "success": false,
            "error": self.label(),
        });

        // Backend text stays in the logs.
        match self {
            AppError::Validation { message, details } => {
                body["message"] = json!(message);
                body["details"] = json!(details);
            }
            AppError::Conflict {
                message,
                details,
                count,
            } => {
                body["message"] = json!(message);
                if !details.is_empty() {
                    body["details"] = json!(details);
                }
                if let Some(count) = count {
                    body["count"] = json!(count);
                }
            }
            AppError::NotFound(message) | AppError::Unauthorized(message) => {
                body["message"] = json!(message);
            }
            AppError::Storage(StorageError::UniqueViolation { constraint }) => {
                tracing::warn!(constraint = %constraint, "Unique constraint reached the API layer");
                body["message"] = json!("A record with this information already exists");
            }
            AppError::Storage(StorageError::ForeignKeyViolation { constraint }) => {
                tracing::warn!(constraint = %constraint, "Foreign key constraint reached the API layer");
                body["message"] = json!("Referenced record does not exist");
            }
            AppError::Storage(StorageError::Backend(e)) => {
                tracing::error!(error = %e, "Storage failure");
                body["message"] = json!("An unexpected error occurred");
            }
            AppError::Internal(e) => {
                tracing::error!(error = %e, "Internal failure");
                body["message"] = json!("An unexpected error occurred");
            }
        }

        HttpResponse::build(self.status_code()).json(body)
    }
}
