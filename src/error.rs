//! Error types for Custodia server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Numeric error codes returned to clients
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ErrorCode {
    NotFound = 2,
    DuplicateKey = 3,
    InvalidFormat = 4,
    InvalidState = 5,
    StoreUnavailable = 6,
    DbFailure = 7,
}

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Duplicate key: {0}")]
    DuplicateKey(String),

    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Database error: {0}")]
    Database(sqlx::Error),
}

impl AppError {
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::NotFound(_) => ErrorCode::NotFound,
            AppError::DuplicateKey(_) => ErrorCode::DuplicateKey,
            AppError::InvalidFormat(_) => ErrorCode::InvalidFormat,
            AppError::InvalidState(_) => ErrorCode::InvalidState,
            AppError::StoreUnavailable(_) => ErrorCode::StoreUnavailable,
            AppError::Database(_) => ErrorCode::DbFailure,
        }
    }

    /// Errors worth one reconnect-and-retry
    pub fn is_transient(&self) -> bool {
        matches!(self, AppError::StoreUnavailable(_))
    }
}

/// Name of the unique constraint violated by `err`, if any
pub fn unique_violation(err: &sqlx::Error) -> Option<String> {
    match err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            Some(db.constraint().unwrap_or_default().to_string())
        }
        _ => None,
    }
}

/// Whether `err` is a foreign key violation
pub fn foreign_key_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_foreign_key_violation())
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        if let Some(constraint) = unique_violation(&err) {
            return AppError::DuplicateKey(format!("Unique constraint {} violated", constraint));
        }
        match err {
            sqlx::Error::Io(e) => AppError::StoreUnavailable(e.to_string()),
            sqlx::Error::Tls(e) => AppError::StoreUnavailable(e.to_string()),
            sqlx::Error::PoolTimedOut => {
                AppError::StoreUnavailable("Timed out waiting for a database connection".to_string())
            }
            sqlx::Error::PoolClosed => {
                AppError::StoreUnavailable("Database pool is closed".to_string())
            }
            other => AppError::Database(other),
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut messages: Vec<String> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| match &e.message {
                    Some(msg) => format!("{}: {}", field, msg),
                    None => format!("{}: invalid value", field),
                })
            })
            .collect();
        messages.sort();
        AppError::InvalidFormat(messages.join("; "))
    }
}

/// Error response body
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub code: u32,
    pub error: String,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let code = self.code();
        let (status, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::DuplicateKey(msg) => (StatusCode::CONFLICT, msg.clone()),
            AppError::InvalidFormat(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::InvalidState(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg.clone()),
            AppError::StoreUnavailable(msg) => {
                tracing::error!("Store unavailable: {}", msg);
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "Database unavailable".to_string(),
                )
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Database error".to_string(),
                )
            }
        };

        let body = Json(ErrorResponse {
            code: code as u32,
            error: format!("{:?}", code),
            message,
        });

        (status, body).into_response()
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;
