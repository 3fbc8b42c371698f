//! Application error taxonomy and HTTP mapping

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::storage::StorageError;

/// Every failure a request handler can surface.
///
/// Ceremony-sequencing and credential errors are expected, user-triggerable
/// conditions and carry precise but low-detail messages. Storage faults are
/// operator-facing: logged with context, returned to the client opaquely.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Too many requests")]
    RateLimited { retry_after: u64 },

    /// Ceremony out of sequence: missing challenge cookie, no matching
    /// challenge row, or a challenge redeemed for the wrong ceremony type.
    /// Recoverable by restarting from Begin.
    #[error("{0}")]
    Sequence(String),

    /// Unknown credential id or failed cryptographic verification.
    /// Terminal for the attempt; the client must restart the ceremony.
    #[error("{0}")]
    Credential(String),

    #[error("Not authenticated")]
    Unauthorized,

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Validation(String),

    #[error("storage error: {0}")]
    Storage(StorageError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            // A duplicate credential id is a client-visible ceremony failure,
            // not an operator fault.
            StorageError::UniquenessViolation => {
                AppError::Credential("Credential already registered".into())
            }
            other => AppError::Storage(other),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::RateLimited { .. } => {
                (StatusCode::TOO_MANY_REQUESTS, "Too many requests".to_string())
            }
            AppError::Sequence(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Credential(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "Not authenticated".to_string()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Storage(e) => {
                // Full detail stays in the server log; the client gets nothing
                // it could use to probe the backend.
                tracing::error!("storage fault: {e:?}");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal error".to_string())
            }
            AppError::Internal(e) => {
                tracing::error!("internal error: {e}");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal error".to_string())
            }
        };

        let mut response = (status, Json(json!({ "error": message }))).into_response();

        if let AppError::RateLimited { retry_after } = self {
            if let Ok(value) = retry_after.to_string().parse() {
                response.headers_mut().insert("Retry-After", value);
            }
        }

        response
    }
}

pub type AppResult<T> = Result<T, AppError>;
