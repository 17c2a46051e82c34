//! # API Error Type
//!
//! Unified error type for HTTP handlers.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in Lectern                                │
//! │                                                                         │
//! │  POST /rent_book                                                        │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │  Handler                                                         │  │
//! │  │  ApiResult<T>                                                    │  │
//! │  │         │                                                        │  │
//! │  │         ▼                                                        │  │
//! │  │  sqlx::Error ─── DbError ─── CoreError::StorageFailure ──┐      │  │
//! │  │         │                                                │      │  │
//! │  │         ▼                                                ▼      │  │
//! │  │  Rule broken? ─── CoreError::Conflict(..) ───────── ApiError ──►│  │
//! │  │         │                                                        │  │
//! │  │         ▼                                                        │  │
//! │  │  Success ──────────────────────────────────────────────────────►│  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! │                                                                         │
//! │  HTTP/1.1 400 Bad Request                                               │
//! │  { "code": "NO_COPIES_AVAILABLE",                                       │
//! │    "message": "No copies of book 7 are available" }                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Storage and internal failures are logged with their cause and answered
//! with a generic message.

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use lectern_core::{Conflict, CoreError, ValidationError};
use lectern_db::DbError;
use serde::Serialize;

/// Result type for handlers.
pub type ApiResult<T> = Result<T, ApiError>;

/// Error body returned by every failing route.
///
/// ```json
/// {
///   "code": "NOT_FOUND",
///   "message": "Book not found: 42"
/// }
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct ApiError {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,

    /// Answered with `Retry-After` so clients back off and retry.
    #[serde(skip)]
    pub retryable: bool,
}

/// Error codes for API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Book or reader does not exist (404)
    NotFound,

    /// Input failed field validation (422)
    ValidationError,

    /// Book has no free copy (400)
    NoCopiesAvailable,

    /// Reader already holds the maximum number of loans (400)
    BorrowLimitExceeded,

    /// No outstanding loan for the book/reader pair (400)
    NoActiveLoan,

    /// Reader already holds this book (400)
    AlreadyBorrowed,

    /// ISBN or email already taken (400)
    DuplicateUniqueField,

    /// Delete refused while books are on loan (409)
    OutstandingLoans,

    /// Store unavailable; the request may be retried (503)
    StorageFailure,

    /// Missing or invalid credentials (401)
    Unauthenticated,

    /// Internal server error (500)
    Internal,
}

impl ErrorCode {
    pub fn status(self) -> StatusCode {
        match self {
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::ValidationError => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorCode::NoCopiesAvailable
            | ErrorCode::BorrowLimitExceeded
            | ErrorCode::NoActiveLoan
            | ErrorCode::AlreadyBorrowed
            | ErrorCode::DuplicateUniqueField => StatusCode::BAD_REQUEST,
            ErrorCode::OutstandingLoans => StatusCode::CONFLICT,
            ErrorCode::StorageFailure => StatusCode::SERVICE_UNAVAILABLE,
            ErrorCode::Unauthenticated => StatusCode::UNAUTHORIZED,
            ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl ApiError {
    /// Creates a new API error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn unauthenticated(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Unauthenticated, message)
    }

    /// Creates an internal error. The cause is logged, not returned.
    pub fn internal(cause: impl std::fmt::Display) -> Self {
        tracing::error!("Internal error: {}", cause);
        ApiError::new(ErrorCode::Internal, "Internal server error")
    }

    pub fn status(&self) -> StatusCode {
        self.code.status()
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

/// Converts core errors to API errors.
impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        let message = err.to_string();
        let retryable = err.is_retryable();
        let mut api = match err {
            CoreError::NotFound { .. } => ApiError::new(ErrorCode::NotFound, message),
            CoreError::Conflict(conflict) => {
                let code = match conflict {
                    Conflict::NoCopiesAvailable { .. } => ErrorCode::NoCopiesAvailable,
                    Conflict::BorrowLimitExceeded { .. } => ErrorCode::BorrowLimitExceeded,
                    Conflict::NoActiveLoan { .. } => ErrorCode::NoActiveLoan,
                    Conflict::AlreadyBorrowed { .. } => ErrorCode::AlreadyBorrowed,
                    Conflict::DuplicateUniqueField { .. } => ErrorCode::DuplicateUniqueField,
                    Conflict::OutstandingLoans { .. } => ErrorCode::OutstandingLoans,
                };
                ApiError::new(code, message)
            }
            CoreError::Validation(e) => ApiError::from(e),
            CoreError::StorageFailure(cause) => {
                // Log the actual error but return a generic message
                tracing::error!("Storage failure: {}", cause);
                ApiError::new(
                    ErrorCode::StorageFailure,
                    "Storage is temporarily unavailable, please retry",
                )
            }
        };
        api.retryable = retryable;
        api
    }
}

/// Converts database errors to API errors via the core taxonomy.
impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        ApiError::from(CoreError::from(err))
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::new(ErrorCode::ValidationError, err.to_string())
    }
}

/// Seconds a client should wait before retrying a retryable failure.
const RETRY_AFTER_SECS: &str = "1";

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if self.code == ErrorCode::Unauthenticated {
            return (status, [(header::WWW_AUTHENTICATE, "Bearer")], Json(self)).into_response();
        }
        if self.retryable {
            return (status, [(header::RETRY_AFTER, RETRY_AFTER_SECS)], Json(self)).into_response();
        }
        (status, Json(self)).into_response()
    }
}
