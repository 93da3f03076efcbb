//! HTTP error types for the pwdm server.
//!
//! Maps storage and token errors into HTTP responses. Every error variant
//! produces a JSON body with a machine-readable `error` field and a
//! human-readable `message`. Internal failures are logged in full and
//! reported to the caller only as "internal server error".

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use pwdm_core::TokenError;
use pwdm_storage::StorageError;

/// Why an authenticated call was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFailure {
    /// No `token` header was supplied.
    MissingToken,
    /// The token failed verification (bad signature, expired, malformed).
    InvalidToken,
}

impl AuthFailure {
    const fn message(self) -> &'static str {
        match self {
            Self::MissingToken => "missing token",
            Self::InvalidToken => "invalid token",
        }
    }
}

/// Application-level error returned from HTTP handlers.
#[derive(Debug)]
pub enum AppError {
    /// Missing or unverifiable bearer token.
    Unauthenticated(AuthFailure),
    /// Unknown login or wrong password.
    InvalidCredentials,
    /// Record absent, deleted, or owned by someone else.
    NotFound(String),
    /// Client sent invalid input.
    BadRequest(String),
    /// Login already registered.
    Conflict(String),
    /// Internal server error. The detail is logged, never returned.
    Internal(String),
}

/// JSON error response body.
#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match self {
            Self::Unauthenticated(reason) => (
                StatusCode::UNAUTHORIZED,
                "unauthenticated",
                reason.message().to_owned(),
            ),
            Self::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                "invalid_credentials",
                "login or password incorrect".to_owned(),
            ),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg),
            Self::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg),
            Self::Internal(msg) => {
                tracing::error!(error = %msg, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "internal server error".to_owned(),
                )
            }
        };

        let body = ErrorBody {
            error: error_type,
            message,
        };

        (status, axum::Json(body)).into_response()
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::UserAlreadyExists => Self::Conflict(err.to_string()),
            // A login that vanished between validation and lookup is reported
            // exactly like a wrong password.
            StorageError::InvalidCredentials | StorageError::UserNotFound => {
                Self::InvalidCredentials
            }
            StorageError::NotFound => Self::NotFound(err.to_string()),
            StorageError::InvalidRecord { .. } => Self::BadRequest(err.to_string()),
            StorageError::Database { .. }
            | StorageError::Schema { .. }
            | StorageError::Encoding { .. }
            | StorageError::Hashing { .. } => Self::Internal(err.to_string()),
        }
    }
}

impl From<TokenError> for AppError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::InvalidSignature
            | TokenError::InvalidClaims
            | TokenError::Expired
            | TokenError::Malformed => Self::Unauthenticated(AuthFailure::InvalidToken),
            TokenError::Signing { .. } | TokenError::KeyGeneration { .. } => {
                Self::Internal(err.to_string())
            }
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}
