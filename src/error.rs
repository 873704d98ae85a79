//! Error types and HTTP error response handling.
//!
//! This module defines all application errors and how they are converted
//! into HTTP responses with appropriate status codes and JSON bodies.
//! The same codes travel back over the wire, so the ledger client can
//! rebuild the original error on the settlement side.

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

/// Application-wide error type.
///
/// # Error Categories
///
/// - **Authentication Errors**: Missing or unknown bearer token
/// - **Lock Errors**: Contention or illegal use of an account lock
/// - **Resource Errors**: Unknown account
/// - **Capacity Errors**: Operation Queue full
/// - **Upstream Errors**: The Ledger Service could not be reached
/// - **Validation Errors**: Invalid request data
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Bearer token is missing or not registered.
    ///
    /// Returns HTTP 401 Unauthorized.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Account has no balance record.
    ///
    /// Returns HTTP 404 Not Found.
    #[error("Account not found")]
    AccountNotFound,

    /// The caller already holds the lock, or the bounded wait for it expired.
    ///
    /// Returns HTTP 200 with `error: -1`.
    #[error("Account is already locked")]
    AlreadyLocked,

    /// The account lock is recorded under a different owner.
    ///
    /// Returns HTTP 403 Forbidden.
    #[error("Account is locked by a different business")]
    OwnedByOther,

    /// A balance write was attempted on an account that was never locked.
    ///
    /// Returns HTTP 403 Forbidden.
    #[error("Account is not locked")]
    NotLocked,

    /// The lock was released while not held.
    ///
    /// Returns HTTP 200 with `error: -1`.
    #[error("Lock already released")]
    NotHeld,

    /// The Operation Queue is at capacity.
    ///
    /// Returns HTTP 503 Service Unavailable.
    #[error("Operation queue is full")]
    QueueFull,

    /// Request body or parameters are invalid.
    ///
    /// Returns HTTP 400 Bad Request.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The Ledger Service answered with something we could not interpret.
    ///
    /// Returns HTTP 502 Bad Gateway.
    #[error("Ledger unavailable: {0}")]
    LedgerUnavailable(String),

    /// HTTP transport failure while calling the Ledger Service.
    ///
    /// Returns HTTP 502 Bad Gateway.
    #[error("Ledger request failed: {0}")]
    Http(#[from] reqwest::Error),
}

impl AppError {
    /// Machine-readable error code carried in every error body.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::InvalidCredentials => "invalid_credentials",
            AppError::AccountNotFound => "account_not_found",
            AppError::AlreadyLocked => "already_locked",
            AppError::OwnedByOther => "owned_by_other",
            AppError::NotLocked => "not_locked",
            AppError::NotHeld => "not_held",
            AppError::QueueFull => "queue_full",
            AppError::InvalidRequest(_) => "invalid_request",
            AppError::LedgerUnavailable(_) | AppError::Http(_) => "ledger_unavailable",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AppError::AccountNotFound => StatusCode::NOT_FOUND,
            AppError::AlreadyLocked | AppError::NotHeld => StatusCode::OK,
            AppError::OwnedByOther | AppError::NotLocked => StatusCode::FORBIDDEN,
            AppError::QueueFull => StatusCode::SERVICE_UNAVAILABLE,
            AppError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            AppError::LedgerUnavailable(_) | AppError::Http(_) => StatusCode::BAD_GATEWAY,
        }
    }

    /// Rebuild an error from the `code` and `message` of a remote error body.
    pub fn from_code(code: &str, message: String) -> Self {
        match code {
            "invalid_credentials" => AppError::InvalidCredentials,
            "account_not_found" => AppError::AccountNotFound,
            "already_locked" => AppError::AlreadyLocked,
            "owned_by_other" => AppError::OwnedByOther,
            "not_locked" => AppError::NotLocked,
            "not_held" => AppError::NotHeld,
            "queue_full" => AppError::QueueFull,
            "invalid_request" => AppError::InvalidRequest(message),
            _ => AppError::LedgerUnavailable(message),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::InvalidRequest(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::InvalidRequest(rejection.body_text())
    }
}

/// Convert AppError into an HTTP response.
///
/// # Response Format
///
/// All errors return JSON in this format:
/// ```json
/// {
///   "error": -1,
///   "code": "owned_by_other",
///   "message": "Account is locked by a different business"
/// }
/// ```
///
/// Transport failures are logged but their details are not sent to the client.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            AppError::Http(err) => {
                tracing::error!(error = %err, "Ledger request failed");
                "The ledger service could not be reached".to_string()
            }
            _ => self.to_string(),
        };

        let body = Json(json!({
            "error": -1,
            "code": self.code(),
            "message": message
        }));

        (status, body).into_response()
    }
}
