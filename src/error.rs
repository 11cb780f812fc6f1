//! Error types and HTTP error response handling.
//!
//! This module defines all engine errors and how they are converted
//! into HTTP responses with appropriate status codes and JSON bodies.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

/// Application-wide error type.
///
/// # Error Categories
///
/// - **Repository Errors**: Any sqlx::Error from persistence operations
/// - **Resource Errors**: User, profile or account not found
/// - **Policy Errors**: Account-count limits, unknown fixed terms, duplicate national IDs
/// - **Validation Errors**: Invalid request data
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Persistence operation failed (connection error, query error, constraint).
    ///
    /// Propagated unchanged from the repository layer. Returns HTTP 500.
    #[error("Repository error: {0}")]
    Repository(#[from] sqlx::Error),

    /// The user does not exist.
    #[error("User not found")]
    UserNotFound,

    /// The user exists but has not completed their profile yet.
    ///
    /// Accounts can only be opened once profile data is on file.
    #[error("User profile must be completed before creating accounts")]
    ProfileIncomplete,

    /// Another user already registered this national ID.
    #[error("National ID already registered for another user")]
    NationalIdTaken,

    /// Requested account does not exist.
    #[error("Account not found")]
    AccountNotFound,

    /// The user already owns a payment account.
    #[error("User can have at most 1 payment account")]
    LimitPaymentAccount,

    /// The user already owns the maximum number of savings accounts.
    #[error("User can have at most 5 savings accounts")]
    LimitSavingsAccount,

    /// The fixed term is not one of the offered products.
    #[error("Invalid term months: {0}")]
    InvalidTermMonths(u32),

    /// Request body or parameters are invalid.
    #[error("Invalid request")]
    InvalidRequest(String),
}

impl AppError {
    /// Stable machine-readable code used in the JSON error body.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Repository(_) => "internal_error",
            AppError::UserNotFound => "user_not_found",
            AppError::ProfileIncomplete => "profile_incomplete",
            AppError::NationalIdTaken => "national_id_taken",
            AppError::AccountNotFound => "account_not_found",
            AppError::LimitPaymentAccount => "limit_payment_account",
            AppError::LimitSavingsAccount => "limit_savings_account",
            AppError::InvalidTermMonths(_) => "invalid_term_months",
            AppError::InvalidRequest(_) => "invalid_request",
        }
    }
}

/// Convert AppError into an HTTP response.
///
/// All errors return JSON in this format:
/// ```json
/// {
///   "error": {
///     "code": "error_type",
///     "message": "Human-readable error message"
///   }
/// }
/// ```
///
/// # Status Code Mapping
///
/// - `UserNotFound`, `AccountNotFound` → 404 Not Found
/// - `ProfileIncomplete`, `LimitPaymentAccount`, `LimitSavingsAccount` → 422 Unprocessable Entity
/// - `NationalIdTaken` → 409 Conflict
/// - `InvalidTermMonths`, `InvalidRequest` → 400 Bad Request
/// - `Repository` → 500 Internal Server Error (hides details from client)
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let code = self.code();
        let (status, message) = match self {
            AppError::UserNotFound | AppError::AccountNotFound => {
                (StatusCode::NOT_FOUND, self.to_string())
            }
            AppError::ProfileIncomplete
            | AppError::LimitPaymentAccount
            | AppError::LimitSavingsAccount => {
                (StatusCode::UNPROCESSABLE_ENTITY, self.to_string())
            }
            AppError::NationalIdTaken => (StatusCode::CONFLICT, self.to_string()),
            AppError::InvalidTermMonths(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            AppError::InvalidRequest(ref msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Repository(ref err) => {
                tracing::error!(error = %err, "repository failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
