//! HTTP request handlers (route handlers).
//!
//! Handlers extract path/body data, call the account service and map the
//! result (or `AppError`) into a JSON response.

/// Account creation and listing endpoints
pub mod accounts;
/// Liveness and database connectivity
pub mod health;
/// Profile completion
pub mod profiles;
