//! Account HTTP handlers.
//!
//! This module implements the account API endpoints:
//! - POST /api/v1/users/{user_id}/accounts/payment - Open the payment account
//! - POST /api/v1/users/{user_id}/accounts/savings/fixed - Open a fixed savings account
//! - POST /api/v1/users/{user_id}/accounts/savings/flexible - Open a flexible savings account
//! - GET /api/v1/users/{user_id}/accounts - List a user's accounts
//! - GET /api/v1/accounts/{account_id}/transactions - List an account's ledger entries
//!
//! Caller identity is established upstream; the user id arrives in the path.

use axum::{
    Json, Router,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    routing::{get, post},
};
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{
        account::{AccountResponse, CreateFixedSavingsRequest},
        transaction::Transaction,
    },
    services::account_service::AccountService,
};

/// Routes for account management, sharing one `AccountService`.
pub fn routes(service: AccountService) -> Router {
    Router::new()
        .route(
            "/api/v1/users/{user_id}/accounts",
            get(list_accounts),
        )
        .route(
            "/api/v1/users/{user_id}/accounts/payment",
            post(create_payment_account),
        )
        .route(
            "/api/v1/users/{user_id}/accounts/savings/fixed",
            post(create_fixed_savings_account),
        )
        .route(
            "/api/v1/users/{user_id}/accounts/savings/flexible",
            post(create_flexible_savings_account),
        )
        .route(
            "/api/v1/accounts/{account_id}/transactions",
            get(list_transactions),
        )
        .with_state(service)
}

/// Open the user's payment account.
///
/// # Response
///
/// - **201 Created**: the new account
/// - **404**: user not found
/// - **422**: profile incomplete, or a payment account already exists
pub async fn create_payment_account(
    State(service): State<AccountService>,
    Path(user_id): Path<Uuid>,
) -> Result<(StatusCode, Json<AccountResponse>), AppError> {
    let account = service.create_payment_account(user_id).await?;
    Ok((StatusCode::CREATED, Json(account.into())))
}

/// Open a fixed savings account.
///
/// # Request Body
///
/// ```json
/// { "term_months": 6 }
/// ```
///
/// # Response
///
/// - **201 Created**: the new account with its locked rate and term
/// - **400**: malformed body, or term not offered (valid terms: 1, 3, 6, 8, 12)
/// - **404**: user not found
/// - **422**: profile incomplete, or five savings accounts already open
pub async fn create_fixed_savings_account(
    State(service): State<AccountService>,
    Path(user_id): Path<Uuid>,
    payload: Result<Json<CreateFixedSavingsRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<AccountResponse>), AppError> {
    let Json(request) =
        payload.map_err(|rejection| AppError::InvalidRequest(rejection.body_text()))?;
    let account = service
        .create_fixed_savings_account(user_id, request.term_months)
        .await?;
    Ok((StatusCode::CREATED, Json(account.into())))
}

/// Open a flexible savings account.
pub async fn create_flexible_savings_account(
    State(service): State<AccountService>,
    Path(user_id): Path<Uuid>,
) -> Result<(StatusCode, Json<AccountResponse>), AppError> {
    let account = service.create_flexible_savings_account(user_id).await?;
    Ok((StatusCode::CREATED, Json(account.into())))
}

/// List a user's accounts, newest first.
pub async fn list_accounts(
    State(service): State<AccountService>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<Vec<AccountResponse>>, AppError> {
    let accounts = service.list_accounts(user_id).await?;
    Ok(Json(accounts.into_iter().map(Into::into).collect()))
}

/// List an account's ledger entries, newest first.
pub async fn list_transactions(
    State(service): State<AccountService>,
    Path(account_id): Path<Uuid>,
) -> Result<Json<Vec<Transaction>>, AppError> {
    Ok(Json(service.list_transactions(account_id).await?))
}
