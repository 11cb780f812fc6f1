//! E-wallet account engine.
//!
//! Opens payment, fixed savings and flexible savings accounts behind a
//! profile-completion gate and per-user limits, and accrues tiered daily
//! interest on flexible savings into an append-only ledger.
//!
//! # Architecture
//!
//! - **Web Framework**: Axum (async HTTP server)
//! - **Database**: PostgreSQL with sqlx, behind repository traits
//! - **Money**: `rust_decimal::Decimal`, never floats
//! - **Entry points**: `e_wallet` (HTTP server) and `accrual_worker` (daily job)

pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod logging;
pub mod models;
pub mod repository;
pub mod services;

use axum::Router;
use tower_http::trace::TraceLayer;

use crate::{
    db::DbPool,
    services::{account_service::AccountService, profile_service::ProfileService},
};

/// Full HTTP application: profile and account routes, health check and request tracing.
pub fn app(accounts: AccountService, profiles: ProfileService, pool: DbPool) -> Router {
    Router::new()
        .merge(handlers::health::routes(pool))
        .merge(handlers::profiles::routes(profiles))
        .merge(handlers::accounts::routes(accounts))
        .layer(TraceLayer::new_for_http())
}
