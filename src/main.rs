//! E-wallet HTTP server - Main Application Entry Point
//!
//! Serves the profile, account creation and listing endpoints.
//!
//! # Startup Flow
//!
//! 1. Load configuration from environment variables
//! 2. Create database connection pool
//! 3. Run database migrations
//! 4. Build the profile and account services over the Postgres store
//! 5. Start server on configured port

use e_wallet::{
    app, config::Config, db, logging, repository::postgres::PgStore,
    services::{account_service::AccountService, profile_service::ProfileService},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();

    let config = Config::from_env()?;
    tracing::info!("Configuration loaded");

    let pool = db::create_pool(&config.database_url, config.database_max_connections).await?;
    tracing::info!("Database pool created");

    db::run_migrations(&pool).await?;
    tracing::info!("Database migrations complete");

    let store = PgStore::new(pool.clone());
    let app = app(
        AccountService::from_store(store.clone()),
        ProfileService::from_store(store),
        pool,
    );

    let addr = format!("0.0.0.0:{}", config.server_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
