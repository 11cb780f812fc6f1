//! Daily interest accrual worker.
//!
//! Meant to be started once a day by an external scheduler (cron, k8s
//! CronJob). Runs one accrual pass over all flexible savings accounts and
//! exits non-zero if listing the accounts fails or any account could not
//! be accrued. Re-running for the same day only retries the accounts that
//! were not accrued yet.

use anyhow::bail;
use chrono::Utc;
use e_wallet::{
    config::Config, db, logging, repository::postgres::PgStore,
    services::account_service::AccountService,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();

    let config = Config::from_env()?;
    let pool = db::create_pool(&config.database_url, config.database_max_connections).await?;
    db::run_migrations(&pool).await?;

    let service = AccountService::from_store(PgStore::new(pool))
        .with_accrual_workers(config.accrual_workers());

    let report = service.calculate_daily_interest(Utc::now()).await?;

    if !report.is_success() {
        for failure in &report.failed {
            tracing::error!(account_id = %failure.account_id, error = %failure.error, "account not accrued");
        }
        bail!(
            "interest accrual for {} failed on {} of {} accounts",
            report.date,
            report.failed.len(),
            report.processed()
        );
    }

    tracing::info!(
        date = %report.date,
        credited = report.credited.len(),
        "Interest calculation completed successfully"
    );
    Ok(())
}
