//! Daily interest accrual over all flexible savings accounts.
//!
//! # Process
//!
//! 1. Attribute the run to yesterday's date
//! 2. Fetch every flexible savings account
//! 3. For each account, through a bounded worker pool:
//!    - open a unit of work and lock the account, reading its current balance
//!    - skip if `(account, date)` was already accrued
//!    - compute the tiered daily interest; zero means nothing is written
//!    - update the balance, append the ledger entry and the interest history
//!    - commit, so the three writes land together or not at all
//! 4. Return a report listing what happened to every account
//!
//! A failing account is logged and reported; it does not stop the others.
//! Fixed savings accounts are not touched by this job.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use futures::{StreamExt, stream};
use rust_decimal::Decimal;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{account::Account, interest_history::InterestHistory, transaction::Transaction},
    services::{account_service::AccountService, interest_calculator},
};

/// What happened to one account during a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccrualOutcome {
    Credited {
        interest: Decimal,
        balance_after: Decimal,
    },
    /// Interest rounded to zero, nothing written.
    SkippedZero,
    /// Interest for this date is already recorded, nothing written.
    AlreadyAccrued,
}

#[derive(Debug)]
pub struct AccrualFailure {
    pub account_id: Uuid,
    pub error: AppError,
}

/// Summary of one accrual run.
#[derive(Debug)]
pub struct AccrualReport {
    pub date: NaiveDate,
    pub credited: Vec<Uuid>,
    pub skipped_zero: Vec<Uuid>,
    pub already_accrued: Vec<Uuid>,
    pub failed: Vec<AccrualFailure>,
    pub total_interest: Decimal,
}

impl AccrualReport {
    fn new(date: NaiveDate) -> Self {
        Self {
            date,
            credited: Vec::new(),
            skipped_zero: Vec::new(),
            already_accrued: Vec::new(),
            failed: Vec::new(),
            total_interest: Decimal::ZERO,
        }
    }

    fn record(&mut self, account_id: Uuid, outcome: Result<AccrualOutcome, AppError>) {
        match outcome {
            Ok(AccrualOutcome::Credited { interest, .. }) => {
                self.credited.push(account_id);
                self.total_interest += interest;
            }
            Ok(AccrualOutcome::SkippedZero) => self.skipped_zero.push(account_id),
            Ok(AccrualOutcome::AlreadyAccrued) => self.already_accrued.push(account_id),
            Err(error) => {
                error!(%account_id, date = %self.date, error = %error, "interest accrual failed");
                self.failed.push(AccrualFailure { account_id, error });
            }
        }
    }

    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn processed(&self) -> usize {
        self.credited.len() + self.skipped_zero.len() + self.already_accrued.len() + self.failed.len()
    }
}

/// The day a run started at `now` accrues interest for.
pub fn accrual_date(now: DateTime<Utc>) -> NaiveDate {
    now.date_naive() - Duration::days(1)
}

impl AccountService {
    /// Accrue one day of interest on every flexible savings account.
    ///
    /// Safe to re-run for the same day: accounts already accrued for the
    /// date are reported as such and left unchanged.
    ///
    /// # Errors
    ///
    /// Only a failure to list the accounts aborts the run. Per-account
    /// failures are collected in [`AccrualReport::failed`].
    pub async fn calculate_daily_interest(
        &self,
        now: DateTime<Utc>,
    ) -> Result<AccrualReport, AppError> {
        let date = accrual_date(now);
        let accounts = self.accounts.get_flexible_savings_accounts().await?;
        info!(
            %date,
            accounts = accounts.len(),
            workers = self.accrual_workers,
            "starting daily interest accrual"
        );

        let outcomes: Vec<(Uuid, Result<AccrualOutcome, AppError>)> = stream::iter(accounts)
            .map(|account| async move {
                let outcome = self.accrue_account(&account, date, now).await;
                (account.id, outcome)
            })
            .buffer_unordered(self.accrual_workers)
            .collect()
            .await;

        let mut report = AccrualReport::new(date);
        for (account_id, outcome) in outcomes {
            report.record(account_id, outcome);
        }

        if report.is_success() {
            info!(
                %date,
                credited = report.credited.len(),
                skipped_zero = report.skipped_zero.len(),
                already_accrued = report.already_accrued.len(),
                total_interest = %report.total_interest,
                "daily interest accrual complete"
            );
        } else {
            warn!(
                %date,
                credited = report.credited.len(),
                skipped_zero = report.skipped_zero.len(),
                already_accrued = report.already_accrued.len(),
                failed = report.failed.len(),
                "daily interest accrual finished with failures"
            );
        }

        Ok(report)
    }

    /// `listed` only names the account; balance and age are read under the
    /// unit's account lock so overlapping runs build on each other's credits.
    async fn accrue_account(
        &self,
        listed: &Account,
        date: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<AccrualOutcome, AppError> {
        let mut unit = self.unit_of_work.begin().await?;
        let account = unit.lock_account(listed.id).await?;

        if unit.interest_recorded(account.id, date).await? {
            return Ok(AccrualOutcome::AlreadyAccrued);
        }

        let interest = interest_calculator::daily_interest(account.balance, account.age_days(now));
        if interest.is_zero() {
            return Ok(AccrualOutcome::SkippedZero);
        }

        let balance_after = account.balance + interest;
        unit.update_balance(account.id, balance_after).await?;
        unit.create_transaction(Transaction::interest(account.id, interest, balance_after))
            .await?;
        unit.create_interest_history(InterestHistory::new(account.id, date, interest))
            .await?;
        unit.commit().await?;

        tracing::debug!(account_id = %account.id, %interest, %balance_after, "interest credited");
        Ok(AccrualOutcome::Credited {
            interest,
            balance_after,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::account::FixedTerm,
        repository::memory::MemoryStore,
        services::account_service::tests::seed_user,
    };
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn run_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 10, 20, 0, 5, 0).unwrap()
    }

    async fn seed_flexible(
        store: &MemoryStore,
        user_id: Uuid,
        balance: Decimal,
        age_days: i64,
    ) -> Uuid {
        let mut account = Account::new_flexible_savings(user_id);
        account.balance = balance;
        account.created_at = run_time() - Duration::days(age_days);
        let id = account.id;
        store.insert_account(account).await;
        id
    }

    #[test]
    fn accrual_is_attributed_to_yesterday() {
        assert_eq!(
            accrual_date(run_time()),
            NaiveDate::from_ymd_opt(2025, 10, 19).unwrap()
        );
    }

    #[tokio::test]
    async fn credits_every_tier_and_skips_zero_balances() {
        let store = MemoryStore::new();
        let user_id = seed_user(&store, true).await;
        let low = seed_flexible(&store, user_id, dec!(1000000), 90).await;
        let promo = seed_flexible(&store, user_id, dec!(20000000), 10).await;
        let high = seed_flexible(&store, user_id, dec!(60000000), 90).await;
        let empty = seed_flexible(&store, user_id, Decimal::ZERO, 90).await;
        let middle = seed_flexible(&store, user_id, dec!(30000000), 90).await;

        let service = AccountService::from_store(store.clone());
        let report = service.calculate_daily_interest(run_time()).await.unwrap();

        assert!(report.is_success());
        assert_eq!(report.processed(), 5);
        assert_eq!(report.credited.len(), 4);
        assert_eq!(report.skipped_zero, vec![empty]);

        let expected = [
            (low, dec!(8.2192)),
            (promo, dec!(438.3562)),
            (high, dec!(821.9178)),
            (middle, dec!(328.7671)),
        ];
        for (account_id, interest) in expected {
            let account = store.account(account_id).await.unwrap();
            let transactions = store.transactions_for(account_id).await;
            let history = store.interest_history_for(account_id).await;

            assert_eq!(transactions.len(), 1);
            assert_eq!(transactions[0].amount, interest);
            assert_eq!(transactions[0].balance_after, account.balance);
            assert_eq!(history.len(), 1);
            assert_eq!(history[0].interest_amount, interest);
            assert_eq!(history[0].date, report.date);
        }

        assert!(store.transactions_for(empty).await.is_empty());
        assert!(store.interest_history_for(empty).await.is_empty());
        assert_eq!(store.account(empty).await.unwrap().balance, Decimal::ZERO);
    }

    #[tokio::test]
    async fn rerun_for_same_day_does_not_double_credit() {
        let store = MemoryStore::new();
        let user_id = seed_user(&store, true).await;
        let account_id = seed_flexible(&store, user_id, dec!(5000000), 40).await;
        let service = AccountService::from_store(store.clone());

        let first = service.calculate_daily_interest(run_time()).await.unwrap();
        let second = service.calculate_daily_interest(run_time()).await.unwrap();

        assert_eq!(first.credited, vec![account_id]);
        assert!(second.credited.is_empty());
        assert_eq!(second.already_accrued, vec![account_id]);
        assert_eq!(
            store.account(account_id).await.unwrap().balance,
            dec!(5000041.0959)
        );
        assert_eq!(store.transactions_for(account_id).await.len(), 1);
        assert_eq!(store.interest_history_for(account_id).await.len(), 1);
    }

    #[tokio::test]
    async fn next_day_accrues_on_the_new_balance() {
        let store = MemoryStore::new();
        let user_id = seed_user(&store, true).await;
        let account_id = seed_flexible(&store, user_id, dec!(5000000), 40).await;
        let service = AccountService::from_store(store.clone());

        service.calculate_daily_interest(run_time()).await.unwrap();
        service
            .calculate_daily_interest(run_time() + Duration::days(1))
            .await
            .unwrap();

        let transactions = store.transactions_for(account_id).await;
        assert_eq!(transactions.len(), 2);
        // 5000041.0959 * 0.003 / 365 = 41.09623... rounds to 41.0962
        assert_eq!(
            store.account(account_id).await.unwrap().balance,
            dec!(5000082.1921)
        );
    }

    #[tokio::test]
    async fn stale_listing_builds_on_the_committed_balance() {
        let store = MemoryStore::new();
        let user_id = seed_user(&store, true).await;
        let account_id = seed_flexible(&store, user_id, dec!(5000000), 40).await;
        let service = AccountService::from_store(store.clone());
        let stale = store.account(account_id).await.unwrap();

        service.calculate_daily_interest(run_time()).await.unwrap();
        let next_run = run_time() + Duration::days(1);
        let outcome = service
            .accrue_account(&stale, accrual_date(next_run), next_run)
            .await
            .unwrap();

        assert_eq!(
            outcome,
            AccrualOutcome::Credited {
                interest: dec!(41.0962),
                balance_after: dec!(5000082.1921),
            }
        );
        assert_eq!(
            store.account(account_id).await.unwrap().balance,
            dec!(5000082.1921)
        );
    }

    #[tokio::test]
    async fn overlapping_runs_for_different_days_keep_both_credits() {
        let store = MemoryStore::new();
        let user_id = seed_user(&store, true).await;
        let account_id = seed_flexible(&store, user_id, dec!(5000000), 40).await;
        let service = AccountService::from_store(store.clone());

        let (first, second) = tokio::join!(
            service.calculate_daily_interest(run_time()),
            service.calculate_daily_interest(run_time() + Duration::days(1)),
        );
        assert_eq!(first.unwrap().credited, vec![account_id]);
        assert_eq!(second.unwrap().credited, vec![account_id]);

        let balance = store.account(account_id).await.unwrap().balance;
        assert_eq!(balance, dec!(5000082.1921));

        let transactions = store.transactions_for(account_id).await;
        assert_eq!(transactions.len(), 2);
        let credited: Decimal = transactions.iter().map(|t| t.amount).sum();
        assert_eq!(dec!(5000000) + credited, balance);
        assert!(transactions.iter().any(|t| t.balance_after == balance));
    }

    #[tokio::test]
    async fn concurrent_runs_for_the_same_day_credit_once() {
        let store = MemoryStore::new();
        let user_id = seed_user(&store, true).await;
        let account_id = seed_flexible(&store, user_id, dec!(5000000), 40).await;
        let service = AccountService::from_store(store.clone());

        let (first, second) = tokio::join!(
            service.calculate_daily_interest(run_time()),
            service.calculate_daily_interest(run_time()),
        );
        let (first, second) = (first.unwrap(), second.unwrap());

        assert!(first.is_success() && second.is_success());
        assert_eq!(first.credited.len() + second.credited.len(), 1);
        assert_eq!(
            first.already_accrued.len() + second.already_accrued.len(),
            1
        );
        assert_eq!(
            store.account(account_id).await.unwrap().balance,
            dec!(5000041.0959)
        );
        assert_eq!(store.interest_history_for(account_id).await.len(), 1);
    }

    #[tokio::test]
    async fn one_failing_account_does_not_stop_the_run() {
        let store = MemoryStore::new();
        let user_id = seed_user(&store, true).await;
        let healthy = seed_flexible(&store, user_id, dec!(5000000), 40).await;
        let broken = seed_flexible(&store, user_id, dec!(5000000), 40).await;
        store.fail_accrual_for(broken).await;

        let service = AccountService::from_store(store.clone()).with_accrual_workers(1);
        let report = service.calculate_daily_interest(run_time()).await.unwrap();

        assert!(!report.is_success());
        assert_eq!(report.credited, vec![healthy]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].account_id, broken);
        assert!(matches!(report.failed[0].error, AppError::Repository(_)));

        // The failed unit rolled back its balance and ledger writes
        assert_eq!(store.account(broken).await.unwrap().balance, dec!(5000000));
        assert!(store.transactions_for(broken).await.is_empty());
        assert!(store.interest_history_for(broken).await.is_empty());
    }

    #[tokio::test]
    async fn account_listing_failure_aborts_the_run() {
        let store = MemoryStore::new();
        store.fail_account_listing().await;

        let result = AccountService::from_store(store)
            .calculate_daily_interest(run_time())
            .await;

        assert!(matches!(result, Err(AppError::Repository(_))));
    }

    #[tokio::test]
    async fn fixed_savings_are_not_accrued() {
        let store = MemoryStore::new();
        let user_id = seed_user(&store, true).await;
        let mut fixed = Account::new_fixed_savings(
            user_id,
            FixedTerm {
                months: 12,
                annual_rate: dec!(7.2),
            },
        );
        fixed.balance = dec!(10000000);
        let fixed_id = fixed.id;
        store.insert_account(fixed).await;

        let report = AccountService::from_store(store.clone())
            .calculate_daily_interest(run_time())
            .await
            .unwrap();

        assert_eq!(report.processed(), 0);
        assert_eq!(store.account(fixed_id).await.unwrap().balance, dec!(10000000));
    }

    #[tokio::test]
    async fn many_accounts_with_parallel_workers() {
        let store = MemoryStore::new();
        let user_id = seed_user(&store, true).await;
        let mut ids = Vec::new();
        for _ in 0..20 {
            ids.push(seed_flexible(&store, user_id, dec!(5000000), 10).await);
        }

        let report = AccountService::from_store(store.clone())
            .with_accrual_workers(8)
            .calculate_daily_interest(run_time())
            .await
            .unwrap();

        assert_eq!(report.credited.len(), 20);
        assert_eq!(report.total_interest, dec!(109.5890) * dec!(20));
        for id in ids {
            assert_eq!(store.account(id).await.unwrap().balance, dec!(5000109.5890));
        }
    }
}
