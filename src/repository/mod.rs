//! Repository contracts the account engine depends on.
//!
//! Two adapters implement them:
//! - `postgres`: sqlx-backed, used by the server and the accrual worker
//! - `memory`: in-process, used by tests
//!
//! The interest accrual writes (balance update, ledger entry, interest history)
//! go through [`UnitOfWork`] so that each account's triplet commits or rolls
//! back as one.

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{
    account::Account,
    interest_history::InterestHistory,
    transaction::Transaction,
    user::{Profile, User},
};

pub mod memory;
pub mod postgres;

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Fails with `UserNotFound` if the user does not exist.
    async fn get_by_id(&self, user_id: Uuid) -> Result<User, AppError>;
}

#[async_trait]
pub trait ProfileRepository: Send + Sync {
    /// Fails with `ProfileIncomplete` if the user has no profile on file.
    async fn get_by_user_id(&self, user_id: Uuid) -> Result<Profile, AppError>;

    /// Whether a user other than `exclude_user_id` holds this national ID.
    async fn national_id_taken(
        &self,
        national_id: &str,
        exclude_user_id: Uuid,
    ) -> Result<bool, AppError>;

    /// Insert the profile or replace the user's existing one, keeping its `created_at`.
    ///
    /// A national ID held by another user is rejected with `NationalIdTaken`
    /// by the storage layer itself.
    async fn upsert(&self, profile: Profile) -> Result<Profile, AppError>;
}

#[async_trait]
pub trait AccountRepository: Send + Sync {
    /// Persist a new account.
    ///
    /// A second payment account for the same user is rejected with
    /// `LimitPaymentAccount` by the storage layer itself.
    async fn create(&self, account: Account) -> Result<Account, AppError>;

    async fn get_by_id(&self, account_id: Uuid) -> Result<Account, AppError>;

    /// The user's payment account, if one exists.
    async fn get_payment_account(&self, user_id: Uuid) -> Result<Option<Account>, AppError>;

    /// Fixed and flexible savings accounts owned by the user.
    async fn count_savings_accounts(&self, user_id: Uuid) -> Result<usize, AppError>;

    /// Every flexible savings account in the system.
    async fn get_flexible_savings_accounts(&self) -> Result<Vec<Account>, AppError>;

    /// The user's accounts, newest first.
    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<Account>, AppError>;
}

#[async_trait]
pub trait TransactionRepository: Send + Sync {
    /// Ledger entries of one account, newest first.
    async fn list_by_account(&self, account_id: Uuid) -> Result<Vec<Transaction>, AppError>;
}

/// Starts atomic accrual units.
#[async_trait]
pub trait UnitOfWork: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn AccrualUnit>, AppError>;
}

/// Writes belonging to a single account's interest accrual.
///
/// Nothing becomes visible until `commit`; dropping the unit discards every write.
#[async_trait]
pub trait AccrualUnit: Send {
    /// Lock the account for the rest of the unit and read its current state.
    ///
    /// Other units locking the same account wait until this one commits or is
    /// dropped, so the returned balance is the one the unit's writes build on.
    async fn lock_account(&mut self, account_id: Uuid) -> Result<Account, AppError>;

    /// Whether interest for `(account_id, date)` has already been recorded.
    async fn interest_recorded(&mut self, account_id: Uuid, date: NaiveDate)
    -> Result<bool, AppError>;

    async fn update_balance(&mut self, account_id: Uuid, new_balance: Decimal)
    -> Result<(), AppError>;

    async fn create_transaction(&mut self, transaction: Transaction)
    -> Result<Transaction, AppError>;

    async fn create_interest_history(
        &mut self,
        history: InterestHistory,
    ) -> Result<InterestHistory, AppError>;

    async fn commit(self: Box<Self>) -> Result<(), AppError>;
}
