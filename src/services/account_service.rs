//! Account service - opening accounts and reading them back.
//!
//! Every creation flow runs the same gate before writing:
//!
//! 1. The user must exist
//! 2. The user's profile must be complete
//! 3. The product's per-user limit must not be reached
//!
//! Only then is the account built by its factory and persisted. The storage
//! layer enforces one payment account per user as well, so two concurrent
//! requests cannot both slip past the count check.

use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{account::Account, transaction::Transaction},
    repository::{
        AccountRepository, ProfileRepository, TransactionRepository, UnitOfWork, UserRepository,
    },
    services::account_policy,
};

/// Default number of accounts accrued concurrently.
pub const DEFAULT_ACCRUAL_WORKERS: usize = 4;

#[derive(Clone)]
pub struct AccountService {
    pub(crate) users: Arc<dyn UserRepository>,
    pub(crate) profiles: Arc<dyn ProfileRepository>,
    pub(crate) accounts: Arc<dyn AccountRepository>,
    pub(crate) transactions: Arc<dyn TransactionRepository>,
    pub(crate) unit_of_work: Arc<dyn UnitOfWork>,
    pub(crate) accrual_workers: usize,
}

impl AccountService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        profiles: Arc<dyn ProfileRepository>,
        accounts: Arc<dyn AccountRepository>,
        transactions: Arc<dyn TransactionRepository>,
        unit_of_work: Arc<dyn UnitOfWork>,
    ) -> Self {
        Self {
            users,
            profiles,
            accounts,
            transactions,
            unit_of_work,
            accrual_workers: DEFAULT_ACCRUAL_WORKERS,
        }
    }

    /// Build the service over a single store implementing every contract.
    pub fn from_store<S>(store: S) -> Self
    where
        S: UserRepository
            + ProfileRepository
            + AccountRepository
            + TransactionRepository
            + UnitOfWork
            + 'static,
    {
        let store = Arc::new(store);
        Self::new(
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            store,
        )
    }

    /// Set how many accounts the accrual job processes at once (at least one).
    pub fn with_accrual_workers(mut self, workers: usize) -> Self {
        self.accrual_workers = workers.max(1);
        self
    }

    /// Fails with `UserNotFound` or `ProfileIncomplete`.
    async fn ensure_can_open_accounts(&self, user_id: Uuid) -> Result<(), AppError> {
        self.users.get_by_id(user_id).await?;
        self.profiles.get_by_user_id(user_id).await?;
        Ok(())
    }

    async fn ensure_savings_capacity(&self, user_id: Uuid) -> Result<(), AppError> {
        let count = self.accounts.count_savings_accounts(user_id).await?;
        if !account_policy::can_create_savings(count) {
            return Err(AppError::LimitSavingsAccount);
        }
        Ok(())
    }

    async fn persist(&self, account: Account) -> Result<Account, AppError> {
        let account = self.accounts.create(account).await?;
        info!(
            account_id = %account.id,
            user_id = %account.user_id,
            account_type = %account.account_type(),
            account_number = %account.account_number,
            "account created"
        );
        Ok(account)
    }

    pub async fn create_payment_account(&self, user_id: Uuid) -> Result<Account, AppError> {
        self.ensure_can_open_accounts(user_id).await?;

        let existing = usize::from(self.accounts.get_payment_account(user_id).await?.is_some());
        if !account_policy::can_create_payment(existing) {
            return Err(AppError::LimitPaymentAccount);
        }

        self.persist(Account::new_payment(user_id)).await
    }

    /// The term is checked against the rate card before any repository call.
    pub async fn create_fixed_savings_account(
        &self,
        user_id: Uuid,
        term_months: u32,
    ) -> Result<Account, AppError> {
        let term = account_policy::fixed_term(term_months)?;

        self.ensure_can_open_accounts(user_id).await?;
        self.ensure_savings_capacity(user_id).await?;

        self.persist(Account::new_fixed_savings(user_id, term)).await
    }

    pub async fn create_flexible_savings_account(
        &self,
        user_id: Uuid,
    ) -> Result<Account, AppError> {
        self.ensure_can_open_accounts(user_id).await?;
        self.ensure_savings_capacity(user_id).await?;

        self.persist(Account::new_flexible_savings(user_id)).await
    }

    /// All accounts of an existing user, newest first.
    pub async fn list_accounts(&self, user_id: Uuid) -> Result<Vec<Account>, AppError> {
        self.users.get_by_id(user_id).await?;
        self.accounts.list_by_user(user_id).await
    }

    /// Ledger entries of an existing account, newest first.
    pub async fn list_transactions(&self, account_id: Uuid) -> Result<Vec<Transaction>, AppError> {
        self.accounts.get_by_id(account_id).await?;
        self.transactions.list_by_account(account_id).await
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::{
        models::{
            account::AccountType,
            user::{Gender, Profile, Team, User},
        },
        repository::memory::MemoryStore,
    };
    use chrono::Utc;
    use rust_decimal_macros::dec;

    pub(crate) async fn seed_user(store: &MemoryStore, with_profile: bool) -> Uuid {
        let user_id = Uuid::now_v7();
        store
            .insert_user(User {
                id: user_id,
                username: format!("user-{user_id}"),
                email: format!("{user_id}@example.com"),
                created_at: Utc::now(),
            })
            .await;
        if with_profile {
            store
                .insert_profile(Profile {
                    user_id,
                    display_name: "Nguyen Van A".to_string(),
                    avatar_url: None,
                    phone_number: "0900000000".to_string(),
                    national_id: user_id.simple().to_string(),
                    birth_year: 1990,
                    gender: Gender::Male,
                    team: Team::Others,
                    created_at: Utc::now(),
                    updated_at: Utc::now(),
                })
                .await;
        }
        user_id
    }

    fn service(store: &MemoryStore) -> AccountService {
        AccountService::from_store(store.clone())
    }

    #[tokio::test]
    async fn creates_payment_account() {
        let store = MemoryStore::new();
        let user_id = seed_user(&store, true).await;

        let account = service(&store).create_payment_account(user_id).await.unwrap();

        assert_eq!(account.user_id, user_id);
        assert_eq!(account.account_type(), AccountType::Payment);
        assert!(account.account_number.starts_with("PAY"));
        assert!(store.account(account.id).await.is_some());
    }

    #[tokio::test]
    async fn second_payment_account_hits_limit() {
        let store = MemoryStore::new();
        let user_id = seed_user(&store, true).await;
        let service = service(&store);

        service.create_payment_account(user_id).await.unwrap();
        let second = service.create_payment_account(user_id).await;

        assert!(matches!(second, Err(AppError::LimitPaymentAccount)));
    }

    #[tokio::test]
    async fn unknown_user_is_not_found() {
        let store = MemoryStore::new();

        let result = service(&store).create_payment_account(Uuid::now_v7()).await;

        assert!(matches!(result, Err(AppError::UserNotFound)));
    }

    #[tokio::test]
    async fn incomplete_profile_blocks_every_product_without_writes() {
        let store = MemoryStore::new();
        let user_id = seed_user(&store, false).await;
        let service = service(&store);

        assert!(matches!(
            service.create_payment_account(user_id).await,
            Err(AppError::ProfileIncomplete)
        ));
        assert!(matches!(
            service.create_flexible_savings_account(user_id).await,
            Err(AppError::ProfileIncomplete)
        ));
        assert!(matches!(
            service.create_fixed_savings_account(user_id, 6).await,
            Err(AppError::ProfileIncomplete)
        ));
        assert!(store.list_by_user(user_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn fixed_savings_locks_rate_for_term() {
        let store = MemoryStore::new();
        let user_id = seed_user(&store, true).await;

        let account = service(&store)
            .create_fixed_savings_account(user_id, 3)
            .await
            .unwrap();

        assert_eq!(account.interest_rate(), Some(dec!(1.8)));
        assert_eq!(account.fixed_term_months(), Some(3));

        let persisted = store.account(account.id).await.unwrap();
        assert_eq!(persisted.interest_rate(), Some(dec!(1.8)));
        assert_eq!(persisted.fixed_term_months(), Some(3));
    }

    #[tokio::test]
    async fn invalid_term_is_rejected_before_lookup() {
        let store = MemoryStore::new();

        // No user seeded: the term check must fail first
        let result = service(&store)
            .create_fixed_savings_account(Uuid::now_v7(), 2)
            .await;

        assert!(matches!(result, Err(AppError::InvalidTermMonths(2))));
    }

    #[tokio::test]
    async fn sixth_savings_account_hits_limit() {
        let store = MemoryStore::new();
        let user_id = seed_user(&store, true).await;
        let service = service(&store);

        for i in 0..5 {
            let created = if i % 2 == 0 {
                service.create_flexible_savings_account(user_id).await
            } else {
                service.create_fixed_savings_account(user_id, 12).await
            };
            assert!(created.is_ok(), "account {i} should be created");
        }

        assert!(matches!(
            service.create_flexible_savings_account(user_id).await,
            Err(AppError::LimitSavingsAccount)
        ));
        assert!(matches!(
            service.create_fixed_savings_account(user_id, 1).await,
            Err(AppError::LimitSavingsAccount)
        ));
        assert_eq!(store.count_savings_accounts(user_id).await.unwrap(), 5);
    }

    #[tokio::test]
    async fn payment_account_does_not_count_toward_savings() {
        let store = MemoryStore::new();
        let user_id = seed_user(&store, true).await;
        let service = service(&store);

        service.create_payment_account(user_id).await.unwrap();
        for _ in 0..5 {
            service.create_flexible_savings_account(user_id).await.unwrap();
        }

        assert_eq!(service.list_accounts(user_id).await.unwrap().len(), 6);
    }

    #[tokio::test]
    async fn list_accounts_requires_existing_user() {
        let store = MemoryStore::new();

        let result = service(&store).list_accounts(Uuid::now_v7()).await;

        assert!(matches!(result, Err(AppError::UserNotFound)));
    }

    #[tokio::test]
    async fn list_transactions_requires_existing_account() {
        let store = MemoryStore::new();

        let result = service(&store).list_transactions(Uuid::now_v7()).await;

        assert!(matches!(result, Err(AppError::AccountNotFound)));
    }
}
