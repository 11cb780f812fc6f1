//! In-memory implementation of the repository contracts.
//!
//! Enforces the same storage-level rules as the Postgres schema: unique
//! account numbers, one payment account per user, unique national IDs and
//! one interest history row per `(account_id, date)`. Accrual units hold a
//! per-account lock from `lock_account` until they commit or are dropped,
//! buffer their writes and apply them under a single state lock on commit.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use super::{
    AccountRepository, AccrualUnit, ProfileRepository, TransactionRepository, UnitOfWork,
    UserRepository,
};
use crate::{
    error::AppError,
    models::{
        account::{Account, AccountType},
        interest_history::InterestHistory,
        transaction::Transaction,
        user::{Profile, User},
    },
};

#[derive(Debug, Default)]
struct MemoryState {
    users: HashMap<Uuid, User>,
    profiles: HashMap<Uuid, Profile>,
    accounts: BTreeMap<Uuid, Account>,
    transactions: Vec<Transaction>,
    interest_history: Vec<InterestHistory>,
    account_locks: HashMap<Uuid, Arc<Mutex<()>>>,
    failing_accounts: HashSet<Uuid>,
    account_listing_fails: bool,
}

impl MemoryState {
    fn interest_recorded(&self, account_id: Uuid, date: NaiveDate) -> bool {
        self.interest_history
            .iter()
            .any(|h| h.account_id == account_id && h.date == date)
    }
}

fn storage_error(message: String) -> AppError {
    AppError::Repository(sqlx::Error::Protocol(message))
}

/// Shared in-process store. Clones see the same data.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_user(&self, user: User) {
        self.state.lock().await.users.insert(user.id, user);
    }

    pub async fn insert_profile(&self, profile: Profile) {
        self.state
            .lock()
            .await
            .profiles
            .insert(profile.user_id, profile);
    }

    /// Seed an account as-is, bypassing creation rules.
    pub async fn insert_account(&self, account: Account) {
        self.state.lock().await.accounts.insert(account.id, account);
    }

    pub async fn account(&self, account_id: Uuid) -> Option<Account> {
        self.state.lock().await.accounts.get(&account_id).cloned()
    }

    pub async fn transactions_for(&self, account_id: Uuid) -> Vec<Transaction> {
        self.state
            .lock()
            .await
            .transactions
            .iter()
            .filter(|t| t.account_id == account_id)
            .cloned()
            .collect()
    }

    pub async fn interest_history_for(&self, account_id: Uuid) -> Vec<InterestHistory> {
        self.state
            .lock()
            .await
            .interest_history
            .iter()
            .filter(|h| h.account_id == account_id)
            .cloned()
            .collect()
    }

    /// Make the interest history insert fail for this account.
    #[cfg(test)]
    pub(crate) async fn fail_accrual_for(&self, account_id: Uuid) {
        self.state.lock().await.failing_accounts.insert(account_id);
    }

    /// Make `get_flexible_savings_accounts` fail.
    #[cfg(test)]
    pub(crate) async fn fail_account_listing(&self) {
        self.state.lock().await.account_listing_fails = true;
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn get_by_id(&self, user_id: Uuid) -> Result<User, AppError> {
        self.state
            .lock()
            .await
            .users
            .get(&user_id)
            .cloned()
            .ok_or(AppError::UserNotFound)
    }
}

#[async_trait]
impl ProfileRepository for MemoryStore {
    async fn get_by_user_id(&self, user_id: Uuid) -> Result<Profile, AppError> {
        self.state
            .lock()
            .await
            .profiles
            .get(&user_id)
            .cloned()
            .ok_or(AppError::ProfileIncomplete)
    }

    async fn national_id_taken(
        &self,
        national_id: &str,
        exclude_user_id: Uuid,
    ) -> Result<bool, AppError> {
        Ok(self
            .state
            .lock()
            .await
            .profiles
            .values()
            .any(|p| p.national_id == national_id && p.user_id != exclude_user_id))
    }

    async fn upsert(&self, mut profile: Profile) -> Result<Profile, AppError> {
        let mut state = self.state.lock().await;

        if state
            .profiles
            .values()
            .any(|p| p.national_id == profile.national_id && p.user_id != profile.user_id)
        {
            return Err(AppError::NationalIdTaken);
        }
        if let Some(existing) = state.profiles.get(&profile.user_id) {
            profile.created_at = existing.created_at;
        }

        state.profiles.insert(profile.user_id, profile.clone());
        Ok(profile)
    }
}

#[async_trait]
impl AccountRepository for MemoryStore {
    async fn create(&self, account: Account) -> Result<Account, AppError> {
        let mut state = self.state.lock().await;

        if state
            .accounts
            .values()
            .any(|a| a.account_number == account.account_number)
        {
            return Err(storage_error(format!(
                "duplicate account number {}",
                account.account_number
            )));
        }
        if account.account_type() == AccountType::Payment
            && state.accounts.values().any(|a| {
                a.user_id == account.user_id && a.account_type() == AccountType::Payment
            })
        {
            return Err(AppError::LimitPaymentAccount);
        }

        state.accounts.insert(account.id, account.clone());
        Ok(account)
    }

    async fn get_by_id(&self, account_id: Uuid) -> Result<Account, AppError> {
        self.account(account_id)
            .await
            .ok_or(AppError::AccountNotFound)
    }

    async fn get_payment_account(&self, user_id: Uuid) -> Result<Option<Account>, AppError> {
        Ok(self
            .state
            .lock()
            .await
            .accounts
            .values()
            .find(|a| a.user_id == user_id && a.account_type() == AccountType::Payment)
            .cloned())
    }

    async fn count_savings_accounts(&self, user_id: Uuid) -> Result<usize, AppError> {
        Ok(self
            .state
            .lock()
            .await
            .accounts
            .values()
            .filter(|a| a.user_id == user_id && a.account_type().is_savings())
            .count())
    }

    async fn get_flexible_savings_accounts(&self) -> Result<Vec<Account>, AppError> {
        let state = self.state.lock().await;
        if state.account_listing_fails {
            return Err(storage_error("account listing unavailable".to_string()));
        }

        Ok(state
            .accounts
            .values()
            .filter(|a| a.account_type() == AccountType::FlexibleSavings)
            .cloned()
            .collect())
    }

    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<Account>, AppError> {
        let mut accounts: Vec<Account> = self
            .state
            .lock()
            .await
            .accounts
            .values()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect();
        accounts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(accounts)
    }
}

#[async_trait]
impl TransactionRepository for MemoryStore {
    async fn list_by_account(&self, account_id: Uuid) -> Result<Vec<Transaction>, AppError> {
        let mut transactions = self.transactions_for(account_id).await;
        transactions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(transactions)
    }
}

#[async_trait]
impl UnitOfWork for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn AccrualUnit>, AppError> {
        Ok(Box::new(MemoryAccrualUnit {
            state: Arc::clone(&self.state),
            account_guards: Vec::new(),
            balances: Vec::new(),
            transactions: Vec::new(),
            interest_history: Vec::new(),
        }))
    }
}

struct MemoryAccrualUnit {
    state: Arc<Mutex<MemoryState>>,
    account_guards: Vec<OwnedMutexGuard<()>>,
    balances: Vec<(Uuid, Decimal)>,
    transactions: Vec<Transaction>,
    interest_history: Vec<InterestHistory>,
}

#[async_trait]
impl AccrualUnit for MemoryAccrualUnit {
    async fn lock_account(&mut self, account_id: Uuid) -> Result<Account, AppError> {
        let account_lock = {
            let mut state = self.state.lock().await;
            if !state.accounts.contains_key(&account_id) {
                return Err(AppError::AccountNotFound);
            }
            Arc::clone(state.account_locks.entry(account_id).or_default())
        };

        // Wait without holding the state lock so the current holder can commit
        self.account_guards.push(account_lock.lock_owned().await);

        self.state
            .lock()
            .await
            .accounts
            .get(&account_id)
            .cloned()
            .ok_or(AppError::AccountNotFound)
    }

    async fn interest_recorded(
        &mut self,
        account_id: Uuid,
        date: NaiveDate,
    ) -> Result<bool, AppError> {
        Ok(self.state.lock().await.interest_recorded(account_id, date))
    }

    async fn update_balance(
        &mut self,
        account_id: Uuid,
        new_balance: Decimal,
    ) -> Result<(), AppError> {
        if !self.state.lock().await.accounts.contains_key(&account_id) {
            return Err(AppError::AccountNotFound);
        }
        self.balances.push((account_id, new_balance));
        Ok(())
    }

    async fn create_transaction(
        &mut self,
        transaction: Transaction,
    ) -> Result<Transaction, AppError> {
        self.transactions.push(transaction.clone());
        Ok(transaction)
    }

    async fn create_interest_history(
        &mut self,
        history: InterestHistory,
    ) -> Result<InterestHistory, AppError> {
        if self
            .state
            .lock()
            .await
            .failing_accounts
            .contains(&history.account_id)
        {
            return Err(storage_error(format!(
                "interest history insert failed for {}",
                history.account_id
            )));
        }
        self.interest_history.push(history.clone());
        Ok(history)
    }

    async fn commit(self: Box<Self>) -> Result<(), AppError> {
        let unit = *self;
        let mut state = unit.state.lock().await;

        for history in &unit.interest_history {
            if state.interest_recorded(history.account_id, history.date) {
                return Err(storage_error(format!(
                    "duplicate interest history for {} on {}",
                    history.account_id, history.date
                )));
            }
        }

        for (account_id, balance) in unit.balances {
            if let Some(account) = state.accounts.get_mut(&account_id) {
                account.balance = balance;
                account.updated_at = chrono::Utc::now();
            }
        }
        state.transactions.extend(unit.transactions);
        state.interest_history.extend(unit.interest_history);
        Ok(())
    }
}
