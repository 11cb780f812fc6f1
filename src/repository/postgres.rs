//! PostgreSQL implementation of the repository contracts.
//!
//! Rows are read into flat `*Row` structs and converted into domain types,
//! rejecting rows that break the account product invariants.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::Postgres;
use uuid::Uuid;

use super::{
    AccountRepository, AccrualUnit, ProfileRepository, TransactionRepository, UnitOfWork,
    UserRepository,
};
use crate::{
    db::DbPool,
    error::AppError,
    models::{
        account::{Account, AccountProduct, AccountType, FixedTerm},
        interest_history::InterestHistory,
        transaction::Transaction,
        user::{Profile, User},
    },
};

/// Partial unique index allowing one payment account per user.
const PAYMENT_UNIQUE_INDEX: &str = "uq_accounts_one_payment_per_user";

const NATIONAL_ID_UNIQUE: &str = "uq_profiles_national_id";

const PROFILE_COLUMNS: &str = "user_id, display_name, avatar_url, phone_number, national_id, \
     birth_year, gender, team, created_at, updated_at";

const ACCOUNT_COLUMNS: &str = "id, user_id, account_type, account_number, balance, \
     interest_rate, fixed_term_months, created_at, updated_at";

const TRANSACTION_COLUMNS: &str = "id, account_id, transaction_type, amount, status, \
     balance_after, related_account_id, created_at";

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    username: String,
    email: String,
    created_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            username: row.username,
            email: row.email,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ProfileRow {
    user_id: Uuid,
    display_name: String,
    avatar_url: Option<String>,
    phone_number: String,
    national_id: String,
    birth_year: i32,
    gender: String,
    team: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ProfileRow> for Profile {
    type Error = sqlx::Error;

    fn try_from(row: ProfileRow) -> Result<Self, Self::Error> {
        Ok(Self {
            user_id: row.user_id,
            display_name: row.display_name,
            avatar_url: row.avatar_url,
            phone_number: row.phone_number,
            national_id: row.national_id,
            birth_year: row.birth_year,
            gender: row.gender.parse().map_err(decode_error)?,
            team: row.team.parse().map_err(decode_error)?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct AccountRow {
    id: Uuid,
    user_id: Uuid,
    account_type: String,
    account_number: String,
    balance: Decimal,
    interest_rate: Option<Decimal>,
    fixed_term_months: Option<i32>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<AccountRow> for Account {
    type Error = sqlx::Error;

    fn try_from(row: AccountRow) -> Result<Self, Self::Error> {
        let account_type: AccountType = row.account_type.parse().map_err(decode_error)?;

        let product = match (account_type, row.interest_rate, row.fixed_term_months) {
            (AccountType::Payment, None, None) => AccountProduct::Payment,
            (AccountType::FlexibleSavings, None, None) => AccountProduct::FlexibleSavings,
            (AccountType::FixedSavings, Some(annual_rate), Some(months)) => {
                let months = u32::try_from(months)
                    .map_err(|_| decode_error(format!("negative fixed term: {months}")))?;
                AccountProduct::FixedSavings(FixedTerm {
                    months,
                    annual_rate,
                })
            }
            _ => {
                return Err(decode_error(format!(
                    "account {} has rate/term inconsistent with type {}",
                    row.id, account_type
                )));
            }
        };

        Ok(Self {
            id: row.id,
            user_id: row.user_id,
            product,
            account_number: row.account_number,
            balance: row.balance,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct TransactionRow {
    id: Uuid,
    account_id: Uuid,
    transaction_type: String,
    amount: Decimal,
    status: String,
    balance_after: Decimal,
    related_account_id: Option<Uuid>,
    created_at: DateTime<Utc>,
}

impl TryFrom<TransactionRow> for Transaction {
    type Error = sqlx::Error;

    fn try_from(row: TransactionRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            account_id: row.account_id,
            transaction_type: row.transaction_type.parse().map_err(decode_error)?,
            amount: row.amount,
            status: row.status.parse().map_err(decode_error)?,
            balance_after: row.balance_after,
            related_account_id: row.related_account_id,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct InterestHistoryRow {
    id: Uuid,
    account_id: Uuid,
    accrual_date: NaiveDate,
    interest_amount: Decimal,
    created_at: DateTime<Utc>,
}

impl From<InterestHistoryRow> for InterestHistory {
    fn from(row: InterestHistoryRow) -> Self {
        Self {
            id: row.id,
            account_id: row.account_id,
            date: row.accrual_date,
            interest_amount: row.interest_amount,
            created_at: row.created_at,
        }
    }
}

fn decode_error(message: String) -> sqlx::Error {
    sqlx::Error::Decode(message.into())
}

fn violates(err: &sqlx::Error, constraint: &str) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.constraint() == Some(constraint))
}

fn into_accounts(rows: Vec<AccountRow>) -> Result<Vec<Account>, AppError> {
    rows.into_iter()
        .map(|row| Account::try_from(row).map_err(AppError::from))
        .collect()
}

/// All repository contracts over one connection pool.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

#[async_trait]
impl UserRepository for PgStore {
    async fn get_by_id(&self, user_id: Uuid) -> Result<User, AppError> {
        sqlx::query_as::<_, UserRow>(
            "SELECT id, username, email, created_at FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?
        .map(User::from)
        .ok_or(AppError::UserNotFound)
    }
}

#[async_trait]
impl ProfileRepository for PgStore {
    async fn get_by_user_id(&self, user_id: Uuid) -> Result<Profile, AppError> {
        let row = sqlx::query_as::<_, ProfileRow>(&format!(
            "SELECT {PROFILE_COLUMNS} FROM profiles WHERE user_id = $1"
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(AppError::ProfileIncomplete)?;

        Ok(Profile::try_from(row)?)
    }

    async fn national_id_taken(
        &self,
        national_id: &str,
        exclude_user_id: Uuid,
    ) -> Result<bool, AppError> {
        let taken: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM profiles WHERE national_id = $1 AND user_id <> $2)",
        )
        .bind(national_id)
        .bind(exclude_user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(taken)
    }

    async fn upsert(&self, profile: Profile) -> Result<Profile, AppError> {
        let row = sqlx::query_as::<_, ProfileRow>(&format!(
            r#"
            INSERT INTO profiles (
                user_id, display_name, avatar_url, phone_number, national_id,
                birth_year, gender, team, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (user_id) DO UPDATE
            SET display_name = EXCLUDED.display_name,
                avatar_url = EXCLUDED.avatar_url,
                phone_number = EXCLUDED.phone_number,
                national_id = EXCLUDED.national_id,
                birth_year = EXCLUDED.birth_year,
                gender = EXCLUDED.gender,
                team = EXCLUDED.team,
                updated_at = EXCLUDED.updated_at
            RETURNING {PROFILE_COLUMNS}
            "#
        ))
        .bind(profile.user_id)
        .bind(&profile.display_name)
        .bind(&profile.avatar_url)
        .bind(&profile.phone_number)
        .bind(&profile.national_id)
        .bind(profile.birth_year)
        .bind(profile.gender.as_str())
        .bind(profile.team.as_str())
        .bind(profile.created_at)
        .bind(profile.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|err| {
            if violates(&err, NATIONAL_ID_UNIQUE) {
                AppError::NationalIdTaken
            } else {
                AppError::Repository(err)
            }
        })?;

        Ok(Profile::try_from(row)?)
    }
}

#[async_trait]
impl AccountRepository for PgStore {
    async fn create(&self, account: Account) -> Result<Account, AppError> {
        let row = sqlx::query_as::<_, AccountRow>(&format!(
            r#"
            INSERT INTO accounts (
                id, user_id, account_type, account_number, balance,
                interest_rate, fixed_term_months, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {ACCOUNT_COLUMNS}
            "#
        ))
        .bind(account.id)
        .bind(account.user_id)
        .bind(account.account_type().as_str())
        .bind(&account.account_number)
        .bind(account.balance)
        .bind(account.interest_rate())
        .bind(account.fixed_term_months().map(|months| months as i32))
        .bind(account.created_at)
        .bind(account.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|err| {
            if violates(&err, PAYMENT_UNIQUE_INDEX) {
                AppError::LimitPaymentAccount
            } else {
                AppError::Repository(err)
            }
        })?;

        Ok(Account::try_from(row)?)
    }

    async fn get_by_id(&self, account_id: Uuid) -> Result<Account, AppError> {
        let row = sqlx::query_as::<_, AccountRow>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = $1"
        ))
        .bind(account_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(AppError::AccountNotFound)?;

        Ok(Account::try_from(row)?)
    }

    async fn get_payment_account(&self, user_id: Uuid) -> Result<Option<Account>, AppError> {
        let row = sqlx::query_as::<_, AccountRow>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE user_id = $1 AND account_type = $2"
        ))
        .bind(user_id)
        .bind(AccountType::Payment.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Account::try_from).transpose()?)
    }

    async fn count_savings_accounts(&self, user_id: Uuid) -> Result<usize, AppError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM accounts WHERE user_id = $1 AND account_type IN ($2, $3)",
        )
        .bind(user_id)
        .bind(AccountType::FixedSavings.as_str())
        .bind(AccountType::FlexibleSavings.as_str())
        .fetch_one(&self.pool)
        .await?;

        Ok(count as usize)
    }

    async fn get_flexible_savings_accounts(&self) -> Result<Vec<Account>, AppError> {
        let rows = sqlx::query_as::<_, AccountRow>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE account_type = $1 ORDER BY id"
        ))
        .bind(AccountType::FlexibleSavings.as_str())
        .fetch_all(&self.pool)
        .await?;

        into_accounts(rows)
    }

    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<Account>, AppError> {
        let rows = sqlx::query_as::<_, AccountRow>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE user_id = $1 ORDER BY created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        into_accounts(rows)
    }
}

#[async_trait]
impl TransactionRepository for PgStore {
    async fn list_by_account(&self, account_id: Uuid) -> Result<Vec<Transaction>, AppError> {
        let rows = sqlx::query_as::<_, TransactionRow>(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE account_id = $1 ORDER BY created_at DESC"
        ))
        .bind(account_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| Transaction::try_from(row).map_err(AppError::from))
            .collect()
    }
}

#[async_trait]
impl UnitOfWork for PgStore {
    async fn begin(&self) -> Result<Box<dyn AccrualUnit>, AppError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgAccrualUnit { tx }))
    }
}

/// One database transaction. Rolled back on drop unless committed.
struct PgAccrualUnit {
    tx: sqlx::Transaction<'static, Postgres>,
}

#[async_trait]
impl AccrualUnit for PgAccrualUnit {
    async fn lock_account(&mut self, account_id: Uuid) -> Result<Account, AppError> {
        let row = sqlx::query_as::<_, AccountRow>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = $1 FOR UPDATE"
        ))
        .bind(account_id)
        .fetch_optional(&mut *self.tx)
        .await?
        .ok_or(AppError::AccountNotFound)?;

        Ok(Account::try_from(row)?)
    }

    async fn interest_recorded(
        &mut self,
        account_id: Uuid,
        date: NaiveDate,
    ) -> Result<bool, AppError> {
        let recorded: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM interest_history WHERE account_id = $1 AND accrual_date = $2)",
        )
        .bind(account_id)
        .bind(date)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(recorded)
    }

    async fn update_balance(
        &mut self,
        account_id: Uuid,
        new_balance: Decimal,
    ) -> Result<(), AppError> {
        let updated = sqlx::query(
            r#"
            UPDATE accounts
            SET balance = $1,
                updated_at = NOW()
            WHERE id = $2
            "#,
        )
        .bind(new_balance)
        .bind(account_id)
        .execute(&mut *self.tx)
        .await?
        .rows_affected();

        if updated == 0 {
            return Err(AppError::AccountNotFound);
        }
        Ok(())
    }

    async fn create_transaction(
        &mut self,
        transaction: Transaction,
    ) -> Result<Transaction, AppError> {
        let row = sqlx::query_as::<_, TransactionRow>(&format!(
            r#"
            INSERT INTO transactions (
                id, account_id, transaction_type, amount, status,
                balance_after, related_account_id, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {TRANSACTION_COLUMNS}
            "#
        ))
        .bind(transaction.id)
        .bind(transaction.account_id)
        .bind(transaction.transaction_type.as_str())
        .bind(transaction.amount)
        .bind(transaction.status.as_str())
        .bind(transaction.balance_after)
        .bind(transaction.related_account_id)
        .bind(transaction.created_at)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(Transaction::try_from(row)?)
    }

    async fn create_interest_history(
        &mut self,
        history: InterestHistory,
    ) -> Result<InterestHistory, AppError> {
        let row = sqlx::query_as::<_, InterestHistoryRow>(
            r#"
            INSERT INTO interest_history (id, account_id, accrual_date, interest_amount, created_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, account_id, accrual_date, interest_amount, created_at
            "#,
        )
        .bind(history.id)
        .bind(history.account_id)
        .bind(history.date)
        .bind(history.interest_amount)
        .bind(history.created_at)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(row.into())
    }

    async fn commit(self: Box<Self>) -> Result<(), AppError> {
        let unit = *self;
        unit.tx.commit().await?;
        Ok(())
    }
}
