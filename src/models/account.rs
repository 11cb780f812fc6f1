//! Account entity, product variants and the API request/response types.
//!
//! This module defines:
//! - `Account`: a payment, fixed-term savings or flexible savings account
//! - Factory functions that open each product with correct defaults
//! - `AccountResponse`: Response body returned to clients

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Months, NaiveDate, Utc};
use rand::Rng;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Product family of an account. Immutable after creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccountType {
    #[serde(rename = "payment")]
    Payment,
    #[serde(rename = "savings_fixed")]
    FixedSavings,
    #[serde(rename = "savings_flexible")]
    FlexibleSavings,
}

impl AccountType {
    /// Value stored in the `account_type` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountType::Payment => "payment",
            AccountType::FixedSavings => "savings_fixed",
            AccountType::FlexibleSavings => "savings_flexible",
        }
    }

    /// Fixed and flexible savings share the per-user savings limit.
    pub fn is_savings(&self) -> bool {
        matches!(self, AccountType::FixedSavings | AccountType::FlexibleSavings)
    }

    /// Prefix of the externally visible account number.
    pub fn number_prefix(&self) -> &'static str {
        if self.is_savings() { "SAV" } else { "PAY" }
    }
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccountType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "payment" => Ok(AccountType::Payment),
            "savings_fixed" => Ok(AccountType::FixedSavings),
            "savings_flexible" => Ok(AccountType::FlexibleSavings),
            other => Err(format!("unknown account type: {other}")),
        }
    }
}

/// Rate and term locked in when a fixed savings account is opened.
///
/// `annual_rate` is a percentage: `1.8` means 1.8% per year.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedTerm {
    pub months: u32,
    pub annual_rate: Decimal,
}

/// The product an account was opened as.
///
/// Only fixed savings carry a stored rate and term, so the
/// "rate and term are both set, and only for fixed savings" rule
/// cannot be broken by construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountProduct {
    Payment,
    FixedSavings(FixedTerm),
    /// Rate is derived per accrual from balance and age, never stored.
    FlexibleSavings,
}

impl AccountProduct {
    pub fn account_type(&self) -> AccountType {
        match self {
            AccountProduct::Payment => AccountType::Payment,
            AccountProduct::FixedSavings(_) => AccountType::FixedSavings,
            AccountProduct::FlexibleSavings => AccountType::FlexibleSavings,
        }
    }
}

/// A user-owned account.
///
/// `balance` never goes negative; in current scope it only changes through
/// interest accrual.
#[derive(Debug, Clone, PartialEq)]
pub struct Account {
    pub id: Uuid,
    pub user_id: Uuid,
    pub product: AccountProduct,
    pub account_number: String,
    pub balance: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    fn open(user_id: Uuid, product: AccountProduct) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            user_id,
            account_number: generate_account_number(product.account_type()),
            product,
            balance: Decimal::ZERO,
            created_at: now,
            updated_at: now,
        }
    }

    /// Open a zero-interest payment account.
    pub fn new_payment(user_id: Uuid) -> Self {
        Self::open(user_id, AccountProduct::Payment)
    }

    /// Open a flexible savings account. Its rate is tiered and computed at accrual time.
    pub fn new_flexible_savings(user_id: Uuid) -> Self {
        Self::open(user_id, AccountProduct::FlexibleSavings)
    }

    /// Open a fixed savings account with the rate and term fixed for its lifetime.
    pub fn new_fixed_savings(user_id: Uuid, term: FixedTerm) -> Self {
        Self::open(user_id, AccountProduct::FixedSavings(term))
    }

    pub fn account_type(&self) -> AccountType {
        self.product.account_type()
    }

    pub fn interest_rate(&self) -> Option<Decimal> {
        match self.product {
            AccountProduct::FixedSavings(term) => Some(term.annual_rate),
            _ => None,
        }
    }

    pub fn fixed_term_months(&self) -> Option<u32> {
        match self.product {
            AccountProduct::FixedSavings(term) => Some(term.months),
            _ => None,
        }
    }

    /// Day on which a fixed savings account reaches the end of its term.
    pub fn maturity_date(&self) -> Option<NaiveDate> {
        let months = self.fixed_term_months()?;
        self.created_at
            .date_naive()
            .checked_add_months(Months::new(months))
    }

    /// Whole days elapsed between opening and `now`.
    pub fn age_days(&self, now: DateTime<Utc>) -> i64 {
        (now - self.created_at).num_days()
    }
}

/// Generate an account number: product prefix followed by 10 random digits.
///
/// Uniqueness is enforced by the `accounts.account_number` unique constraint,
/// not by the generator.
pub fn generate_account_number(account_type: AccountType) -> String {
    let digits: u64 = rand::rng().random_range(0..10_000_000_000);
    format!("{}{:010}", account_type.number_prefix(), digits)
}

/// Request body for opening a fixed savings account.
///
/// ```json
/// { "term_months": 6 }
/// ```
#[derive(Debug, Deserialize)]
pub struct CreateFixedSavingsRequest {
    pub term_months: u32,
}

/// Response body for account endpoints.
///
/// ```json
/// {
///   "id": "0190a5c8-...",
///   "user_id": "0190a5c7-...",
///   "account_type": "savings_fixed",
///   "account_number": "SAV0123456789",
///   "balance": "0",
///   "interest_rate": "1.8",
///   "fixed_term_months": 3,
///   "maturity_date": "2026-01-19",
///   "created_at": "2025-10-19T10:00:00Z",
///   "updated_at": "2025-10-19T10:00:00Z"
/// }
/// ```
#[derive(Debug, Serialize, Deserialize)]
pub struct AccountResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub account_type: AccountType,
    pub account_number: String,
    pub balance: Decimal,
    pub interest_rate: Option<Decimal>,
    pub fixed_term_months: Option<u32>,
    pub maturity_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Account> for AccountResponse {
    fn from(account: Account) -> Self {
        Self {
            account_type: account.account_type(),
            interest_rate: account.interest_rate(),
            fixed_term_months: account.fixed_term_months(),
            maturity_date: account.maturity_date(),
            id: account.id,
            user_id: account.user_id,
            account_number: account.account_number,
            balance: account.balance,
            created_at: account.created_at,
            updated_at: account.updated_at,
        }
    }
}
