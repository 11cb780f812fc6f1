//! Ledger transaction model.
//!
//! Transactions are append-only: once written they are never updated or deleted.
//! `balance_after` is a snapshot of the account balance right after the entry
//! was applied, not a value recomputed on read.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

/// Kind of balance-affecting event.
///
/// Only `Interest` is produced today; the other kinds are reserved for
/// deposit, withdraw and transfer flows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Interest,
    Deposit,
    Withdraw,
    Transfer,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Interest => "interest",
            TransactionType::Deposit => "deposit",
            TransactionType::Withdraw => "withdraw",
            TransactionType::Transfer => "transfer",
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "interest" => Ok(TransactionType::Interest),
            "deposit" => Ok(TransactionType::Deposit),
            "withdraw" => Ok(TransactionType::Withdraw),
            "transfer" => Ok(TransactionType::Transfer),
            other => Err(format!("unknown transaction type: {other}")),
        }
    }
}

/// Outcome recorded on a ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Success,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Success => "success",
        }
    }
}

impl FromStr for TransactionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "success" => Ok(TransactionStatus::Success),
            other => Err(format!("unknown transaction status: {other}")),
        }
    }
}

/// A ledger entry.
///
/// # JSON Example
///
/// ```json
/// {
///   "id": "0190a5c8-...",
///   "account_id": "0190a5c7-...",
///   "transaction_type": "interest",
///   "amount": "109.5890",
///   "status": "success",
///   "balance_after": "5000109.5890",
///   "related_account_id": null,
///   "created_at": "2025-10-20T00:05:00Z"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transaction {
    pub id: Uuid,
    pub account_id: Uuid,
    pub transaction_type: TransactionType,
    pub amount: Decimal,
    pub status: TransactionStatus,
    pub balance_after: Decimal,

    /// Counterparty for transfers. Always `None` for interest.
    pub related_account_id: Option<Uuid>,

    pub created_at: DateTime<Utc>,
}

impl Transaction {
    /// Ledger entry for a daily interest credit.
    pub fn interest(account_id: Uuid, amount: Decimal, balance_after: Decimal) -> Self {
        Self {
            id: Uuid::now_v7(),
            account_id,
            transaction_type: TransactionType::Interest,
            amount,
            status: TransactionStatus::Success,
            balance_after,
            related_account_id: None,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn interest_entry_snapshots_balance() {
        let account_id = Uuid::new_v4();
        let tx = Transaction::interest(account_id, dec!(41.0959), dec!(5000041.0959));

        assert_eq!(tx.account_id, account_id);
        assert_eq!(tx.transaction_type, TransactionType::Interest);
        assert_eq!(tx.status, TransactionStatus::Success);
        assert_eq!(tx.amount, dec!(41.0959));
        assert_eq!(tx.balance_after, dec!(5000041.0959));
        assert_eq!(tx.related_account_id, None);
    }

    #[test]
    fn type_names_match_stored_values() {
        for kind in [
            TransactionType::Interest,
            TransactionType::Deposit,
            TransactionType::Withdraw,
            TransactionType::Transfer,
        ] {
            assert_eq!(kind.as_str().parse::<TransactionType>().unwrap(), kind);
            assert_eq!(
                serde_json::to_value(kind).unwrap(),
                serde_json::Value::String(kind.to_string())
            );
        }
        assert_eq!(
            "success".parse::<TransactionStatus>().unwrap(),
            TransactionStatus::Success
        );
    }
}
