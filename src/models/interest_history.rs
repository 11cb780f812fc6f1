//! Interest history: one row per flexible savings account per accrual day.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

/// Interest credited to an account for a given day.
///
/// `(account_id, date)` is unique; a second accrual for the same day is a no-op.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InterestHistory {
    pub id: Uuid,
    pub account_id: Uuid,

    /// Day the interest is attributed to (the day before the job ran)
    pub date: NaiveDate,

    pub interest_amount: Decimal,
    pub created_at: DateTime<Utc>,
}

impl InterestHistory {
    pub fn new(account_id: Uuid, date: NaiveDate, interest_amount: Decimal) -> Self {
        Self {
            id: Uuid::now_v7(),
            account_id,
            date,
            interest_amount,
            created_at: Utc::now(),
        }
    }
}
