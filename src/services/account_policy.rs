//! Account opening rules: per-user limits and the fixed-term rate card.
//!
//! Pure functions with no I/O; the account service consults them before
//! any write.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::{error::AppError, models::account::FixedTerm};

/// Payment accounts a user may hold.
pub const MAX_PAYMENT_ACCOUNTS: usize = 1;

/// Fixed plus flexible savings accounts a user may hold.
pub const MAX_SAVINGS_ACCOUNTS: usize = 5;

/// Offered fixed terms and their annual rates, in percent.
const FIXED_TERM_RATES: [(u32, Decimal); 5] = [
    (1, dec!(0.6)),
    (3, dec!(1.8)),
    (6, dec!(3.6)),
    (8, dec!(4.8)),
    (12, dec!(7.2)),
];

pub fn can_create_payment(existing_payment_accounts: usize) -> bool {
    existing_payment_accounts < MAX_PAYMENT_ACCOUNTS
}

pub fn can_create_savings(existing_savings_accounts: usize) -> bool {
    existing_savings_accounts < MAX_SAVINGS_ACCOUNTS
}

/// Annual rate (percent) for a fixed term.
///
/// # Errors
///
/// `InvalidTermMonths` for any term not on the rate card.
pub fn interest_rate_for_term(term_months: u32) -> Result<Decimal, AppError> {
    FIXED_TERM_RATES
        .iter()
        .find(|(months, _)| *months == term_months)
        .map(|(_, rate)| *rate)
        .ok_or(AppError::InvalidTermMonths(term_months))
}

/// Resolve a requested term into the locked-in `FixedTerm`.
pub fn fixed_term(term_months: u32) -> Result<FixedTerm, AppError> {
    Ok(FixedTerm {
        months: term_months,
        annual_rate: interest_rate_for_term(term_months)?,
    })
}
