//! Tiered daily interest for flexible savings accounts.
//!
//! | account age | balance              | annual rate |
//! |-------------|----------------------|-------------|
//! | < 30 days   | any                  | 0.8%        |
//! | ≥ 30 days   | < 10,000,000         | 0.3%        |
//! | ≥ 30 days   | 10,000,000–49,999,999 | 0.4%        |
//! | ≥ 30 days   | ≥ 50,000,000         | 0.5%        |
//!
//! Daily interest is `balance * rate / 365`, rounded to the ledger scale.

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;

/// Days after opening during which the promotional rate applies.
pub const PROMOTIONAL_WINDOW_DAYS: i64 = 30;

/// Decimal places kept on balances and interest amounts.
pub const INTEREST_SCALE: u32 = 4;

const DAYS_PER_YEAR: Decimal = dec!(365);
const PROMOTIONAL_RATE: Decimal = dec!(0.8);

/// Standard tiers as (minimum balance, annual rate in percent), highest first.
const BALANCE_TIERS: [(Decimal, Decimal); 3] = [
    (dec!(50000000), dec!(0.5)),
    (dec!(10000000), dec!(0.4)),
    (Decimal::ZERO, dec!(0.3)),
];

/// Annual rate in percent for a flexible savings account.
pub fn flexible_annual_rate(balance: Decimal, age_days: i64) -> Decimal {
    if age_days < PROMOTIONAL_WINDOW_DAYS {
        return PROMOTIONAL_RATE;
    }

    BALANCE_TIERS
        .iter()
        .find(|(floor, _)| balance >= *floor)
        .map(|(_, rate)| *rate)
        .unwrap_or(Decimal::ZERO)
}

/// Interest earned for one day.
///
/// Non-positive balances earn nothing; the caller treats a zero result
/// as "nothing to record".
pub fn daily_interest(balance: Decimal, age_days: i64) -> Decimal {
    if balance <= Decimal::ZERO {
        return Decimal::ZERO;
    }

    let annual_fraction = flexible_annual_rate(balance, age_days) / dec!(100);
    (balance * annual_fraction / DAYS_PER_YEAR)
        .round_dp_with_strategy(INTEREST_SCALE, RoundingStrategy::MidpointNearestEven)
}
