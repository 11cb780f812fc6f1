//! Domain entities and API request/response types.

/// Account entity, product variants and factories
pub mod account;
/// Daily interest history
pub mod interest_history;
/// Append-only ledger entries
pub mod transaction;
/// Users and profiles
pub mod user;
