//! Business logic services.
//!
//! Services contain the account rules and orchestration, separated from HTTP
//! handlers and from the persistence adapters behind the repository traits.

pub mod account_policy;
pub mod account_service;
pub mod accrual_job;
pub mod interest_calculator;
pub mod profile_service;
