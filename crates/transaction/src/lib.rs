#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Transactional execution of operation plans
//!
//! A [`Transaction`] holds the instantiated operations of a plan. The
//! [`TransactionExecutor`] runs them strictly in order and, on the first
//! failure or an observed cancellation, undoes every performed step in
//! reverse before reporting `Failure` or `Canceled`.

mod executor;
mod transaction;

pub use executor::{TransactionExecutor, TransactionOutcome, TransactionPolicy};
pub use transaction::{Step, Transaction, TransactionStatus};
