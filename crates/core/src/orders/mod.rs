//! Order lifecycle management.
//!
//! This module implements the order status state machine, the mapping from
//! accrual oracle answers to ledger updates, and the ownership rules applied
//! when orders are uploaded or withdrawals are requested.
//!
//! # Modules
//!
//! - `status` - `OrderStatus`, `OracleStatus` and validated `StatusUpdate`s
//! - `error` - Order-specific error types
//! - `service` - Upload and withdrawal rules on top of a `LedgerStore`

pub mod error;
pub mod service;
pub mod status;

#[cfg(test)]
mod status_props;

pub use error::OrderError;
pub use service::{OrderService, SubmitOutcome};
pub use status::{OracleStatus, OrderStatus, StatusUpdate};
