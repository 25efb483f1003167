//! Accrual synchronization.
//!
//! This crate keeps order statuses in the ledger in step with the external
//! accrual oracle.
//!
//! # Modules
//!
//! - `oracle` - The `AccrualOracle` contract and its response classes
//! - `client` - `HttpAccrualOracle`, the reqwest-based oracle client
//! - `daemon` - `AccrualDaemon`, the cancellable polling loop

pub mod client;
pub mod daemon;
pub mod oracle;


pub use client::HttpAccrualOracle;
pub use daemon::{AccrualDaemon, CycleReport, DaemonConfig, DaemonError};
pub use oracle::{AccrualInfo, AccrualOracle, OracleError, OracleResponse};
