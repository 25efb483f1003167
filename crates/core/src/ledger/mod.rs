//! The ledger: durable record of orders and withdrawals.
//!
//! Balances are never stored; they are derived from order rows on every
//! read. The `LedgerStore` trait is the single contract shared by the HTTP
//! layer and the accrual daemon. Backends:
//! - `MemoryLedger` (this crate) for tests and local experiments
//! - `PgLedgerStore` (`loyalty-db`) for production

pub mod error;
pub mod memory;
pub mod store;
pub mod types;

#[cfg(test)]
mod memory_props;

pub use error::{LedgerError, LedgerResult};
pub use memory::MemoryLedger;
pub use store::LedgerStore;
pub use types::{Balance, Order, Withdrawal};
