//! Core business logic for the loyalty ledger.
//!
//! This crate contains pure business logic with ZERO web or database dependencies.
//!
//! # Modules
//!
//! - `auth` - Password hashing and verification
//! - `orders` - Order status state machine, upload and withdrawal rules
//! - `ledger` - The `LedgerStore` contract, its domain types, and an in-memory backend

pub mod auth;
pub mod ledger;
pub mod orders;
