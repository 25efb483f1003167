//! Shared types, errors, and configuration for the loyalty ledger.
//!
//! This crate provides common types used across all other crates:
//! - Order numbers with Luhn validation
//! - Request/response payloads for the user API
//! - Application-wide error types
//! - Configuration management
//! - JWT issuance and validation

pub mod auth;
pub mod config;
pub mod error;
pub mod jwt;
pub mod types;


pub use auth::Claims;
pub use config::AppConfig;
pub use error::{AppError, AppResult};
pub use jwt::{JwtConfig, JwtError, JwtService};
pub use types::{OrderNumber, OrderNumberError};
