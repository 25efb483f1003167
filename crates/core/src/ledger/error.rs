//! Ledger error types.

use rust_decimal::Decimal;
use thiserror::Error;

use loyalty_shared::{AppError, OrderNumber};

/// Result type alias using `LedgerError`.
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Errors surfaced by `LedgerStore` implementations.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// A user with this login already exists.
    #[error("login {0:?} is already taken")]
    DuplicateLogin(String),

    /// The order number is already used by an order or withdrawal.
    #[error("order number {0} is already in use")]
    DuplicateOrderNumber(OrderNumber),

    /// The balance does not cover the requested withdrawal.
    #[error("insufficient funds: requested {requested}, available {available}")]
    InsufficientFunds {
        /// Amount requested.
        requested: Decimal,
        /// Current balance at the time of the check.
        available: Decimal,
    },

    /// Withdrawal sum is zero or negative.
    #[error("withdrawal sum must be positive, got {0}")]
    NonPositiveSum(Decimal),

    /// No user exists with this login.
    #[error("unknown user {0:?}")]
    UnknownUser(String),

    /// The store cannot be reached at all.
    #[error("ledger store unavailable: {0}")]
    Unavailable(String),

    /// Any other storage failure.
    #[error("ledger store error: {0}")]
    Internal(String),
}

impl LedgerError {
    /// Returns true if the whole store is unusable, not just one operation.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::DuplicateLogin(_) | LedgerError::DuplicateOrderNumber(_) => {
                Self::Conflict(err.to_string())
            }
            LedgerError::InsufficientFunds { .. } => Self::InsufficientFunds(err.to_string()),
            LedgerError::NonPositiveSum(_) => Self::InvalidOrderNumber(err.to_string()),
            LedgerError::UnknownUser(_) => Self::Unauthorized(err.to_string()),
            LedgerError::Unavailable(_) | LedgerError::Internal(_) => {
                Self::Database(err.to_string())
            }
        }
    }
}
