//! Order-specific error types.

use rust_decimal::Decimal;
use thiserror::Error;

use loyalty_shared::{AppError, OrderNumber, OrderNumberError};

use crate::ledger::LedgerError;

/// Errors raised while uploading orders or requesting withdrawals.
#[derive(Debug, Error)]
pub enum OrderError {
    /// The order number failed parsing or the Luhn check.
    #[error(transparent)]
    InvalidNumber(#[from] OrderNumberError),

    /// Another user already uploaded this order number.
    #[error("order {0} was uploaded by another user")]
    OwnedByAnotherUser(OrderNumber),

    /// The oracle reported a negative accrual.
    #[error("accrual must not be negative, got {0}")]
    NegativeAccrual(Decimal),

    /// The ledger rejected the operation.
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl From<OrderError> for AppError {
    fn from(err: OrderError) -> Self {
        match err {
            OrderError::InvalidNumber(OrderNumberError::ChecksumMismatch(_)) => {
                Self::InvalidOrderNumber(err.to_string())
            }
            OrderError::InvalidNumber(_) => Self::Validation(err.to_string()),
            OrderError::OwnedByAnotherUser(_) => Self::Conflict(err.to_string()),
            OrderError::NegativeAccrual(_) => Self::Internal(err.to_string()),
            OrderError::Ledger(inner) => inner.into(),
        }
    }
}
