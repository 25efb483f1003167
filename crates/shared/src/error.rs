//! Application-wide error types.

use thiserror::Error;

/// Result type alias using `AppError`.
pub type AppResult<T> = Result<T, AppError>;

/// Application error types.
#[derive(Debug, Error)]
pub enum AppError {
    /// Authentication failed.
    #[error("Authentication failed: {0}")]
    Unauthorized(String),

    /// Malformed request (missing fields, bad syntax).
    #[error("Validation error: {0}")]
    Validation(String),

    /// Well-formed order number that fails the checksum, or an unusable amount.
    #[error("Invalid order number: {0}")]
    InvalidOrderNumber(String),

    /// Conflict (e.g., duplicate login, order owned by someone else).
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Balance does not cover the requested withdrawal.
    #[error("Insufficient funds: {0}")]
    InsufficientFunds(String),

    /// Database error.
    #[error("Database error: {0}")]
    Database(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::Unauthorized(_) => 401,
            Self::Validation(_) => 400,
            Self::InvalidOrderNumber(_) => 422,
            Self::Conflict(_) => 409,
            Self::InsufficientFunds(_) => 402,
            Self::Database(_) | Self::Internal(_) => 500,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::InvalidOrderNumber(_) => "INVALID_ORDER_NUMBER",
            Self::Conflict(_) => "CONFLICT",
            Self::InsufficientFunds(_) => "INSUFFICIENT_FUNDS",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Returns true if repeating the same request later may succeed.
    ///
    /// Client-side mistakes and business rule rejections are permanent;
    /// only server-side failures are worth retrying.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Database(_) | Self::Internal(_))
    }
}
