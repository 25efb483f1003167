//! The accrual oracle contract.

use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;

use loyalty_core::orders::OracleStatus;
use loyalty_shared::OrderNumber;

/// The oracle's answer for one order.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AccrualInfo {
    /// Order the answer is about.
    pub order: OrderNumber,
    /// Oracle-side status.
    pub status: OracleStatus,
    /// Accrual, sent with `PROCESSED`.
    #[serde(default)]
    pub accrual: Option<Decimal>,
}

/// Classified oracle response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OracleResponse {
    /// The oracle has an answer for the order.
    Resolved(AccrualInfo),
    /// Too many requests. `retry_after` is `None` when the header was
    /// missing or unreadable.
    RateLimited {
        /// Requested pause before any further query.
        retry_after: Option<Duration>,
    },
    /// The oracle does not know the order yet.
    NotRegistered,
}

/// Failures talking to the oracle. All of them are scoped to one order.
#[derive(Debug, Error)]
pub enum OracleError {
    /// Connection, timeout or other transport failure.
    #[error("oracle request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// A status code outside the oracle's contract.
    #[error("unexpected oracle status code {0}")]
    UnexpectedStatus(u16),

    /// A 200 whose body could not be understood.
    #[error("malformed oracle response: {0}")]
    MalformedBody(String),
}

/// Source of accrual decisions for uploaded orders.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AccrualOracle: Send + Sync {
    /// Queries the oracle about a single order.
    async fn order_info(&self, number: OrderNumber) -> Result<OracleResponse, OracleError>;
}
