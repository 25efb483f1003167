//! Order status state machine.
//!
//! Orders progress through these states:
//! - NEW → PROCESSING (oracle acknowledged the order)
//! - NEW | PROCESSING → PROCESSED (accrual credited)
//! - NEW | PROCESSING → INVALID (oracle refused the order)
//!
//! PROCESSED and INVALID are terminal: once reached, neither the status nor
//! the accrual changes again.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::orders::error::OrderError;

/// Status of an order in the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderStatus {
    /// Uploaded, not yet seen by the oracle.
    New,
    /// The oracle is computing the accrual.
    Processing,
    /// The oracle refused the order; no accrual.
    Invalid,
    /// The accrual has been credited.
    Processed,
}

impl OrderStatus {
    /// Statuses the polling daemon still has to resolve.
    pub const PENDING: [Self; 2] = [Self::New, Self::Processing];

    /// Returns the string representation of the status.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::New => "NEW",
            Self::Processing => "PROCESSING",
            Self::Invalid => "INVALID",
            Self::Processed => "PROCESSED",
        }
    }

    /// Returns true if no further transitions are permitted.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Invalid | Self::Processed)
    }

    /// Returns the statuses from which `self` can be entered.
    ///
    /// Stores use this as the guard of their conditional update, so a write
    /// against a terminal (or already equal) status is a no-op.
    #[must_use]
    pub const fn predecessors(&self) -> &'static [Self] {
        match self {
            Self::New => &[],
            Self::Processing => &[Self::New],
            Self::Invalid | Self::Processed => &[Self::New, Self::Processing],
        }
    }

    /// Returns true if moving from `self` to `next` is a legal transition.
    #[must_use]
    pub fn can_transition_to(&self, next: Self) -> bool {
        next.predecessors().contains(self)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Order status as reported by the accrual oracle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OracleStatus {
    /// The oracle registered the order but has not started on it.
    Registered,
    /// The oracle is computing the accrual.
    Processing,
    /// The oracle refused the order.
    Invalid,
    /// The accrual has been computed.
    Processed,
}

impl OracleStatus {
    /// Maps the oracle status onto the ledger status it produces.
    #[must_use]
    pub const fn ledger_status(self) -> OrderStatus {
        match self {
            Self::Registered | Self::Processing => OrderStatus::Processing,
            Self::Invalid => OrderStatus::Invalid,
            Self::Processed => OrderStatus::Processed,
        }
    }
}

/// A validated status change for a single order.
///
/// Only `PROCESSED` updates carry an accrual, and that accrual is never
/// negative. Constructing an update is the only way to obtain one, so
/// stores can apply it without re-checking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusUpdate {
    status: OrderStatus,
    accrual: Option<Decimal>,
}

impl StatusUpdate {
    /// The oracle acknowledged the order.
    #[must_use]
    pub const fn processing() -> Self {
        Self {
            status: OrderStatus::Processing,
            accrual: None,
        }
    }

    /// The oracle refused the order.
    #[must_use]
    pub const fn invalid() -> Self {
        Self {
            status: OrderStatus::Invalid,
            accrual: None,
        }
    }

    /// The oracle credited `accrual` to the order.
    pub fn processed(accrual: Decimal) -> Result<Self, OrderError> {
        if accrual < Decimal::ZERO {
            return Err(OrderError::NegativeAccrual(accrual));
        }
        Ok(Self {
            status: OrderStatus::Processed,
            accrual: Some(accrual),
        })
    }

    /// Builds the update implied by an oracle answer.
    ///
    /// A `PROCESSED` answer without an accrual credits zero; accruals sent
    /// alongside any other status are ignored.
    pub fn from_oracle(status: OracleStatus, accrual: Option<Decimal>) -> Result<Self, OrderError> {
        match status.ledger_status() {
            OrderStatus::Processed => Self::processed(accrual.unwrap_or(Decimal::ZERO)),
            OrderStatus::Invalid => Ok(Self::invalid()),
            OrderStatus::New | OrderStatus::Processing => Ok(Self::processing()),
        }
    }

    /// Returns the target status.
    #[must_use]
    pub const fn status(&self) -> OrderStatus {
        self.status
    }

    /// Returns the accrual to credit, present only for `PROCESSED`.
    #[must_use]
    pub const fn accrual(&self) -> Option<Decimal> {
        self.accrual
    }
}
