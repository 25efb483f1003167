//! Ledger domain types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use loyalty_shared::OrderNumber;

use crate::orders::OrderStatus;

/// An order uploaded by a user to earn an accrual.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    /// Order number.
    pub number: OrderNumber,
    /// Current status.
    pub status: OrderStatus,
    /// Credited accrual, present once the order is PROCESSED.
    pub accrual: Option<Decimal>,
    /// When the order was uploaded.
    pub uploaded_at: DateTime<Utc>,
}

/// A debit recorded against a user's balance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Withdrawal {
    /// Order number the withdrawal was recorded under.
    pub order: OrderNumber,
    /// Amount withdrawn.
    pub sum: Decimal,
    /// When the withdrawal was recorded.
    pub processed_at: DateTime<Utc>,
}

/// A user's derived balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Balance {
    /// Credited accruals minus withdrawals.
    pub current: Decimal,
    /// Sum of all withdrawals.
    pub withdrawn: Decimal,
}

impl Balance {
    /// Derives the balance from the total credited and total withdrawn.
    #[must_use]
    pub fn from_totals(accrued: Decimal, withdrawn: Decimal) -> Self {
        Self {
            current: accrued - withdrawn,
            withdrawn,
        }
    }

    /// Returns true if the current balance covers `sum`.
    #[must_use]
    pub fn covers(&self, sum: Decimal) -> bool {
        self.current >= sum
    }
}
