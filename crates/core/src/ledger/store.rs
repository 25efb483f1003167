//! The `LedgerStore` contract.

use async_trait::async_trait;
use rust_decimal::Decimal;

use loyalty_shared::OrderNumber;

use crate::ledger::error::LedgerResult;
use crate::ledger::types::{Balance, Order, Withdrawal};
use crate::orders::StatusUpdate;

/// Durable persistence of users, orders and withdrawals.
///
/// Every method is a future that may be dropped to cancel it; callers bound
/// it with a timeout. Implementations must be safe to share between the
/// HTTP layer and the accrual daemon without any outer lock.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Checks that the store can serve requests.
    async fn ping(&self) -> LedgerResult<()>;

    /// Returns true iff no user exists with this login.
    async fn is_login_available(&self, login: &str) -> LedgerResult<bool>;

    /// Creates a user with a hashed credential.
    ///
    /// Concurrent registrations of the same login resolve to exactly one
    /// winner; the others fail with `DuplicateLogin`.
    async fn register(&self, login: &str, password: &str) -> LedgerResult<()>;

    /// Verifies a password. Unknown login and wrong password both yield `false`.
    async fn authenticate(&self, login: &str, password: &str) -> LedgerResult<bool>;

    /// Returns the login owning `number`, or `None` if the number is unused.
    async fn order_owner(&self, number: OrderNumber) -> LedgerResult<Option<String>>;

    /// Inserts a NEW order owned by `login`.
    async fn upload_order(&self, login: &str, number: OrderNumber) -> LedgerResult<()>;

    /// Lists the user's earned orders, newest first.
    async fn orders(&self, login: &str) -> LedgerResult<Vec<Order>>;

    /// Lists every order not yet in a terminal status.
    async fn pending_orders(&self) -> LedgerResult<Vec<OrderNumber>>;

    /// Applies a status update.
    ///
    /// Returns `false` if nothing changed: the order is unknown, already
    /// terminal, or already in the target status.
    async fn update_order_status(
        &self,
        number: OrderNumber,
        update: StatusUpdate,
    ) -> LedgerResult<bool>;

    /// Derives the user's balance in a single consistent read.
    async fn balance(&self, login: &str) -> LedgerResult<Balance>;

    /// Records a withdrawal of `sum` under `number`.
    ///
    /// A zero or negative `sum` is rejected with `NonPositiveSum`.
    /// The balance is re-checked at write time; concurrent withdrawals for
    /// the same user are serialized so their total never exceeds the
    /// credited accruals.
    async fn withdraw(&self, login: &str, number: OrderNumber, sum: Decimal) -> LedgerResult<()>;

    /// Lists the user's withdrawals, newest first.
    async fn withdrawals(&self, login: &str) -> LedgerResult<Vec<Withdrawal>>;
}
