//! Postgres implementation of `LedgerStore`.

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ConnAcquireErr, DatabaseConnection, DbErr, SqlErr};
use tracing::{debug, warn};
use uuid::Uuid;

use loyalty_core::auth::{hash_password, reject_unknown_login, verify_password};
use loyalty_core::ledger::{Balance, LedgerError, LedgerResult, LedgerStore, Order, Withdrawal};
use loyalty_core::orders::{OrderStatus, StatusUpdate};
use loyalty_shared::OrderNumber;

use crate::entities::orders;
use crate::entities::sea_orm_active_enums::OrderStatus as DbStatus;
use crate::repositories::{OrderRepository, UserRepository, WithdrawError};

/// `LedgerStore` backed by Postgres through `SeaORM`.
#[derive(Debug, Clone)]
pub struct PgLedgerStore {
    db: DatabaseConnection,
    users: UserRepository,
    orders: OrderRepository,
}

impl PgLedgerStore {
    /// Creates a store over an established connection pool.
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            users: UserRepository::new(db.clone()),
            orders: OrderRepository::new(db.clone()),
            db,
        }
    }

    async fn user_id(&self, login: &str) -> LedgerResult<Uuid> {
        self.users
            .find_by_login(login)
            .await
            .map_err(storage_error)?
            .map(|user| user.id)
            .ok_or_else(|| LedgerError::UnknownUser(login.to_string()))
    }
}

fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

/// Maps a database error onto the ledger taxonomy.
///
/// Only a lost or refused connection makes the store unavailable. A pool
/// acquire timeout means the pool is saturated, which is a per-operation
/// failure.
fn storage_error(err: DbErr) -> LedgerError {
    match err {
        DbErr::ConnectionAcquire(ConnAcquireErr::ConnectionClosed) | DbErr::Conn(_) => {
            LedgerError::Unavailable(err.to_string())
        }
        _ => LedgerError::Internal(err.to_string()),
    }
}

fn order_number(raw: i64) -> LedgerResult<OrderNumber> {
    OrderNumber::new(raw).map_err(|e| LedgerError::Internal(format!("stored order {raw}: {e}")))
}

fn to_order(model: orders::Model) -> LedgerResult<Order> {
    Ok(Order {
        number: order_number(model.number)?,
        status: model.status.into(),
        accrual: model.accrual,
        uploaded_at: model.uploaded_at.with_timezone(&Utc),
    })
}

fn to_withdrawal(model: orders::Model) -> LedgerResult<Withdrawal> {
    Ok(Withdrawal {
        order: order_number(model.number)?,
        sum: model.withdrawal.unwrap_or_default(),
        processed_at: model.uploaded_at.with_timezone(&Utc),
    })
}

#[async_trait]
impl LedgerStore for PgLedgerStore {
    async fn ping(&self) -> LedgerResult<()> {
        self.db.ping().await.map_err(storage_error)
    }

    async fn is_login_available(&self, login: &str) -> LedgerResult<bool> {
        let exists = self.users.login_exists(login).await.map_err(storage_error)?;
        Ok(!exists)
    }

    async fn register(&self, login: &str, password: &str) -> LedgerResult<()> {
        let hash = hash_password(password).map_err(|e| LedgerError::Internal(e.to_string()))?;

        match self.users.create(login, &hash).await {
            Ok(_) => Ok(()),
            Err(e) if is_unique_violation(&e) => Err(LedgerError::DuplicateLogin(login.to_string())),
            Err(e) => Err(storage_error(e)),
        }
    }

    async fn authenticate(&self, login: &str, password: &str) -> LedgerResult<bool> {
        let user = self.users.find_by_login(login).await.map_err(storage_error)?;
        match user {
            Some(user) => verify_password(password, &user.password_hash)
                .map_err(|e| LedgerError::Internal(e.to_string())),
            None => Ok(reject_unknown_login(password)),
        }
    }

    async fn order_owner(&self, number: OrderNumber) -> LedgerResult<Option<String>> {
        self.orders
            .owner_login(number.get())
            .await
            .map_err(storage_error)
    }

    async fn upload_order(&self, login: &str, number: OrderNumber) -> LedgerResult<()> {
        let user_id = self.user_id(login).await?;

        match self.orders.create(user_id, number.get()).await {
            Ok(_) => Ok(()),
            Err(e) if is_unique_violation(&e) => Err(LedgerError::DuplicateOrderNumber(number)),
            Err(e) => Err(storage_error(e)),
        }
    }

    async fn orders(&self, login: &str) -> LedgerResult<Vec<Order>> {
        let user_id = self.user_id(login).await?;
        self.orders
            .list_earned(user_id)
            .await
            .map_err(storage_error)?
            .into_iter()
            .map(to_order)
            .collect()
    }

    async fn pending_orders(&self) -> LedgerResult<Vec<OrderNumber>> {
        let pending: Vec<DbStatus> = OrderStatus::PENDING.iter().map(|s| (*s).into()).collect();
        self.orders
            .pending_numbers(&pending)
            .await
            .map_err(storage_error)?
            .into_iter()
            .map(order_number)
            .collect()
    }

    async fn update_order_status(
        &self,
        number: OrderNumber,
        update: StatusUpdate,
    ) -> LedgerResult<bool> {
        let target: OrderStatus = update.status();
        let from: Vec<DbStatus> = target.predecessors().iter().map(|s| (*s).into()).collect();

        let changed = self
            .orders
            .transition(number.get(), &from, target.into(), update.accrual())
            .await
            .map_err(storage_error)?;

        if !changed {
            debug!(order = %number, status = %target, "Status update was a no-op");
        }
        Ok(changed)
    }

    async fn balance(&self, login: &str) -> LedgerResult<Balance> {
        let user_id = self.user_id(login).await?;
        let (accrued, withdrawn) = self.orders.totals(user_id).await.map_err(storage_error)?;
        Ok(Balance::from_totals(accrued, withdrawn))
    }

    async fn withdraw(&self, login: &str, number: OrderNumber, sum: Decimal) -> LedgerResult<()> {
        if sum <= Decimal::ZERO {
            return Err(LedgerError::NonPositiveSum(sum));
        }
        match self.orders.withdraw(login, number.get(), sum).await {
            Ok(_) => Ok(()),
            Err(WithdrawError::UnknownUser(login)) => Err(LedgerError::UnknownUser(login)),
            Err(WithdrawError::InsufficientFunds {
                requested,
                available,
            }) => Err(LedgerError::InsufficientFunds {
                requested,
                available,
            }),
            Err(WithdrawError::Database(e)) if is_unique_violation(&e) => {
                Err(LedgerError::DuplicateOrderNumber(number))
            }
            Err(WithdrawError::Database(e)) => {
                warn!(login, order = %number, error = %e, "Withdrawal transaction failed");
                Err(storage_error(e))
            }
        }
    }

    async fn withdrawals(&self, login: &str) -> LedgerResult<Vec<Withdrawal>> {
        let user_id = self.user_id(login).await?;
        self.orders
            .list_withdrawals(user_id)
            .await
            .map_err(storage_error)?
            .into_iter()
            .map(to_withdrawal)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::RuntimeErr;

    #[test]
    fn test_lost_connection_is_unavailable() {
        let closed = storage_error(DbErr::ConnectionAcquire(ConnAcquireErr::ConnectionClosed));
        assert!(matches!(closed, LedgerError::Unavailable(_)));
        assert!(closed.is_fatal());

        let refused = storage_error(DbErr::Conn(RuntimeErr::Internal("refused".into())));
        assert!(matches!(refused, LedgerError::Unavailable(_)));
    }

    #[test]
    fn test_pool_timeout_is_not_fatal() {
        let timeout = storage_error(DbErr::ConnectionAcquire(ConnAcquireErr::Timeout));
        assert!(matches!(timeout, LedgerError::Internal(_)));
        assert!(!timeout.is_fatal());
    }

    #[test]
    fn test_query_failure_is_internal() {
        let failed = storage_error(DbErr::Custom("deadlock detected".into()));
        assert!(matches!(failed, LedgerError::Internal(_)));
        assert!(!failed.is_fatal());
    }
}
