//! Order repository for database operations.
//!
//! Earned orders and withdrawals live in the same table. Reads split them
//! on whether `withdrawal` is set.

use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    FromQueryResult, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use thiserror::Error;
use uuid::Uuid;

use crate::entities::sea_orm_active_enums::OrderStatus;
use crate::entities::{orders, users};

/// Errors from the withdrawal transaction.
#[derive(Debug, Error)]
pub enum WithdrawError {
    /// No user exists with this login.
    #[error("unknown user {0:?}")]
    UnknownUser(String),

    /// The balance does not cover the requested sum.
    #[error("insufficient funds: requested {requested}, available {available}")]
    InsufficientFunds {
        /// Amount requested.
        requested: Decimal,
        /// Balance at the time of the check.
        available: Decimal,
    },

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

#[derive(Debug, Default, FromQueryResult)]
struct TotalsRow {
    accrued: Option<Decimal>,
    withdrawn: Option<Decimal>,
}

/// Order repository for CRUD operations.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    db: DatabaseConnection,
}

impl OrderRepository {
    /// Creates a new order repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Returns the login of the user owning `number`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn owner_login(&self, number: i64) -> Result<Option<String>, DbErr> {
        let found = orders::Entity::find_by_id(number)
            .find_also_related(users::Entity)
            .one(&self.db)
            .await?;

        Ok(found.and_then(|(_, user)| user.map(|u| u.login)))
    }

    /// Inserts a NEW order.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails, including a unique violation
    /// when the number is already used.
    pub async fn create(&self, user_id: Uuid, number: i64) -> Result<orders::Model, DbErr> {
        let order = orders::ActiveModel {
            number: Set(number),
            user_id: Set(user_id),
            uploaded_at: Set(chrono::Utc::now().into()),
            status: Set(OrderStatus::New),
            accrual: Set(None),
            withdrawal: Set(None),
        };

        order.insert(&self.db).await
    }

    /// Lists a user's earned orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_earned(&self, user_id: Uuid) -> Result<Vec<orders::Model>, DbErr> {
        orders::Entity::find()
            .filter(orders::Column::UserId.eq(user_id))
            .filter(orders::Column::Withdrawal.is_null())
            .order_by_desc(orders::Column::UploadedAt)
            .all(&self.db)
            .await
    }

    /// Lists a user's withdrawals, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_withdrawals(&self, user_id: Uuid) -> Result<Vec<orders::Model>, DbErr> {
        orders::Entity::find()
            .filter(orders::Column::UserId.eq(user_id))
            .filter(orders::Column::Withdrawal.is_not_null())
            .order_by_desc(orders::Column::UploadedAt)
            .all(&self.db)
            .await
    }

    /// Returns the numbers of all orders whose status is one of `statuses`,
    /// oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn pending_numbers(&self, statuses: &[OrderStatus]) -> Result<Vec<i64>, DbErr> {
        orders::Entity::find()
            .filter(orders::Column::Status.is_in(statuses.iter().copied()))
            .order_by_asc(orders::Column::UploadedAt)
            .select_only()
            .column(orders::Column::Number)
            .into_tuple()
            .all(&self.db)
            .await
    }

    /// Sets status and accrual if the current status is one of `from`.
    ///
    /// The guard runs inside the UPDATE, so concurrent writers cannot both
    /// move the same order. Returns true if a row changed.
    ///
    /// # Errors
    ///
    /// Returns an error if the database update fails.
    pub async fn transition(
        &self,
        number: i64,
        from: &[OrderStatus],
        to: OrderStatus,
        accrual: Option<Decimal>,
    ) -> Result<bool, DbErr> {
        if from.is_empty() {
            return Ok(false);
        }

        let result = orders::Entity::update_many()
            .set(orders::ActiveModel {
                status: Set(to),
                accrual: Set(accrual),
                ..Default::default()
            })
            .filter(orders::Column::Number.eq(number))
            .filter(orders::Column::Status.is_in(from.iter().copied()))
            .exec(&self.db)
            .await?;

        Ok(result.rows_affected > 0)
    }

    /// Returns `(accrued, withdrawn)` totals for a user in a single statement.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn totals(&self, user_id: Uuid) -> Result<(Decimal, Decimal), DbErr> {
        totals_on(&self.db, user_id).await
    }

    /// Records a withdrawal after re-checking the balance.
    ///
    /// Locks the user row for the duration of the transaction so that
    /// concurrent withdrawals for the same user run one after another.
    ///
    /// # Errors
    ///
    /// Returns `UnknownUser`, `InsufficientFunds`, or a database error
    /// (a unique violation when the number is already used).
    pub async fn withdraw(
        &self,
        login: &str,
        number: i64,
        sum: Decimal,
    ) -> Result<orders::Model, WithdrawError> {
        let txn = self.db.begin().await?;

        let user = users::Entity::find()
            .filter(users::Column::Login.eq(login))
            .lock_exclusive()
            .one(&txn)
            .await?
            .ok_or_else(|| WithdrawError::UnknownUser(login.to_string()))?;

        let (accrued, withdrawn) = totals_on(&txn, user.id).await?;
        let available = accrued - withdrawn;
        if available < sum {
            txn.rollback().await?;
            return Err(WithdrawError::InsufficientFunds {
                requested: sum,
                available,
            });
        }

        let debit = orders::ActiveModel {
            number: Set(number),
            user_id: Set(user.id),
            uploaded_at: Set(chrono::Utc::now().into()),
            status: Set(OrderStatus::Processed),
            accrual: Set(None),
            withdrawal: Set(Some(sum)),
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;
        Ok(debit)
    }
}

async fn totals_on<C: ConnectionTrait>(conn: &C, user_id: Uuid) -> Result<(Decimal, Decimal), DbErr> {
    let row = orders::Entity::find()
        .select_only()
        .column_as(Expr::col(orders::Column::Accrual).sum(), "accrued")
        .column_as(Expr::col(orders::Column::Withdrawal).sum(), "withdrawn")
        .filter(orders::Column::UserId.eq(user_id))
        .into_model::<TotalsRow>()
        .one(conn)
        .await?
        .unwrap_or_default();

    Ok((
        row.accrued.unwrap_or_default(),
        row.withdrawn.unwrap_or_default(),
    ))
}
