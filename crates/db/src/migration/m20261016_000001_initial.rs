//! Initial database migration.
//!
//! Creates the order status enum, the users and orders tables, and the
//! index backing the accrual daemon's polling query.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        db.execute_unprepared(ENUMS_SQL).await?;
        db.execute_unprepared(USERS_SQL).await?;
        db.execute_unprepared(ORDERS_SQL).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(DROP_ALL_SQL).await?;
        Ok(())
    }
}

const ENUMS_SQL: &str = r"
CREATE TYPE order_status AS ENUM ('NEW', 'PROCESSING', 'INVALID', 'PROCESSED');
";

const USERS_SQL: &str = r"
CREATE TABLE users (
    id              UUID PRIMARY KEY,
    login           TEXT NOT NULL,
    password_hash   TEXT NOT NULL,
    created_at      TIMESTAMPTZ NOT NULL DEFAULT NOW(),

    CONSTRAINT users_login_key UNIQUE (login)
);
";

const ORDERS_SQL: &str = r"
CREATE TABLE orders (
    number          BIGINT PRIMARY KEY,
    user_id         UUID NOT NULL REFERENCES users(id),
    uploaded_at     TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    status          order_status NOT NULL DEFAULT 'NEW',
    accrual         NUMERIC,
    withdrawal      NUMERIC,

    CONSTRAINT orders_number_positive CHECK (number > 0),
    CONSTRAINT orders_accrual_non_negative CHECK (accrual IS NULL OR accrual >= 0),
    CONSTRAINT orders_withdrawal_positive CHECK (withdrawal IS NULL OR withdrawal > 0),
    CONSTRAINT orders_credit_or_debit CHECK (accrual IS NULL OR withdrawal IS NULL)
);

CREATE INDEX idx_orders_user_uploaded ON orders(user_id, uploaded_at DESC);

-- Polling set for the accrual daemon
CREATE INDEX idx_orders_pending ON orders(uploaded_at)
    WHERE status IN ('NEW', 'PROCESSING');
";

const DROP_ALL_SQL: &str = r"
DROP TABLE IF EXISTS orders CASCADE;
DROP TABLE IF EXISTS users CASCADE;
DROP TYPE IF EXISTS order_status CASCADE;
";
