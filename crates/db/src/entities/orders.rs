//! `SeaORM` Entity for orders table.
//!
//! Earned orders and withdrawals share this table and its number space.
//! A row with `withdrawal` set is a debit; otherwise `accrual` holds the
//! credit once the order is processed.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::sea_orm_active_enums::OrderStatus;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub number: i64,
    pub user_id: Uuid,
    pub uploaded_at: DateTimeWithTimeZone,
    pub status: OrderStatus,
    #[sea_orm(column_type = "Decimal(None)", nullable)]
    pub accrual: Option<Decimal>,
    #[sea_orm(column_type = "Decimal(None)", nullable)]
    pub withdrawal: Option<Decimal>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id"
    )]
    Users,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
