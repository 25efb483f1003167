//! `SeaORM` entity prelude.

pub use super::orders::Entity as Orders;
pub use super::users::Entity as Users;
