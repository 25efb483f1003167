//! User repository for database operations.

use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, Set,
};
use uuid::Uuid;

use crate::entities::users;

/// User repository for CRUD operations.
#[derive(Debug, Clone)]
pub struct UserRepository {
    db: DatabaseConnection,
}

impl UserRepository {
    /// Creates a new user repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Finds a user by login.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_by_login(&self, login: &str) -> Result<Option<users::Model>, DbErr> {
        users::Entity::find()
            .filter(users::Column::Login.eq(login))
            .one(&self.db)
            .await
    }

    /// Creates a new user.
    ///
    /// # Errors
    ///
    /// Returns an error if the database insert fails, including a unique
    /// violation when the login is taken.
    pub async fn create(&self, login: &str, password_hash: &str) -> Result<users::Model, DbErr> {
        let user = users::ActiveModel {
            id: Set(Uuid::now_v7()),
            login: Set(login.to_string()),
            password_hash: Set(password_hash.to_string()),
            created_at: Set(chrono::Utc::now().into()),
        };

        user.insert(&self.db).await
    }

    /// Checks if a login is already registered.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn login_exists(&self, login: &str) -> Result<bool, DbErr> {
        let count = users::Entity::find()
            .filter(users::Column::Login.eq(login))
            .count(&self.db)
            .await?;

        Ok(count > 0)
    }
}
