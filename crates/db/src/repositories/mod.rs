//! Repository abstractions for data access.

pub mod order;
pub mod user;

pub use order::{OrderRepository, WithdrawError};
pub use user::UserRepository;
