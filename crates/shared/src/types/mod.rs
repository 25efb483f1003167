//! Common types used across the application.

pub mod order_number;

pub use order_number::{OrderNumber, OrderNumberError};
