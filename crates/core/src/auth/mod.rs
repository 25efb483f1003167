//! Password hashing and verification.

mod password;

pub use password::{PasswordError, hash_password, reject_unknown_login, verify_password};
