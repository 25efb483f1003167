//! Authentication types for JWT and tokens.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// JWT claims for access tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user login).
    pub sub: String,
    /// Issued at timestamp.
    pub iat: i64,
    /// Expiration timestamp.
    pub exp: i64,
}

impl Claims {
    /// Creates new claims for a user.
    #[must_use]
    pub fn new(login: &str, expires_at: DateTime<Utc>) -> Self {
        let now = Utc::now();
        Self {
            sub: login.to_string(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        }
    }

    /// Returns the login the token was issued to.
    #[must_use]
    pub fn login(&self) -> &str {
        &self.sub
    }
}

/// Register and login request payload.
#[derive(Debug, Clone, Deserialize)]
pub struct Credentials {
    /// User login (case-sensitive).
    #[serde(default)]
    pub login: String,
    /// User password.
    #[serde(default)]
    pub password: String,
}

impl Credentials {
    /// Returns true if both login and password are present.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        !self.login.is_empty() && !self.password.is_empty()
    }
}

/// Token returned after successful registration or login.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    /// Access token.
    pub access_token: String,
    /// Always `Bearer`.
    pub token_type: String,
    /// Token expiration in seconds.
    pub expires_in: i64,
}

impl TokenResponse {
    /// Creates a bearer token response.
    #[must_use]
    pub fn bearer(access_token: String, expires_in: i64) -> Self {
        Self {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in,
        }
    }
}
