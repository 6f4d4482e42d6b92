//! Authentication error types.

use chrono::{DateTime, Utc};
use pastcare_core::error::CoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("account is locked until {until}")]
    AccountLocked { until: DateTime<Utc> },

    #[error("church association invalid: {0}")]
    ChurchAssociation(String),

    #[error("token has expired")]
    TokenExpired,

    #[error("invalid token: {0}")]
    TokenInvalid(String),

    #[error("cryptography error: {0}")]
    Crypto(String),

    #[error("too many failed logins from {ip}")]
    IpBlocked { ip: String },

    #[error("invalid auth configuration: {0}")]
    Config(String),
}

impl From<AuthError> for CoreError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Crypto(msg) => CoreError::Crypto(msg),
            AuthError::Config(message) => CoreError::Validation { message },
            other => CoreError::AuthenticationFailed {
                reason: other.to_string(),
            },
        }
    }
}
