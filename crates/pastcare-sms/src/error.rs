//! SMS error types.

use thiserror::Error;

use crate::gateway::SmsGatewayKind;

#[derive(Debug, Error)]
pub enum SmsError {
    #[error("invalid phone number: {0}")]
    InvalidNumber(String),

    #[error("{gateway} gateway failed: {message}")]
    Gateway {
        gateway: SmsGatewayKind,
        message: String,
    },
}
