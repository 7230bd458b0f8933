//! Gateway error types

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// The server rejected our credentials
    #[error("Authentication expired")]
    AuthExpired,

    #[error("Network error: {0}")]
    Network(String),

    /// The server refused a start/end request
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid gateway configuration: {0}")]
    Config(String),
}

impl GatewayError {
    pub fn is_auth_expired(&self) -> bool {
        matches!(self, GatewayError::AuthExpired)
    }

    /// Only transport and server failures are worth another attempt
    pub fn is_retryable(&self) -> bool {
        matches!(self, GatewayError::Network(_))
    }
}
