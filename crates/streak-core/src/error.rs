//! Core error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Storage error: {0}")]
    Storage(#[from] streak_storage::StorageError),

    #[error("Session error: {0}")]
    Session(#[from] streak_session::SessionError),

    #[error("Gateway error: {0}")]
    Gateway(#[from] streak_gateway::GatewayError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}
