use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExchangeError {
    #[error("WebSocket connection failed: {0}")]
    ConnectionError(String),

    #[error("WebSocket connection timeout: {0}")]
    ConnectionTimeout(String),

    #[error("WebSocket not connected")]
    NotConnected,

    #[error("WebSocket read failed: {0}")]
    ReadError(String),

    #[error("WebSocket write failed: {0}")]
    WriteError(String),

    #[error("Failed to decode message: {0}")]
    DecodeError(String),

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Authentication error: {0}")]
    AuthError(String),

    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Configuration error: {0}")]
    ConfigError(#[from] crate::core::config::ConfigError),
}
