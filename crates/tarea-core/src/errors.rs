//! Error types for failure handling across the client.
//!
//! Every failure a user can hit maps onto one of these variants so the
//! calling layer can decide how much of the cause to surface: validation
//! problems never reach the network, API errors carry the server's own
//! detail message, and transport failures stay distinguishable from a
//! response that arrived with an unexpected shape.

use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum ClientError {
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("API error {status}: {detail}")]
    ApiError { status: u16, detail: String },
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Network error: {0}")]
    NetworkError(String),
    #[error("Parsing error: {0}")]
    ParsingError(String),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("I/O error: {0}")]
    IoError(String),
}

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        ClientError::IoError(err.to_string())
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ClientError::ParsingError(err.to_string())
        } else {
            ClientError::NetworkError(err.to_string())
        }
    }
}
