// error.rs
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ColorError {
    #[error("{0} is not a supported type.")]
    Unsupported(String),
    #[error("Invalid {channel} range. Must be between {min} and {max}, and it is {value}")]
    OutOfRange {
        channel: &'static str,
        min: u32,
        max: u32,
        value: String,
    },
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Not connected to the music server")]
    NotConnected,
    #[error("Connection closed")]
    ConnectionClosed,
    #[error("Transport error: {0}")]
    Transport(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("Protocol error: {0}")]
    Protocol(#[from] serde_json::Error),
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Session storage error: {0}")]
    Session(#[from] std::io::Error),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Request failed with status {0}")]
    Api(u16),
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::Validation(errors.to_string())
    }
}
