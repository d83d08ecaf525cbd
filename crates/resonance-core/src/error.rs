//! Error types for Resonance

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("authentication failed: {reason}")]
    AuthFailed { reason: String },

    #[error("invalid message: {0}")]
    InvalidMessage(String),

    #[error("invalid params: {0}")]
    InvalidParams(String),

    #[error("method not found: {0}")]
    MethodNotFound(String),

    #[error("config error: {0}")]
    ConfigError(String),

    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("json error: {0}")]
    JsonError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn auth_failed(reason: impl Into<String>) -> Self {
        Self::AuthFailed {
            reason: reason.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigError(message.into())
    }

    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::InvalidParams(message.into())
    }

    /// JSON-RPC error code for this error.
    pub fn rpc_code(&self) -> i32 {
        match self {
            Self::AuthFailed { .. } => -32000,
            Self::InvalidMessage(_) => -32700,
            Self::InvalidParams(_) => -32602,
            Self::MethodNotFound(_) => -32601,
            Self::ConfigError(_) | Self::IoError(_) | Self::JsonError(_) => -32603,
        }
    }
}
