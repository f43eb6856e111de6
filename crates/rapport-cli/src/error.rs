use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] rapport_core::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("No owner given. Pass --owner or set RAPPORT_OWNER_ID.")]
    MissingOwner,
    #[error("Invalid {kind} input: {message}")]
    InvalidInput { kind: &'static str, message: String },
    #[error("The manual strategy needs --payload with the chosen profile fields")]
    MissingPayload,
}

impl From<rapport_core::config::ConfigError> for CliError {
    fn from(error: rapport_core::config::ConfigError) -> Self {
        Self::Config(error.to_string())
    }
}
