//! Error handling for the Mewa CLI

use thiserror::Error;

use crate::config::ConfigError;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    #[error("Channel error: {0}")]
    Channel(#[from] mewa_core::ChannelError),

    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Channel rejected the device: {0}")]
    Rejected(String),

    #[error("Command error: {0}")]
    Command(String),
}

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
