//! Mewa CLI library
//!
//! Command-line client for Mewa channels: argument parsing, layered configuration
//! and the command handlers that drive a websocket channel session.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod interactive;

pub use cli::{Cli, Commands};
pub use commands::CommandDispatcher;
pub use config::{CliAppConfig, CliConfig, ConfigError, ConfigOverrides};
pub use error::{CliError, Result};
