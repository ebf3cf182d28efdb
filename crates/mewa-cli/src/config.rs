//! Mewa CLI Configuration Management
//!
//! Configuration is layered with figment, lowest priority first:
//! - Default values
//! - `mewa.toml` in the working directory
//! - The file given with `--config`
//! - Environment variables (`MEWA_CONNECTION__ENDPOINT`, `MEWA_CLI__VERBOSE`, ...)
//! - Command line arguments

use std::path::Path;
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use mewa_core::{ConnectionConfig, SubscriptionSpec};

// ----------------------------------------------------------------------------
// CLI Application Configuration
// ----------------------------------------------------------------------------

/// Complete configuration for the Mewa CLI
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CliAppConfig {
    /// Channel endpoint, credentials and subscriptions
    pub connection: ConnectionConfig,

    /// CLI behavior
    pub cli: CliConfig,
}

/// CLI-specific configuration options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CliConfig {
    /// Enable verbose logging output
    pub verbose: bool,

    /// Prompt for the interactive mode
    pub prompt: String,

    /// How long to wait for the channel to accept the device (in seconds)
    pub connect_timeout_secs: u64,

    /// How long one-shot commands print replies before disconnecting (in milliseconds)
    pub reply_window_ms: u64,
}

/// Values given on the command line
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub endpoint: Option<String>,
    pub channel: Option<String>,
    pub device: Option<String>,
    pub password: Option<String>,
    pub subscriptions: Option<Vec<String>>,
    pub verbose: Option<bool>,
    pub connect_timeout_secs: Option<u64>,
}

// ----------------------------------------------------------------------------
// Default Implementations
// ----------------------------------------------------------------------------

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            verbose: false,
            prompt: "mewa> ".to_string(),
            connect_timeout_secs: 10,
            reply_window_ms: 2000,
        }
    }
}

impl Default for CliAppConfig {
    fn default() -> Self {
        Self {
            connection: ConnectionConfig::new("ws://localhost/ws", "user.channel1", "mewa-cli", "")
                .with_subscriptions(SubscriptionSpec::all()),
            cli: CliConfig::default(),
        }
    }
}

// ----------------------------------------------------------------------------
// Configuration Loading Logic
// ----------------------------------------------------------------------------

impl CliAppConfig {
    /// File picked up from the working directory when present
    pub const DEFAULT_FILE: &'static str = "mewa.toml";

    /// Prefix of configuration environment variables
    pub const ENV_PREFIX: &'static str = "MEWA_";

    /// Load configuration with the standard priority order
    pub fn load(explicit: Option<&Path>, overrides: &ConfigOverrides) -> Result<Self, ConfigError> {
        let mut figment = Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Toml::file(Self::DEFAULT_FILE));

        if let Some(path) = explicit {
            if !path.is_file() {
                return Err(ConfigError::FileSystem(format!(
                    "Configuration file {} not found",
                    path.display()
                )));
            }
            figment = figment.merge(Toml::file(path));
        }

        figment = figment.merge(Env::prefixed(Self::ENV_PREFIX).split("__"));
        figment = Self::apply_overrides(figment, overrides);

        let config: CliAppConfig = figment
            .extract()
            .map_err(|e| ConfigError::Loading(format!("Failed to load configuration: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path, over defaults only
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let figment = Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Toml::file(path.as_ref()));

        let config: CliAppConfig = figment.extract().map_err(|e| {
            ConfigError::Loading(format!(
                "Failed to load from {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;

        config.validate()?;
        Ok(config)
    }

    fn apply_overrides(mut figment: Figment, overrides: &ConfigOverrides) -> Figment {
        if let Some(endpoint) = &overrides.endpoint {
            figment = figment.merge(("connection.endpoint", endpoint));
        }
        if let Some(channel) = &overrides.channel {
            figment = figment.merge(("connection.channel", channel));
        }
        if let Some(device) = &overrides.device {
            figment = figment.merge(("connection.device", device));
        }
        if let Some(password) = &overrides.password {
            figment = figment.merge(("connection.password", password));
        }
        if let Some(subscriptions) = &overrides.subscriptions {
            figment = figment.merge(("connection.subscriptions", subscriptions));
        }
        if let Some(verbose) = overrides.verbose {
            figment = figment.merge(("cli.verbose", verbose));
        }
        if let Some(timeout) = overrides.connect_timeout_secs {
            figment = figment.merge(("cli.connect_timeout_secs", timeout));
        }
        figment
    }

    /// Save configuration to a specific file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    ConfigError::FileSystem(format!("Failed to create config directory: {}", e))
                })?;
            }
        }

        let toml_string = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::Serialization(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path.as_ref(), toml_string)
            .map_err(|e| ConfigError::FileSystem(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    /// Validate the configuration for consistency and correctness
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.connection
            .validate()
            .map_err(|e| ConfigError::Validation(e.to_string()))?;

        if self.cli.connect_timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "Connect timeout must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.cli.connect_timeout_secs)
    }

    pub fn reply_window(&self) -> Duration {
        Duration::from_millis(self.cli.reply_window_ms)
    }
}

// ----------------------------------------------------------------------------
// Error Types
// ----------------------------------------------------------------------------

/// Configuration-related errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration loading error: {0}")]
    Loading(String),

    #[error("Configuration validation error: {0}")]
    Validation(String),

    #[error("File system error: {0}")]
    FileSystem(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = CliAppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.cli.prompt, "mewa> ");
        assert!(config.connection.subscriptions.subscribes_to_all());
        assert_eq!(config.connect_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn test_config_validation() {
        let mut config = CliAppConfig::default();
        config.cli.connect_timeout_secs = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));

        let mut config = CliAppConfig::default();
        config.connection.endpoint = "ftp://localhost".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_overrides_win_over_defaults() {
        let overrides = ConfigOverrides {
            endpoint: Some("wss://example.net/ws".to_string()),
            subscriptions: Some(vec!["alarm.".to_string()]),
            verbose: Some(true),
            connect_timeout_secs: Some(3),
            ..Default::default()
        };
        let figment = CliAppConfig::apply_overrides(
            Figment::new().merge(Serialized::defaults(CliAppConfig::default())),
            &overrides,
        );
        let config: CliAppConfig = figment.extract().unwrap();

        assert_eq!(config.connection.endpoint, "wss://example.net/ws");
        assert_eq!(config.connection.subscriptions.prefixes(), &["alarm.".to_string()]);
        assert_eq!(config.connection.device, "mewa-cli");
        assert!(config.cli.verbose);
        assert_eq!(config.cli.connect_timeout_secs, 3);
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let result = CliAppConfig::load(
            Some(Path::new("/nonexistent/mewa/config.toml")),
            &ConfigOverrides::default(),
        );
        assert!(matches!(result, Err(ConfigError::FileSystem(_))));
    }
}
