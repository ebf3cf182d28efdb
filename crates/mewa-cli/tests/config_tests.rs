//! Configuration layering tests
//!
//! Each test runs in a figment jail so the working directory and environment
//! variables are private to it.

use std::time::Duration;

use figment::Jail;
use mewa_cli::{CliAppConfig, ConfigError, ConfigOverrides};

const FILE_CONFIG: &str = r#"
[connection]
endpoint = "wss://channels.example.net/ws"
channel = "home.sensors"
device = "kitchen"
password = "pw"
subscriptions = ["alarm.", "door."]
idle_timeout_ms = 30000

[cli]
prompt = "> "
"#;

#[test]
fn test_defaults_without_files() {
    Jail::expect_with(|_jail| {
        let config = CliAppConfig::load(None, &ConfigOverrides::default())
            .map_err(|e| e.to_string())?;
        assert_eq!(config, CliAppConfig::default());
        Ok(())
    });
}

#[test]
fn test_working_directory_file_is_loaded() {
    Jail::expect_with(|jail| {
        jail.create_file("mewa.toml", FILE_CONFIG)?;

        let config = CliAppConfig::load(None, &ConfigOverrides::default())
            .map_err(|e| e.to_string())?;
        assert_eq!(config.connection.endpoint, "wss://channels.example.net/ws");
        assert_eq!(config.connection.channel, "home.sensors");
        assert_eq!(
            config.connection.subscriptions.prefixes(),
            &["alarm.".to_string(), "door.".to_string()]
        );
        assert_eq!(config.connection.idle_timeout, Duration::from_secs(30));
        assert_eq!(config.cli.prompt, "> ");
        assert_eq!(config.cli.connect_timeout_secs, 10);
        Ok(())
    });
}

#[test]
fn test_environment_overrides_file_and_cli_overrides_environment() {
    Jail::expect_with(|jail| {
        jail.create_file("mewa.toml", FILE_CONFIG)?;
        jail.set_env("MEWA_CONNECTION__CHANNEL", "home.lights");
        jail.set_env("MEWA_CONNECTION__DEVICE", "hallway");
        jail.set_env("MEWA_CLI__CONNECT_TIMEOUT_SECS", "7");

        let overrides = ConfigOverrides {
            device: Some("porch".to_string()),
            ..Default::default()
        };
        let config = CliAppConfig::load(None, &overrides).map_err(|e| e.to_string())?;

        assert_eq!(config.connection.channel, "home.lights");
        assert_eq!(config.connection.device, "porch");
        assert_eq!(config.connection.password, "pw");
        assert_eq!(config.cli.connect_timeout_secs, 7);
        Ok(())
    });
}

#[test]
fn test_explicit_file_overrides_working_directory_file() {
    Jail::expect_with(|jail| {
        jail.create_file("mewa.toml", FILE_CONFIG)?;
        jail.create_file(
            "other.toml",
            "[connection]\nchannel = \"office\"\nsubscriptions = [\"\"]\n",
        )?;

        let config = CliAppConfig::load(
            Some(&jail.directory().join("other.toml")),
            &ConfigOverrides::default(),
        )
        .map_err(|e| e.to_string())?;

        assert_eq!(config.connection.channel, "office");
        assert_eq!(config.connection.device, "kitchen");
        assert!(config.connection.subscriptions.subscribes_to_all());
        Ok(())
    });
}

#[test]
fn test_invalid_layered_config_is_rejected() {
    Jail::expect_with(|jail| {
        jail.set_env("MEWA_CONNECTION__ENDPOINT", "http://localhost/ws");

        let result = CliAppConfig::load(None, &ConfigOverrides::default());
        assert!(matches!(result, Err(ConfigError::Validation(_))));
        Ok(())
    });
}

#[test]
fn test_save_and_reload() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("mewa.toml");

    let mut config = CliAppConfig::default();
    config.connection.channel = "garage".to_string();
    config.connection.idle_timeout = Duration::from_millis(1500);
    config.cli.reply_window_ms = 500;

    config.save_to_file(&path).unwrap();
    let loaded = CliAppConfig::load_from_file(&path).unwrap();

    assert_eq!(loaded, config);
}
