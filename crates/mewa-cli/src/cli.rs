//! Command-line interface definitions and parsing

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::ConfigOverrides;

#[derive(Parser, Debug)]
#[command(author, version, about = "Mewa channel client", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Channel server URL (ws:// or wss://)
    #[arg(long, global = true)]
    pub endpoint: Option<String>,

    /// Channel name
    #[arg(long, global = true)]
    pub channel: Option<String>,

    /// Name of this device in the channel
    #[arg(long, global = true)]
    pub device: Option<String>,

    /// Channel password
    #[arg(long, global = true)]
    pub password: Option<String>,

    /// Event-id prefix to subscribe to; repeat for several, "" for all
    #[arg(long = "subscribe", value_name = "PREFIX", global = true)]
    pub subscribe: Vec<String>,

    /// Seconds to wait for the channel to accept the device
    #[arg(long, value_name = "SECS", global = true)]
    pub timeout: Option<u64>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Connect and print every channel callback until the session closes
    Listen,
    /// Broadcast an event to subscribed devices
    SendEvent {
        /// Event id
        id: String,
        /// Event parameters
        #[arg(default_value = "")]
        params: String,
        /// Ask the channel to acknowledge the event
        #[arg(long)]
        ack: bool,
    },
    /// Send a message to one device
    SendMessage {
        /// Receiving device
        #[arg(value_name = "DEVICE")]
        to_device: String,
        /// Message id
        id: String,
        /// Message parameters
        #[arg(default_value = "")]
        params: String,
    },
    /// List the devices joined to the channel
    Devices,
    /// Show the most recent events stored by the channel
    LastEvents {
        /// Only events sent by this device
        #[arg(long, default_value = "")]
        from_device: String,
        /// Only events whose id starts with this prefix
        #[arg(long, default_value = "")]
        prefix: String,
    },
    /// Read commands from stdin while printing channel callbacks
    Interactive,
    /// Write a configuration file with the current settings
    InitConfig {
        /// Where to write the file
        #[arg(default_value = "mewa.toml")]
        path: PathBuf,
        /// Replace an existing file
        #[arg(long)]
        force: bool,
    },
}

impl Cli {
    /// Settings given on the command line, applied over files and environment
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            endpoint: self.endpoint.clone(),
            channel: self.channel.clone(),
            device: self.device.clone(),
            password: self.password.clone(),
            subscriptions: if self.subscribe.is_empty() {
                None
            } else {
                Some(self.subscribe.clone())
            },
            verbose: self.verbose.then_some(true),
            connect_timeout_secs: self.timeout,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_send_message_with_globals() {
        let cli = Cli::try_parse_from([
            "mewa",
            "send-message",
            "dev2",
            "m.ping",
            "{}",
            "--endpoint",
            "ws://localhost/ws",
            "--subscribe",
            "a.",
            "--subscribe",
            "b.",
        ])
        .unwrap();

        assert_eq!(
            cli.command,
            Commands::SendMessage {
                to_device: "dev2".to_string(),
                id: "m.ping".to_string(),
                params: "{}".to_string(),
            }
        );
        let overrides = cli.overrides();
        assert_eq!(overrides.endpoint.as_deref(), Some("ws://localhost/ws"));
        assert_eq!(
            overrides.subscriptions,
            Some(vec!["a.".to_string(), "b.".to_string()])
        );
        assert_eq!(overrides.verbose, None);
    }

    #[test]
    fn test_parse_last_events_filters() {
        let cli = Cli::try_parse_from([
            "mewa",
            "--device",
            "me",
            "last-events",
            "--from-device",
            "dev2",
        ])
        .unwrap();

        assert_eq!(
            cli.command,
            Commands::LastEvents {
                from_device: "dev2".to_string(),
                prefix: String::new(),
            }
        );
        assert_eq!(cli.device.as_deref(), Some("me"));
    }

    #[test]
    fn test_parse_send_event_ack() {
        let cli = Cli::try_parse_from(["mewa", "-v", "send-event", "light.on", "--ack"]).unwrap();
        assert_eq!(
            cli.command,
            Commands::SendEvent {
                id: "light.on".to_string(),
                params: String::new(),
                ack: true,
            }
        );
        assert_eq!(cli.overrides().verbose, Some(true));
    }
}
