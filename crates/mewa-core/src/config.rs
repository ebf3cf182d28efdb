//! Connection Configuration
//!
//! Everything needed to open one channel session. A config is immutable for the
//! lifetime of a session; the connection manager may swap it between sessions.

use core::fmt;
use core::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::errors::ChannelError;
use crate::protocol::OutboundCommand;
use crate::subscription::SubscriptionSpec;
use crate::Result;

// ----------------------------------------------------------------------------
// Connection Configuration
// ----------------------------------------------------------------------------

/// Endpoint, credentials and subscriptions for a channel session
#[derive(Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// WebSocket URL of the channel server (`ws://` or `wss://`)
    pub endpoint: String,
    /// Channel name, e.g. `user.channel1`
    pub channel: String,
    /// Name this device uses inside the channel
    pub device: String,
    pub password: String,
    /// Event-id prefixes sent with the `connect` command
    pub subscriptions: SubscriptionSpec,
    /// Close the session after this long without traffic; zero disables
    #[serde(rename = "idle_timeout_ms", with = "duration_millis")]
    pub idle_timeout: Duration,
}

impl ConnectionConfig {
    pub fn new(
        endpoint: impl Into<String>,
        channel: impl Into<String>,
        device: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            channel: channel.into(),
            device: device.into(),
            password: password.into(),
            subscriptions: SubscriptionSpec::default(),
            idle_timeout: Duration::ZERO,
        }
    }

    pub fn with_subscriptions(mut self, subscriptions: SubscriptionSpec) -> Self {
        self.subscriptions = subscriptions;
        self
    }

    pub fn with_idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    pub fn idle_timeout_enabled(&self) -> bool {
        !self.idle_timeout.is_zero()
    }

    /// Join command for this configuration
    pub fn connect_command(&self) -> OutboundCommand {
        OutboundCommand::connect(
            self.channel.as_str(),
            self.device.as_str(),
            self.password.as_str(),
            &self.subscriptions,
        )
    }

    /// Check the configuration can be used to open a session
    pub fn validate(&self) -> Result<()> {
        if self.endpoint.trim().is_empty() {
            return Err(ChannelError::config_error("endpoint must not be empty"));
        }
        if self.channel.trim().is_empty() {
            return Err(ChannelError::config_error("channel must not be empty"));
        }
        if self.device.trim().is_empty() {
            return Err(ChannelError::config_error("device must not be empty"));
        }

        let url = Url::parse(&self.endpoint).map_err(|e| {
            ChannelError::config_error(format!("invalid endpoint {}: {}", self.endpoint, e))
        })?;
        match url.scheme() {
            "ws" | "wss" => Ok(()),
            other => Err(ChannelError::config_error(format!(
                "endpoint scheme must be ws or wss, got {}",
                other
            ))),
        }
    }
}

// Password stays out of logs
impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("endpoint", &self.endpoint)
            .field("channel", &self.channel)
            .field("device", &self.device)
            .field("password", &"<redacted>")
            .field("subscriptions", &self.subscriptions)
            .field("idle_timeout", &self.idle_timeout)
            .finish()
    }
}

mod duration_millis {
    use core::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
