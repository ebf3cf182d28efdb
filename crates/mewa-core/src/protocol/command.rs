//! Outbound (client → server) commands

use serde::{Deserialize, Serialize};

use crate::subscription::SubscriptionSpec;

// ----------------------------------------------------------------------------
// Outbound Command
// ----------------------------------------------------------------------------

/// Command sent from this device to the channel
///
/// Each variant maps to exactly one wire frame shape, discriminated by `type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum OutboundCommand {
    /// Join the channel
    Connect {
        channel: String,
        device: String,
        password: String,
        subscribe: Vec<String>,
    },
    /// Leave the channel
    Disconnect,
    /// Ask for the list of devices currently in the channel
    GetDevices,
    /// Ask for the most recent events, filtered by device and event prefix
    GetLastEvents {
        device: String,
        #[serde(rename = "eventPrefix")]
        event_prefix: String,
    },
    /// Broadcast an event to subscribed devices
    SendEvent { id: String, ack: bool, params: String },
    /// Send a message to a single device
    SendMessage {
        device: String,
        id: String,
        params: String,
    },
}

impl OutboundCommand {
    /// Build the join command for a channel
    pub fn connect(
        channel: impl Into<String>,
        device: impl Into<String>,
        password: impl Into<String>,
        subscriptions: &SubscriptionSpec,
    ) -> Self {
        OutboundCommand::Connect {
            channel: channel.into(),
            device: device.into(),
            password: password.into(),
            subscribe: subscriptions.to_wire(),
        }
    }

    /// Build a last-events query; empty strings mean "any"
    pub fn get_last_events(device: impl Into<String>, event_prefix: impl Into<String>) -> Self {
        OutboundCommand::GetLastEvents {
            device: device.into(),
            event_prefix: event_prefix.into(),
        }
    }

    pub fn send_event(id: impl Into<String>, params: impl Into<String>, ack: bool) -> Self {
        OutboundCommand::SendEvent {
            id: id.into(),
            ack,
            params: params.into(),
        }
    }

    pub fn send_message(
        to_device: impl Into<String>,
        id: impl Into<String>,
        params: impl Into<String>,
    ) -> Self {
        OutboundCommand::SendMessage {
            device: to_device.into(),
            id: id.into(),
            params: params.into(),
        }
    }

    /// Wire `type` of this command
    pub fn kind(&self) -> &'static str {
        match self {
            OutboundCommand::Connect { .. } => "connect",
            OutboundCommand::Disconnect => "disconnect",
            OutboundCommand::GetDevices => "get-devices",
            OutboundCommand::GetLastEvents { .. } => "get-last-events",
            OutboundCommand::SendEvent { .. } => "send-event",
            OutboundCommand::SendMessage { .. } => "send-message",
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
