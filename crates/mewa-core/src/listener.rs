//! Listener capability
//!
//! A connection delivers channel callbacks to a single registered [`ChannelListener`].
//! Every method has an empty default body, so a host overrides only the callbacks it
//! cares about.

use core::fmt;

use crate::errors::ProtocolError;
use crate::protocol::LastEvent;

// ----------------------------------------------------------------------------
// Error Reason
// ----------------------------------------------------------------------------

/// Why `on_error` was called
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorReason {
    /// Error frame sent by the channel
    Protocol(ProtocolError),
    /// Transport failed mid-session
    Transport(String),
}

impl ErrorReason {
    /// Stable name of the reason; protocol errors use their wire names
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorReason::Protocol(error) => error.wire_name(),
            ErrorReason::Transport(_) => "transport-error",
        }
    }

    pub fn is_fatal(&self) -> bool {
        match self {
            ErrorReason::Protocol(error) => error.is_fatal(),
            ErrorReason::Transport(_) => true,
        }
    }
}

impl From<ProtocolError> for ErrorReason {
    fn from(error: ProtocolError) -> Self {
        ErrorReason::Protocol(error)
    }
}

impl fmt::Display for ErrorReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorReason::Protocol(_) => f.write_str(self.as_str()),
            ErrorReason::Transport(reason) => write!(f, "{}: {}", self.as_str(), reason),
        }
    }
}

// ----------------------------------------------------------------------------
// Listener Trait
// ----------------------------------------------------------------------------

/// Receives channel callbacks, in arrival order, from the connection's reader task
///
/// Callbacks run synchronously on the reader; a slow callback delays every later
/// frame of the same connection.
#[allow(unused_variables)]
pub trait ChannelListener: Send + Sync {
    /// The channel accepted this device
    fn on_connected(&self) {}

    /// The session ended by the channel or the transport
    fn on_closed(&self) {}

    fn on_error(&self, reason: &ErrorReason) {}

    fn on_device_joined_channel(&self, time: &str, device: &str) {}

    fn on_device_left_channel(&self, time: &str, device: &str) {}

    /// Event broadcast by another device matching one of our subscriptions
    fn on_event(&self, time: &str, from_device: &str, id: &str, params: &str) {}

    /// Message addressed to this device
    fn on_message(&self, time: &str, from_device: &str, id: &str, params: &str) {}

    /// Reply to a devices list request
    fn on_devices_event(&self, time: &str, devices: &[String]) {}

    /// Reply to a last-events request
    fn on_last_events(&self, time: &str, events: &[LastEvent]) {}

    /// The channel accepted an event sent with acknowledgment
    fn on_ack(&self) {}
}
