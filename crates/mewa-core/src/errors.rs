//! Error types for the Mewa channel protocol
//!
//! This module contains the error taxonomy used throughout the client: connection
//! establishment failures, server-reported protocol errors, mid-session transport
//! failures and inbound decode failures, unified under [`ChannelError`].

use thiserror::Error;

use crate::protocol::StateTransitionError;

// ----------------------------------------------------------------------------
// Specific Error Types
// ----------------------------------------------------------------------------

/// Errors reported by the channel server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum ProtocolError {
    #[error("device is already connected to the channel")]
    AlreadyConnected,
    #[error("channel rejected the credentials")]
    Authorization,
    #[error("device is not connected to the channel")]
    NotConnected,
}

impl ProtocolError {
    /// Frame type the server uses to report this error
    pub fn wire_name(&self) -> &'static str {
        match self {
            ProtocolError::AlreadyConnected => "already-connected-error",
            ProtocolError::Authorization => "authorization-error",
            ProtocolError::NotConnected => "not-connected-error",
        }
    }

    /// Whether the session must be torn down after reporting this error
    pub fn is_fatal(&self) -> bool {
        matches!(self, ProtocolError::Authorization)
    }
}

/// Inbound payload could not be turned into a frame
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Malformed frame: {0}")]
    Malformed(#[source] serde_json::Error),

    #[error("Frame is not a JSON object")]
    NotAnObject,

    #[error("Frame has no string `type` field")]
    MissingType,

    #[error("Invalid `{kind}` frame: {source}")]
    InvalidFields {
        kind: String,
        #[source]
        source: serde_json::Error,
    },
}

// ----------------------------------------------------------------------------
// Channel Error
// ----------------------------------------------------------------------------

/// Core error type for the Mewa channel client
#[derive(Debug, Error)]
pub enum ChannelError {
    /// Transport session could not be established
    #[error("Failed to connect to {endpoint}: {reason}")]
    Connection { endpoint: String, reason: String },

    /// Server-reported error
    #[error("Channel error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Unexpected mid-session transport failure or failed write
    #[error("Transport error: {reason}")]
    Transport { reason: String },

    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Outbound request issued while the channel has not acknowledged the session
    #[error("Not connected to the channel")]
    NotConnected,

    #[error("State transition error: {0}")]
    StateTransition(#[from] StateTransitionError),

    #[error("Configuration error: {reason}")]
    Configuration { reason: String },
}

// ----------------------------------------------------------------------------
// Convenience Error Constructors
// ----------------------------------------------------------------------------

impl ChannelError {
    /// Create a connection failed error
    pub fn connection_failed<E: Into<String>, R: Into<String>>(endpoint: E, reason: R) -> Self {
        ChannelError::Connection {
            endpoint: endpoint.into(),
            reason: reason.into(),
        }
    }

    /// Create a transport error with a reason
    pub fn transport<R: Into<String>>(reason: R) -> Self {
        ChannelError::Transport {
            reason: reason.into(),
        }
    }

    /// Create a configuration error with a reason
    pub fn config_error<R: Into<String>>(reason: R) -> Self {
        ChannelError::Configuration {
            reason: reason.into(),
        }
    }
}

// ----------------------------------------------------------------------------
// Type Aliases
// ----------------------------------------------------------------------------

pub type Result<T> = core::result::Result<T, ChannelError>;

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
