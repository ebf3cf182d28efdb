//! Inbound (server → client) frames

use serde::{Deserialize, Serialize};

use crate::errors::ProtocolError;

// ----------------------------------------------------------------------------
// Frame Payloads
// ----------------------------------------------------------------------------

/// One entry of a `last-events` reply
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastEvent {
    /// ISO 8601 time the event was processed by the channel
    pub time: String,
    /// Device that sent the event
    pub device: String,
    /// Event id
    pub id: String,
    /// Opaque event parameters
    pub params: String,
}

impl LastEvent {
    pub fn new(
        time: impl Into<String>,
        device: impl Into<String>,
        id: impl Into<String>,
        params: impl Into<String>,
    ) -> Self {
        Self {
            time: time.into(),
            device: device.into(),
            id: id.into(),
            params: params.into(),
        }
    }
}

// ----------------------------------------------------------------------------
// Inbound Frame
// ----------------------------------------------------------------------------

/// Frame received from the channel, discriminated by its `type` field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum InboundFrame {
    /// The channel accepted this device
    Connected,
    /// The channel ended the session
    Disconnected,
    AlreadyConnectedError,
    AuthorizationError,
    NotConnectedError,
    JoinedChannel {
        time: String,
        device: String,
    },
    LeftChannel {
        time: String,
        device: String,
    },
    Event {
        time: String,
        device: String,
        id: String,
        params: String,
    },
    Message {
        time: String,
        device: String,
        id: String,
        params: String,
    },
    DevicesEvent {
        time: String,
        devices: Vec<String>,
    },
    LastEvents {
        time: String,
        events: Vec<LastEvent>,
    },
    /// The channel accepted an event sent with `ack: true`
    Ack,
    /// Frame with a `type` this client does not know; ignored
    #[serde(skip)]
    Unrecognized { kind: String },
}

/// What the connection manager must do with its session around dispatching a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEffect {
    /// Dispatch only
    None,
    /// Move to `Connected` before dispatching
    MarkConnected,
    /// Dispatch, then tear the session down
    CloseAfterDispatch,
}

impl InboundFrame {
    /// Wire `type` of this frame
    pub fn kind(&self) -> &str {
        match self {
            InboundFrame::Connected => "connected",
            InboundFrame::Disconnected => "disconnected",
            InboundFrame::AlreadyConnectedError => "already-connected-error",
            InboundFrame::AuthorizationError => "authorization-error",
            InboundFrame::NotConnectedError => "not-connected-error",
            InboundFrame::JoinedChannel { .. } => "joined-channel",
            InboundFrame::LeftChannel { .. } => "left-channel",
            InboundFrame::Event { .. } => "event",
            InboundFrame::Message { .. } => "message",
            InboundFrame::DevicesEvent { .. } => "devices-event",
            InboundFrame::LastEvents { .. } => "last-events",
            InboundFrame::Ack => "ack",
            InboundFrame::Unrecognized { kind } => kind,
        }
    }

    /// Server-reported error carried by this frame, if any
    pub fn protocol_error(&self) -> Option<ProtocolError> {
        match self {
            InboundFrame::AlreadyConnectedError => Some(ProtocolError::AlreadyConnected),
            InboundFrame::AuthorizationError => Some(ProtocolError::Authorization),
            InboundFrame::NotConnectedError => Some(ProtocolError::NotConnected),
            _ => None,
        }
    }

    pub fn session_effect(&self) -> SessionEffect {
        match self {
            InboundFrame::Connected => SessionEffect::MarkConnected,
            InboundFrame::Disconnected | InboundFrame::AuthorizationError => {
                SessionEffect::CloseAfterDispatch
            }
            _ => SessionEffect::None,
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_effects() {
        assert_eq!(InboundFrame::Connected.session_effect(), SessionEffect::MarkConnected);
        assert_eq!(
            InboundFrame::Disconnected.session_effect(),
            SessionEffect::CloseAfterDispatch
        );
        assert_eq!(
            InboundFrame::AuthorizationError.session_effect(),
            SessionEffect::CloseAfterDispatch
        );
        assert_eq!(
            InboundFrame::AlreadyConnectedError.session_effect(),
            SessionEffect::None
        );
        assert_eq!(InboundFrame::Ack.session_effect(), SessionEffect::None);
    }

    #[test]
    fn test_protocol_error_mapping() {
        assert_eq!(
            InboundFrame::NotConnectedError.protocol_error(),
            Some(ProtocolError::NotConnected)
        );
        assert_eq!(InboundFrame::Connected.protocol_error(), None);
    }

    #[test]
    fn test_unrecognized_kind_is_preserved() {
        let frame = InboundFrame::Unrecognized {
            kind: "presence".to_string(),
        };
        assert_eq!(frame.kind(), "presence");
        assert_eq!(frame.session_effect(), SessionEffect::None);
    }
}
