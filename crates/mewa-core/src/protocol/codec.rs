//! JSON wire codec
//!
//! Every wire frame is a single JSON object whose `type` field names its shape.
//! The codec is stateless: commands are encoded to text and inbound text is decoded to
//! typed frames. Unknown inbound `type` values decode to [`InboundFrame::Unrecognized`]
//! so newer servers can add frame types without breaking older clients.

use serde::de::DeserializeOwned;
use serde_json::Value;

use super::command::OutboundCommand;
use super::frame::InboundFrame;
use crate::errors::DecodeError;
use crate::Result;

// ----------------------------------------------------------------------------
// Constants
// ----------------------------------------------------------------------------

/// Name of the discriminator field in every frame
pub const TYPE_FIELD: &str = "type";

/// Inbound frame types this client understands
pub const INBOUND_TYPES: &[&str] = &[
    "connected",
    "disconnected",
    "already-connected-error",
    "authorization-error",
    "not-connected-error",
    "joined-channel",
    "left-channel",
    "event",
    "message",
    "devices-event",
    "last-events",
    "ack",
];

// ----------------------------------------------------------------------------
// Client Side
// ----------------------------------------------------------------------------

/// Encode an outbound command to wire text
pub fn encode(command: &OutboundCommand) -> Result<String> {
    Ok(serde_json::to_string(command)?)
}

/// Decode wire text received from the channel
pub fn decode(text: &str) -> core::result::Result<InboundFrame, DecodeError> {
    let (kind, value) = split_type(text)?;
    if !INBOUND_TYPES.contains(&kind.as_str()) {
        return Ok(InboundFrame::Unrecognized { kind });
    }
    from_typed_value(kind, value)
}

// ----------------------------------------------------------------------------
// Server Side
// ----------------------------------------------------------------------------

/// Encode an inbound frame the way the channel sends it
///
/// Used by in-process peers and tests. [`InboundFrame::Unrecognized`] has no wire shape
/// and fails to encode.
pub fn encode_frame(frame: &InboundFrame) -> Result<String> {
    Ok(serde_json::to_string(frame)?)
}

/// Decode wire text written by a client, the way the channel reads it
pub fn decode_command(text: &str) -> core::result::Result<OutboundCommand, DecodeError> {
    let (kind, value) = split_type(text)?;
    from_typed_value(kind, value)
}

// ----------------------------------------------------------------------------
// Helpers
// ----------------------------------------------------------------------------

fn split_type(text: &str) -> core::result::Result<(String, Value), DecodeError> {
    let value: Value = serde_json::from_str(text).map_err(DecodeError::Malformed)?;
    let kind = match value.as_object() {
        Some(object) => match object.get(TYPE_FIELD) {
            Some(Value::String(kind)) => kind.clone(),
            _ => return Err(DecodeError::MissingType),
        },
        None => return Err(DecodeError::NotAnObject),
    };
    Ok((kind, value))
}

fn from_typed_value<T: DeserializeOwned>(
    kind: String,
    value: Value,
) -> core::result::Result<T, DecodeError> {
    serde_json::from_value(value).map_err(|source| DecodeError::InvalidFields { kind, source })
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
