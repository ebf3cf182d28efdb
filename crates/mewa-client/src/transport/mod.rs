//! Transport abstraction for channel sessions
//!
//! A [`Connector`] opens one full-duplex text session and hands back its two halves:
//! a [`FrameSink`] the connection manager writes commands through, and a
//! [`FrameSource`] owned by the session's reader task. The WebSocket implementation
//! is used in production; the in-memory one drives tests and demos without sockets.

use async_trait::async_trait;

use mewa_core::Result;

pub mod memory;
pub mod websocket;

pub use memory::{MemoryAcceptor, MemoryConnector, MemoryPeer};
pub use websocket::WebSocketConnector;

// ----------------------------------------------------------------------------
// Transport Events
// ----------------------------------------------------------------------------

/// What the inbound half of a session produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// One complete text frame
    Text(String),
    /// Session ended by the peer or the network
    Closed,
    /// Session failed; the transport is unusable
    Error(String),
}

// ----------------------------------------------------------------------------
// Transport Traits
// ----------------------------------------------------------------------------

/// Outbound half of a transport session
#[async_trait]
pub trait FrameSink: Send {
    /// Write one text frame, returning once the write completed
    async fn send_text(&mut self, text: String) -> Result<()>;

    /// Close the session; later writes fail
    async fn close(&mut self) -> Result<()>;
}

/// Inbound half of a transport session
///
/// `next_event` must be cancel safe: the reader races it against shutdown and the
/// idle deadline and may drop the future before it completes.
#[async_trait]
pub trait FrameSource: Send {
    async fn next_event(&mut self) -> TransportEvent;
}

/// Both halves of an open session
pub struct TransportSession {
    pub sink: Box<dyn FrameSink>,
    pub source: Box<dyn FrameSource>,
}

impl TransportSession {
    pub fn new(sink: Box<dyn FrameSink>, source: Box<dyn FrameSource>) -> Self {
        Self { sink, source }
    }
}

/// Opens transport sessions to a channel endpoint
#[async_trait]
pub trait Connector: Send + Sync {
    /// Establish a session; failures are reported as `ChannelError::Connection`
    async fn open(&self, endpoint: &str) -> Result<TransportSession>;
}
