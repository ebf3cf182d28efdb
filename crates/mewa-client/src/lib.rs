//! Mewa Channel Client
//!
//! This crate contains the session engine for the Mewa channel protocol:
//! - `ChannelConnection`: owns the transport session and its state machine
//! - `Dispatcher`: routes decoded frames to the registered listener in order
//! - `KeepAliveMonitor`: released-once signal tied to a session
//! - Transports: WebSocket for real channels, in-memory for tests and demos
//!
//! Wire types, the codec and the listener capability live in `mewa-core` and are
//! re-exported here.

pub mod dispatcher;
pub mod events;
pub mod keepalive;
mod manager;
pub mod transport;

pub use dispatcher::{Dispatcher, ListenerPanic};
pub use events::{event_channel, ChannelEvent, EventForwarder};
pub use keepalive::KeepAliveMonitor;
pub use manager::ChannelConnection;
pub use transport::{
    Connector, FrameSink, FrameSource, MemoryAcceptor, MemoryConnector, MemoryPeer,
    TransportEvent, TransportSession, WebSocketConnector,
};

// Re-export core types for convenience
pub use mewa_core::{
    codec, ActivityGuard, ActivityScope, ChannelError, ChannelListener, ConnectionConfig,
    ErrorReason, InboundFrame, LastEvent, NoopActivityGuard, OutboundCommand, ProtocolError,
    Result, SessionState, SubscriptionSpec,
};
