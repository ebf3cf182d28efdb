//! Mewa Core Protocol Implementation
//!
//! This crate provides the wire types, the JSON codec, the connection descriptor and the
//! capability interfaces (listener, activity guard) shared by the Mewa channel client.
//! It holds no I/O and no runtime state; the session engine lives in `mewa-client`.

// ----------------------------------------------------------------------------
// Module Declarations
// ----------------------------------------------------------------------------

pub mod activity;
pub mod config;
pub mod errors;
pub mod listener;
pub mod protocol;
pub mod subscription;

// ----------------------------------------------------------------------------
// Public API
// ----------------------------------------------------------------------------

pub use activity::{ActivityGuard, ActivityScope, NoopActivityGuard};
pub use config::ConnectionConfig;
pub use errors::{ChannelError, DecodeError, ProtocolError, Result};
pub use listener::{ChannelListener, ErrorReason};
pub use protocol::{
    codec, InboundFrame, LastEvent, OutboundCommand, SessionEffect, SessionEvent, SessionState,
    StateTransitionError,
};
pub use subscription::SubscriptionSpec;
