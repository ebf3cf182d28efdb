//! Mewa wire protocol
//!
//! Outbound commands, inbound frames, the JSON codec between them and the wire text,
//! and the session state machine driven by the connection manager.

pub mod codec;
pub mod command;
pub mod frame;
pub mod session_state;

pub use command::OutboundCommand;
pub use frame::{InboundFrame, LastEvent, SessionEffect};
pub use session_state::{SessionEvent, SessionState, StateTransitionError};
