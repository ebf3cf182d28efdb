//! Channel Session State Machine
//!
//! Tracks one connection's progress from opening the transport to the channel's
//! `connected` acknowledgment and back. Transitions consume the current state and
//! reject events that are not valid for it.

use core::fmt;

use serde::{Deserialize, Serialize};

// ----------------------------------------------------------------------------
// Session State Types
// ----------------------------------------------------------------------------

/// Lifecycle of a channel session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionState {
    /// No transport session exists
    #[default]
    Disconnected,
    /// Transport session is being established
    Opening,
    /// Transport is open and the `connect` command was written
    AwaitingAck,
    /// The channel acknowledged this device
    Connected,
}

/// Events that drive session state transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// `connect()` started opening a transport session
    OpenRequested,
    /// Transport is open and the join command was written
    TransportOpened,
    /// Channel sent `connected`
    ConnectedAck,
    /// Session torn down for any reason
    Closed,
}

// ----------------------------------------------------------------------------
// State Machine Implementation
// ----------------------------------------------------------------------------

impl SessionState {
    /// Get current state name for logging
    pub fn state_name(&self) -> &'static str {
        match self {
            SessionState::Disconnected => "Disconnected",
            SessionState::Opening => "Opening",
            SessionState::AwaitingAck => "AwaitingAck",
            SessionState::Connected => "Connected",
        }
    }

    /// Process an event and return the next state
    pub fn transition(self, event: SessionEvent) -> Result<SessionState, StateTransitionError> {
        match (self, event) {
            (SessionState::Disconnected, SessionEvent::OpenRequested) => Ok(SessionState::Opening),
            (SessionState::Opening, SessionEvent::TransportOpened) => Ok(SessionState::AwaitingAck),
            (SessionState::AwaitingAck, SessionEvent::ConnectedAck) => Ok(SessionState::Connected),
            // A repeated acknowledgment keeps the session connected
            (SessionState::Connected, SessionEvent::ConnectedAck) => Ok(SessionState::Connected),
            (_, SessionEvent::Closed) => Ok(SessionState::Disconnected),
            (state, event) => Err(StateTransitionError::InvalidTransition {
                from_state: state.state_name(),
                event,
            }),
        }
    }

    /// Check if outbound requests may be written
    pub fn can_send(&self) -> bool {
        matches!(self, SessionState::Connected)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.state_name())
    }
}

// ----------------------------------------------------------------------------
// Error Types
// ----------------------------------------------------------------------------

/// Errors that can occur during state transitions
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StateTransitionError {
    #[error("Invalid transition from {from_state} on event {event:?}")]
    InvalidTransition {
        from_state: &'static str,
        event: SessionEvent,
    },
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state() {
        let state = SessionState::default();
        assert_eq!(state, SessionState::Disconnected);
        assert!(!state.can_send());
    }

    #[test]
    fn test_full_lifecycle() {
        let state = SessionState::Disconnected
            .transition(SessionEvent::OpenRequested)
            .unwrap();
        assert_eq!(state, SessionState::Opening);
        assert!(!state.can_send());

        let state = state.transition(SessionEvent::TransportOpened).unwrap();
        assert_eq!(state, SessionState::AwaitingAck);
        assert!(!state.can_send());

        let state = state.transition(SessionEvent::ConnectedAck).unwrap();
        assert_eq!(state, SessionState::Connected);
        assert!(state.can_send());

        let state = state.transition(SessionEvent::Closed).unwrap();
        assert_eq!(state, SessionState::Disconnected);
    }

    #[test]
    fn test_close_from_any_state() {
        for state in [
            SessionState::Disconnected,
            SessionState::Opening,
            SessionState::AwaitingAck,
            SessionState::Connected,
        ] {
            assert_eq!(
                state.transition(SessionEvent::Closed).unwrap(),
                SessionState::Disconnected
            );
        }
    }

    #[test]
    fn test_ack_without_session_is_rejected() {
        let result = SessionState::Disconnected.transition(SessionEvent::ConnectedAck);
        assert_eq!(
            result,
            Err(StateTransitionError::InvalidTransition {
                from_state: "Disconnected",
                event: SessionEvent::ConnectedAck,
            })
        );
    }

    #[test]
    fn test_open_while_open_is_rejected() {
        assert!(SessionState::AwaitingAck
            .transition(SessionEvent::OpenRequested)
            .is_err());
        assert!(SessionState::Connected
            .transition(SessionEvent::OpenRequested)
            .is_err());
    }
}
