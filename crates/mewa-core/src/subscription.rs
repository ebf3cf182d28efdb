//! Event subscriptions declared at connect time
//!
//! The channel delivers an event to this device only when the event id starts with one
//! of the declared prefixes. Matching happens on the server; the client only transmits
//! the prefix list, in declared order, with the `connect` command.

use serde::{Deserialize, Serialize};

/// Ordered set of event-id prefixes this device wants to receive
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubscriptionSpec {
    prefixes: Vec<String>,
}

impl SubscriptionSpec {
    /// Subscribe to every event (a single empty prefix)
    pub fn all() -> Self {
        Self {
            prefixes: vec![String::new()],
        }
    }

    /// Subscribe to events starting with any of the given prefixes
    pub fn events<I, S>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            prefixes: prefixes.into_iter().map(Into::into).collect(),
        }
    }

    pub fn prefixes(&self) -> &[String] {
        &self.prefixes
    }

    /// No prefixes declared; the channel will deliver no events
    pub fn is_empty(&self) -> bool {
        self.prefixes.is_empty()
    }

    /// Whether the empty prefix is declared
    pub fn subscribes_to_all(&self) -> bool {
        self.prefixes.iter().any(String::is_empty)
    }

    /// Prefix list as sent in the `subscribe` field
    pub fn to_wire(&self) -> Vec<String> {
        self.prefixes.clone()
    }
}

impl<S: Into<String>> FromIterator<S> for SubscriptionSpec {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::events(iter)
    }
}
