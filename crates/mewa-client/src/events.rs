//! Channel callbacks as an event stream
//!
//! [`EventForwarder`] is a listener that turns each callback into an owned
//! [`ChannelEvent`] and pushes it into an unbounded channel, so hosts can consume a
//! connection with `recv().await` instead of implementing [`ChannelListener`].

use core::fmt;
use std::sync::Arc;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::trace;

use mewa_core::{ChannelListener, ErrorReason, LastEvent};

/// One listener callback with owned arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    Connected,
    Closed,
    Error(ErrorReason),
    DeviceJoined {
        time: String,
        device: String,
    },
    DeviceLeft {
        time: String,
        device: String,
    },
    Event {
        time: String,
        from_device: String,
        id: String,
        params: String,
    },
    Message {
        time: String,
        from_device: String,
        id: String,
        params: String,
    },
    Devices {
        time: String,
        devices: Vec<String>,
    },
    LastEvents {
        time: String,
        events: Vec<LastEvent>,
    },
    Ack,
}

impl ChannelEvent {
    /// Whether the session ended with this event
    pub fn ends_session(&self) -> bool {
        match self {
            ChannelEvent::Closed => true,
            ChannelEvent::Error(reason) => reason.is_fatal(),
            _ => false,
        }
    }
}

impl fmt::Display for ChannelEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelEvent::Connected => write!(f, "connected"),
            ChannelEvent::Closed => write!(f, "closed"),
            ChannelEvent::Error(reason) => write!(f, "error {}", reason),
            ChannelEvent::DeviceJoined { time, device } => {
                write!(f, "[{}] {} joined the channel", time, device)
            }
            ChannelEvent::DeviceLeft { time, device } => {
                write!(f, "[{}] {} left the channel", time, device)
            }
            ChannelEvent::Event {
                time,
                from_device,
                id,
                params,
            } => write!(f, "[{}] event {} from {}: {}", time, id, from_device, params),
            ChannelEvent::Message {
                time,
                from_device,
                id,
                params,
            } => write!(f, "[{}] message {} from {}: {}", time, id, from_device, params),
            ChannelEvent::Devices { time, devices } => {
                write!(f, "[{}] devices: {}", time, devices.join(", "))
            }
            ChannelEvent::LastEvents { time, events } => {
                write!(f, "[{}] {} last events", time, events.len())?;
                for event in events {
                    write!(
                        f,
                        "\n  [{}] {} from {}: {}",
                        event.time, event.id, event.device, event.params
                    )?;
                }
                Ok(())
            }
            ChannelEvent::Ack => write!(f, "ack"),
        }
    }
}

// ----------------------------------------------------------------------------
// Event Forwarder
// ----------------------------------------------------------------------------

/// Listener forwarding every callback, in order, into a channel
#[derive(Debug, Clone)]
pub struct EventForwarder {
    sender: UnboundedSender<ChannelEvent>,
}

impl EventForwarder {
    pub fn new(sender: UnboundedSender<ChannelEvent>) -> Self {
        Self { sender }
    }

    fn forward(&self, event: ChannelEvent) {
        if self.sender.send(event).is_err() {
            trace!("Event receiver dropped, discarding callback");
        }
    }
}

/// Forwarder ready to register with a connection, plus its receiving end
pub fn event_channel() -> (Arc<EventForwarder>, UnboundedReceiver<ChannelEvent>) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (Arc::new(EventForwarder::new(sender)), receiver)
}

impl ChannelListener for EventForwarder {
    fn on_connected(&self) {
        self.forward(ChannelEvent::Connected);
    }

    fn on_closed(&self) {
        self.forward(ChannelEvent::Closed);
    }

    fn on_error(&self, reason: &ErrorReason) {
        self.forward(ChannelEvent::Error(reason.clone()));
    }

    fn on_device_joined_channel(&self, time: &str, device: &str) {
        self.forward(ChannelEvent::DeviceJoined {
            time: time.to_string(),
            device: device.to_string(),
        });
    }

    fn on_device_left_channel(&self, time: &str, device: &str) {
        self.forward(ChannelEvent::DeviceLeft {
            time: time.to_string(),
            device: device.to_string(),
        });
    }

    fn on_event(&self, time: &str, from_device: &str, id: &str, params: &str) {
        self.forward(ChannelEvent::Event {
            time: time.to_string(),
            from_device: from_device.to_string(),
            id: id.to_string(),
            params: params.to_string(),
        });
    }

    fn on_message(&self, time: &str, from_device: &str, id: &str, params: &str) {
        self.forward(ChannelEvent::Message {
            time: time.to_string(),
            from_device: from_device.to_string(),
            id: id.to_string(),
            params: params.to_string(),
        });
    }

    fn on_devices_event(&self, time: &str, devices: &[String]) {
        self.forward(ChannelEvent::Devices {
            time: time.to_string(),
            devices: devices.to_vec(),
        });
    }

    fn on_last_events(&self, time: &str, events: &[LastEvent]) {
        self.forward(ChannelEvent::LastEvents {
            time: time.to_string(),
            events: events.to_vec(),
        });
    }

    fn on_ack(&self) {
        self.forward(ChannelEvent::Ack);
    }
}
