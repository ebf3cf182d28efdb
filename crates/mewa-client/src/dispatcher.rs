//! Frame dispatch to the registered listener
//!
//! The dispatcher is driven by the session's reader task only, so callbacks for one
//! connection never run concurrently and always follow arrival order. The listener is
//! cloned out of its slot before each callback; a callback may replace the listener
//! without deadlocking. A panicking callback is caught and reported as
//! [`ListenerPanic`] so the reader can end the session instead of unwinding.

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::RwLock;
use tracing::{debug, trace};

use mewa_core::{ChannelListener, ErrorReason, InboundFrame};

/// A listener callback panicked
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenerPanic {
    pub message: String,
}

impl ListenerPanic {
    fn from_payload(payload: &(dyn Any + Send)) -> Self {
        let message = payload
            .downcast_ref::<String>()
            .map(|s| s.as_str())
            .or_else(|| payload.downcast_ref::<&str>().copied())
            .unwrap_or("unknown panic")
            .to_string();
        Self { message }
    }
}

impl fmt::Display for ListenerPanic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listener panicked: {}", self.message)
    }
}

impl std::error::Error for ListenerPanic {}

pub type DispatchResult = std::result::Result<(), ListenerPanic>;

#[derive(Default)]
pub struct Dispatcher {
    listener: RwLock<Option<Arc<dyn ChannelListener>>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the listener; `None` discards later frames after decoding
    pub async fn set_listener(&self, listener: Option<Arc<dyn ChannelListener>>) {
        *self.listener.write().await = listener;
    }

    pub async fn current(&self) -> Option<Arc<dyn ChannelListener>> {
        self.listener.read().await.clone()
    }

    pub async fn dispatch(&self, frame: &InboundFrame) -> DispatchResult {
        match self.current().await {
            Some(listener) => guarded(async { deliver(listener.as_ref(), frame) }).await,
            None => {
                trace!("No listener registered, discarding {} frame", frame.kind());
                Ok(())
            }
        }
    }

    pub async fn notify_closed(&self) -> DispatchResult {
        match self.current().await {
            Some(listener) => guarded(async { listener.on_closed() }).await,
            None => Ok(()),
        }
    }

    pub async fn notify_error(&self, reason: &ErrorReason) -> DispatchResult {
        match self.current().await {
            Some(listener) => guarded(async { listener.on_error(reason) }).await,
            None => Ok(()),
        }
    }
}

async fn guarded<F: Future<Output = ()>>(call: F) -> DispatchResult {
    AssertUnwindSafe(call)
        .catch_unwind()
        .await
        .map_err(|payload| ListenerPanic::from_payload(payload.as_ref()))
}

/// Invoke the callback matching one frame
pub fn deliver(listener: &dyn ChannelListener, frame: &InboundFrame) {
    if let Some(error) = frame.protocol_error() {
        listener.on_error(&ErrorReason::Protocol(error));
        return;
    }

    match frame {
        InboundFrame::Connected => listener.on_connected(),
        InboundFrame::Disconnected => listener.on_closed(),
        InboundFrame::JoinedChannel { time, device } => {
            listener.on_device_joined_channel(time, device)
        }
        InboundFrame::LeftChannel { time, device } => listener.on_device_left_channel(time, device),
        InboundFrame::Event {
            time,
            device,
            id,
            params,
        } => listener.on_event(time, device, id, params),
        InboundFrame::Message {
            time,
            device,
            id,
            params,
        } => listener.on_message(time, device, id, params),
        InboundFrame::DevicesEvent { time, devices } => listener.on_devices_event(time, devices),
        InboundFrame::LastEvents { time, events } => listener.on_last_events(time, events),
        InboundFrame::Ack => listener.on_ack(),
        InboundFrame::Unrecognized { kind } => {
            debug!("Ignoring unrecognized frame type {}", kind)
        }
        // Handled through protocol_error above
        InboundFrame::AlreadyConnectedError
        | InboundFrame::AuthorizationError
        | InboundFrame::NotConnectedError => {}
    }
}
