//! In-process transport
//!
//! [`MemoryConnector::pair`] returns a connector for the client side and a
//! [`MemoryAcceptor`] for the server side. Every successful `open` produces one
//! [`MemoryPeer`], which plays the channel: it pushes frames to the client, reads the
//! frames the client wrote, and can close or fail the session.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use mewa_core::{codec, ChannelError, InboundFrame, OutboundCommand, Result};

use super::{Connector, FrameSink, FrameSource, TransportEvent, TransportSession};

// ----------------------------------------------------------------------------
// Connector and Acceptor
// ----------------------------------------------------------------------------

/// Client side of an in-process channel
#[derive(Clone)]
pub struct MemoryConnector {
    peers: UnboundedSender<MemoryPeer>,
    open_failure: Arc<Mutex<Option<String>>>,
}

/// Server side of an in-process channel; yields one peer per opened session
pub struct MemoryAcceptor {
    peers: UnboundedReceiver<MemoryPeer>,
    open_failure: Arc<Mutex<Option<String>>>,
}

impl MemoryConnector {
    pub fn pair() -> (MemoryConnector, MemoryAcceptor) {
        let (peer_tx, peer_rx) = mpsc::unbounded_channel();
        let open_failure = Arc::new(Mutex::new(None));
        (
            MemoryConnector {
                peers: peer_tx,
                open_failure: Arc::clone(&open_failure),
            },
            MemoryAcceptor {
                peers: peer_rx,
                open_failure,
            },
        )
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    async fn open(&self, endpoint: &str) -> Result<TransportSession> {
        let failure = self
            .open_failure
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(reason) = failure {
            return Err(ChannelError::connection_failed(endpoint, reason));
        }

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (written_tx, written_rx) = mpsc::unbounded_channel();
        let flags = Arc::new(SessionFlags::default());

        let peer = MemoryPeer {
            endpoint: endpoint.to_string(),
            events: event_tx,
            written: written_rx,
            flags: Arc::clone(&flags),
        };
        self.peers
            .send(peer)
            .map_err(|_| ChannelError::connection_failed(endpoint, "no acceptor"))?;

        Ok(TransportSession::new(
            Box::new(MemorySink {
                written: Some(written_tx),
                flags,
            }),
            Box::new(MemorySource { events: event_rx }),
        ))
    }
}

impl MemoryAcceptor {
    /// Wait for the client to open the next session
    pub async fn accept(&mut self) -> Option<MemoryPeer> {
        self.peers.recv().await
    }

    /// Make the next `open` fail with the given reason
    pub fn fail_next_open(&self, reason: impl Into<String>) {
        *self
            .open_failure
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(reason.into());
    }
}

// ----------------------------------------------------------------------------
// Server-Side Peer
// ----------------------------------------------------------------------------

#[derive(Default)]
struct SessionFlags {
    closed_by_client: AtomicBool,
    write_failure: Mutex<Option<String>>,
}

/// Channel side of one in-process session
pub struct MemoryPeer {
    endpoint: String,
    events: UnboundedSender<TransportEvent>,
    written: UnboundedReceiver<String>,
    flags: Arc<SessionFlags>,
}

impl MemoryPeer {
    /// Endpoint the client asked for
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Send a frame to the client; false once the client side is gone
    pub fn push_frame(&self, frame: &InboundFrame) -> Result<bool> {
        let text = codec::encode_frame(frame)?;
        Ok(self.push_text(text))
    }

    /// Send raw text to the client, valid JSON or not
    pub fn push_text(&self, text: impl Into<String>) -> bool {
        self.events.send(TransportEvent::Text(text.into())).is_ok()
    }

    /// End the session from the channel side
    pub fn close(&self) -> bool {
        self.events.send(TransportEvent::Closed).is_ok()
    }

    /// Fail the session with a transport error
    pub fn fail(&self, reason: impl Into<String>) -> bool {
        self.events.send(TransportEvent::Error(reason.into())).is_ok()
    }

    /// Make every later client write fail
    pub fn fail_writes(&self, reason: impl Into<String>) {
        *self
            .flags
            .write_failure
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(reason.into());
    }

    /// Next frame written by the client; `None` once the client closed the session
    pub async fn next_text(&mut self) -> Option<String> {
        self.written.recv().await
    }

    /// Next frame written by the client, decoded as a command
    pub async fn next_command(&mut self) -> Option<OutboundCommand> {
        let text = self.next_text().await?;
        codec::decode_command(&text).ok()
    }

    /// Frame already written by the client, without waiting
    pub fn try_next_text(&mut self) -> Option<String> {
        self.written.try_recv().ok()
    }

    pub fn is_closed_by_client(&self) -> bool {
        self.flags.closed_by_client.load(Ordering::SeqCst)
    }
}

// ----------------------------------------------------------------------------
// Client-Side Halves
// ----------------------------------------------------------------------------

struct MemorySink {
    written: Option<UnboundedSender<String>>,
    flags: Arc<SessionFlags>,
}

#[async_trait]
impl FrameSink for MemorySink {
    async fn send_text(&mut self, text: String) -> Result<()> {
        let failure = self
            .flags
            .write_failure
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(reason) = failure {
            return Err(ChannelError::transport(reason));
        }

        let written = self
            .written
            .as_ref()
            .ok_or_else(|| ChannelError::transport("session closed"))?;
        written
            .send(text)
            .map_err(|_| ChannelError::transport("peer went away"))
    }

    async fn close(&mut self) -> Result<()> {
        self.flags.closed_by_client.store(true, Ordering::SeqCst);
        self.written = None;
        Ok(())
    }
}

struct MemorySource {
    events: UnboundedReceiver<TransportEvent>,
}

#[async_trait]
impl FrameSource for MemorySource {
    async fn next_event(&mut self) -> TransportEvent {
        self.events.recv().await.unwrap_or(TransportEvent::Closed)
    }
}
