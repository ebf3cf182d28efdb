//! WebSocket transport over `tokio-tungstenite`

use async_trait::async_trait;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, trace};

use mewa_core::{ChannelError, Result};

use super::{Connector, FrameSink, FrameSource, TransportEvent, TransportSession};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Opens channel sessions over `ws://` and `wss://`
#[derive(Debug, Default, Clone, Copy)]
pub struct WebSocketConnector;

impl WebSocketConnector {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Connector for WebSocketConnector {
    async fn open(&self, endpoint: &str) -> Result<TransportSession> {
        let (stream, response) = connect_async(endpoint)
            .await
            .map_err(|e| ChannelError::connection_failed(endpoint, e.to_string()))?;
        debug!(
            "WebSocket handshake with {} completed ({})",
            endpoint,
            response.status()
        );

        let (sink, source) = stream.split();
        Ok(TransportSession::new(
            Box::new(WebSocketSink { sink }),
            Box::new(WebSocketSource { source }),
        ))
    }
}

// ----------------------------------------------------------------------------
// Session Halves
// ----------------------------------------------------------------------------

struct WebSocketSink {
    sink: SplitSink<WsStream, Message>,
}

#[async_trait]
impl FrameSink for WebSocketSink {
    async fn send_text(&mut self, text: String) -> Result<()> {
        self.sink
            .send(Message::Text(text))
            .await
            .map_err(|e| ChannelError::transport(e.to_string()))
    }

    async fn close(&mut self) -> Result<()> {
        match self.sink.close().await {
            Ok(()) | Err(WsError::ConnectionClosed) | Err(WsError::AlreadyClosed) => Ok(()),
            Err(e) => Err(ChannelError::transport(e.to_string())),
        }
    }
}

struct WebSocketSource {
    source: SplitStream<WsStream>,
}

#[async_trait]
impl FrameSource for WebSocketSource {
    async fn next_event(&mut self) -> TransportEvent {
        loop {
            match self.source.next().await {
                Some(Ok(Message::Text(text))) => return TransportEvent::Text(text),
                Some(Ok(Message::Close(frame))) => {
                    debug!("WebSocket close frame received: {:?}", frame);
                    return TransportEvent::Closed;
                }
                // tungstenite queues the pong and flushes it on the next read or write
                Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => {}
                Some(Ok(Message::Binary(data))) => {
                    trace!("Ignoring {} byte binary frame", data.len());
                }
                Some(Ok(Message::Frame(_))) => {}
                Some(Err(WsError::ConnectionClosed)) | Some(Err(WsError::AlreadyClosed)) | None => {
                    return TransportEvent::Closed;
                }
                Some(Err(e)) => return TransportEvent::Error(e.to_string()),
            }
        }
    }
}
