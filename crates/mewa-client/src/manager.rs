//! Channel connection management
//!
//! This module contains [`ChannelConnection`], which owns one transport session to a
//! channel at a time. It writes the `connect` command when the transport opens, runs a
//! reader task that decodes inbound frames and hands them to the [`Dispatcher`], and
//! serializes outbound commands through the session's sink.
//!
//! Locking: one async mutex guards the configuration, the session state and the live
//! session handle together. It is never held across a transport write or while waiting
//! for the reader task to finish.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, Notify, RwLock};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use mewa_core::activity::release_if_held;
use mewa_core::{
    codec, ActivityGuard, ActivityScope, ChannelError, ChannelListener, ConnectionConfig,
    ErrorReason, OutboundCommand, Result, SessionEffect, SessionEvent, SessionState,
    SubscriptionSpec,
};

use crate::dispatcher::{DispatchResult, Dispatcher, ListenerPanic};
use crate::keepalive::KeepAliveMonitor;
use crate::transport::{
    Connector, FrameSink, FrameSource, TransportEvent, TransportSession, WebSocketConnector,
};

type SharedSink = Arc<Mutex<Box<dyn FrameSink>>>;

// ----------------------------------------------------------------------------
// Session Bookkeeping
// ----------------------------------------------------------------------------

/// Traffic clock for the idle timeout of one session
struct SessionActivity {
    started: Instant,
    last_activity_ms: AtomicU64,
    idle_timeout_ms: AtomicU64,
    changed: Notify,
}

impl SessionActivity {
    fn new(idle_timeout: Duration) -> Self {
        Self {
            started: Instant::now(),
            last_activity_ms: AtomicU64::new(0),
            idle_timeout_ms: AtomicU64::new(saturating_millis(idle_timeout)),
            changed: Notify::new(),
        }
    }

    fn touch(&self) {
        let elapsed = saturating_millis(self.started.elapsed());
        self.last_activity_ms.store(elapsed, Ordering::SeqCst);
    }

    fn set_idle_timeout(&self, idle_timeout: Duration) {
        self.idle_timeout_ms
            .store(saturating_millis(idle_timeout), Ordering::SeqCst);
        self.changed.notify_one();
    }

    /// When the session becomes idle without further traffic
    ///
    /// `None` when disabled or when the deadline lies beyond what `Instant` can hold.
    fn idle_deadline(&self) -> Option<Instant> {
        let timeout = self.idle_timeout_ms.load(Ordering::SeqCst);
        if timeout == 0 {
            return None;
        }
        let last = self.last_activity_ms.load(Ordering::SeqCst);
        self.started
            .checked_add(Duration::from_millis(last.saturating_add(timeout)))
    }

    fn is_idle(&self) -> bool {
        self.idle_deadline()
            .map_or(false, |deadline| Instant::now() >= deadline)
    }
}

fn saturating_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

async fn idle_sleep(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

/// Handle to the transport session currently owned by the connection
struct LiveSession {
    id: u64,
    sink: SharedSink,
    monitor: KeepAliveMonitor,
    activity: Arc<SessionActivity>,
    reader: Option<JoinHandle<()>>,
}

/// Everything guarded by the connection mutex
struct ConnectionCore {
    config: ConnectionConfig,
    state: SessionState,
    session: Option<LiveSession>,
    /// Bumped by every connect and close; an open that finds it changed is abandoned
    epoch: u64,
}

impl ConnectionCore {
    fn is_current(&self, session_id: u64) -> bool {
        self.session.as_ref().map(|session| session.id) == Some(session_id)
    }

    fn mark_closed(&mut self) {
        self.state = self
            .state
            .transition(SessionEvent::Closed)
            .unwrap_or(SessionState::Disconnected);
    }
}

struct Shared {
    connector: Arc<dyn Connector>,
    core: Mutex<ConnectionCore>,
    dispatcher: Dispatcher,
    activity_guard: RwLock<Option<Arc<dyn ActivityGuard>>>,
}

// ----------------------------------------------------------------------------
// Channel Connection
// ----------------------------------------------------------------------------

/// Connection of one device to one channel
///
/// Cheap to clone; clones share the same session. A session ends only through
/// [`close`](Self::close), [`disconnect`](Self::disconnect), the channel or the
/// transport. There is no automatic reconnect; call [`connect`](Self::connect) again.
#[derive(Clone)]
pub struct ChannelConnection {
    shared: Arc<Shared>,
}

impl ChannelConnection {
    /// Create a connection that opens sessions through `connector`
    pub fn new<C: Connector + 'static>(config: ConnectionConfig, connector: C) -> Self {
        Self::with_connector(config, Arc::new(connector))
    }

    pub fn with_connector(config: ConnectionConfig, connector: Arc<dyn Connector>) -> Self {
        Self {
            shared: Arc::new(Shared {
                connector,
                core: Mutex::new(ConnectionCore {
                    config,
                    state: SessionState::Disconnected,
                    session: None,
                    epoch: 0,
                }),
                dispatcher: Dispatcher::new(),
                activity_guard: RwLock::new(None),
            }),
        }
    }

    /// Create a connection over WebSocket
    pub fn websocket(config: ConnectionConfig) -> Self {
        Self::new(config, WebSocketConnector::new())
    }

    // ------------------------------------------------------------------------
    // Session Lifecycle
    // ------------------------------------------------------------------------

    /// Open a new session and send the `connect` command
    ///
    /// Any open session is fully closed first. Returns once the command was written;
    /// `on_connected` follows when the channel accepts the device.
    pub async fn connect(&self) -> Result<()> {
        self.close().await;

        let (config, epoch) = {
            let mut core = self.shared.core.lock().await;
            core.config.validate()?;
            core.state = core.state.transition(SessionEvent::OpenRequested)?;
            core.epoch += 1;
            (core.config.clone(), core.epoch)
        };
        let connect_frame = match codec::encode(&config.connect_command()) {
            Ok(text) => text,
            Err(e) => {
                self.abandon_open(epoch).await;
                return Err(e);
            }
        };

        info!(
            "Opening session to {} for device {} on channel {}",
            config.endpoint, config.device, config.channel
        );
        let TransportSession { mut sink, source } =
            match self.shared.connector.open(&config.endpoint).await {
                Ok(session) => session,
                Err(e) => {
                    warn!("Failed to open session to {}: {}", config.endpoint, e);
                    self.abandon_open(epoch).await;
                    return Err(e);
                }
            };

        if let Err(e) = sink.send_text(connect_frame).await {
            warn!("Failed to send connect command: {}", e);
            close_sink(sink.as_mut()).await;
            self.abandon_open(epoch).await;
            return Err(ChannelError::connection_failed(
                &config.endpoint,
                e.to_string(),
            ));
        }

        let monitor = KeepAliveMonitor::start();
        let activity = Arc::new(SessionActivity::new(config.idle_timeout));
        activity.touch();

        let mut core = self.shared.core.lock().await;
        if core.epoch != epoch || core.state != SessionState::Opening {
            drop(core);
            debug!("Session {} was closed while opening", epoch);
            close_sink(sink.as_mut()).await;
            return Err(ChannelError::connection_failed(
                &config.endpoint,
                "closed while connecting",
            ));
        }
        core.state = core.state.transition(SessionEvent::TransportOpened)?;

        let reader = tokio::spawn(self.clone().run_reader(
            epoch,
            source,
            monitor.clone(),
            Arc::clone(&activity),
        ));
        core.session = Some(LiveSession {
            id: epoch,
            sink: Arc::new(Mutex::new(sink)),
            monitor,
            activity,
            reader: Some(reader),
        });
        if config.idle_timeout_enabled() {
            debug!(
                "Session {} closes after {:?} without traffic",
                epoch, config.idle_timeout
            );
        }
        debug!("Session {} open, awaiting channel acknowledgment", epoch);
        Ok(())
    }

    /// Close the current session
    ///
    /// Idempotent and safe to call from any task, concurrently with inbound processing.
    /// No callbacks run for this session once it returns.
    pub async fn close(&self) {
        self.teardown(None, true).await;
    }

    /// Tell the channel this device leaves, then close
    ///
    /// The session is closed even when the `disconnect` command could not be written;
    /// the write result is returned.
    pub async fn disconnect(&self) -> Result<()> {
        let result = self.send_command(OutboundCommand::Disconnect).await;
        self.close().await;
        result
    }

    /// Reset the state of an open that did not produce a session
    async fn abandon_open(&self, epoch: u64) {
        let mut core = self.shared.core.lock().await;
        if core.epoch == epoch && core.session.is_none() {
            core.mark_closed();
        }
    }

    /// Take the session out and release everything it holds
    ///
    /// With `only` set, a session other than that one is left alone. The reader task
    /// passes `join_reader = false` since it cannot wait for itself.
    async fn teardown(&self, only: Option<u64>, join_reader: bool) {
        let session = {
            let mut core = self.shared.core.lock().await;
            if let Some(id) = only {
                if !core.is_current(id) {
                    return;
                }
            }
            core.epoch += 1;
            core.mark_closed();
            core.session.take()
        };
        let Some(mut session) = session else {
            return;
        };

        session.monitor.release();
        {
            let mut sink = session.sink.lock().await;
            close_sink(sink.as_mut()).await;
        }
        if let Some(reader) = session.reader.take() {
            if join_reader {
                if let Err(e) = reader.await {
                    if e.is_panic() {
                        error!("Reader of session {} panicked", session.id);
                    }
                }
            }
        }
        if let Some(guard) = self.activity_guard().await {
            release_if_held(guard.as_ref());
        }
        info!("Session {} closed", session.id);
    }

    // ------------------------------------------------------------------------
    // Reader Task
    // ------------------------------------------------------------------------

    async fn run_reader(
        self,
        session_id: u64,
        mut source: Box<dyn FrameSource>,
        monitor: KeepAliveMonitor,
        activity: Arc<SessionActivity>,
    ) {
        loop {
            let changed = activity.changed.notified();
            let deadline = activity.idle_deadline();

            tokio::select! {
                biased;
                _ = monitor.wait() => break,
                _ = changed => {}
                _ = idle_sleep(deadline) => {
                    if activity.is_idle() {
                        info!("Session {} idle, closing", session_id);
                        self.on_transport_closed(session_id).await;
                        break;
                    }
                }
                event = source.next_event() => match event {
                    TransportEvent::Text(text) => {
                        activity.touch();
                        if !self.handle_text(session_id, &text).await {
                            break;
                        }
                    }
                    TransportEvent::Closed => {
                        self.on_transport_closed(session_id).await;
                        break;
                    }
                    TransportEvent::Error(reason) => {
                        self.on_transport_error(session_id, reason).await;
                        break;
                    }
                },
            }
        }
        debug!("Reader of session {} stopped", session_id);
    }

    /// Decode and dispatch one frame; false when the reader must stop
    async fn handle_text(&self, session_id: u64, text: &str) -> bool {
        let _scope = ActivityScope::enter(self.activity_guard().await);

        let frame = match codec::decode(text) {
            Ok(frame) => frame,
            Err(e) => {
                warn!("Dropping undecodable frame: {}", e);
                return true;
            }
        };
        debug!("Received {} frame on session {}", frame.kind(), session_id);

        match frame.session_effect() {
            SessionEffect::MarkConnected => {
                let mut core = self.shared.core.lock().await;
                if !core.is_current(session_id) {
                    return false;
                }
                match core.state.transition(SessionEvent::ConnectedAck) {
                    Ok(state) => core.state = state,
                    Err(e) => {
                        warn!("Ignoring connected frame: {}", e);
                        return true;
                    }
                }
                drop(core);
                info!("Session {} connected to the channel", session_id);
                let delivered = self.shared.dispatcher.dispatch(&frame).await;
                self.after_dispatch(session_id, delivered).await
            }
            SessionEffect::CloseAfterDispatch => {
                if !self.is_current(session_id).await {
                    return false;
                }
                if let Some(error) = frame.protocol_error() {
                    warn!("Channel reported {} on session {}", error, session_id);
                }
                if let Err(panic) = self.shared.dispatcher.dispatch(&frame).await {
                    error!("Session {}: {}", session_id, panic);
                }
                self.teardown(Some(session_id), false).await;
                false
            }
            SessionEffect::None => {
                if !self.is_current(session_id).await {
                    return false;
                }
                let delivered = self.shared.dispatcher.dispatch(&frame).await;
                self.after_dispatch(session_id, delivered).await
            }
        }
    }

    /// Keep reading after a delivered frame; a panicking listener ends the session
    async fn after_dispatch(&self, session_id: u64, delivered: DispatchResult) -> bool {
        match delivered {
            Ok(()) => true,
            Err(panic) => {
                self.on_listener_panic(session_id, panic).await;
                false
            }
        }
    }

    async fn on_listener_panic(&self, session_id: u64, panic: ListenerPanic) {
        error!("Closing session {}: {}", session_id, panic);
        self.teardown(Some(session_id), false).await;
    }

    async fn on_transport_closed(&self, session_id: u64) {
        if !self.is_current(session_id).await {
            return;
        }
        info!("Session {} closed by transport", session_id);
        let _scope = ActivityScope::enter(self.activity_guard().await);
        if let Err(panic) = self.shared.dispatcher.notify_closed().await {
            error!("Session {}: {}", session_id, panic);
        }
        self.teardown(Some(session_id), false).await;
    }

    async fn on_transport_error(&self, session_id: u64, reason: String) {
        if !self.is_current(session_id).await {
            return;
        }
        error!("Transport error on session {}: {}", session_id, reason);
        let _scope = ActivityScope::enter(self.activity_guard().await);
        let reported = self
            .shared
            .dispatcher
            .notify_error(&ErrorReason::Transport(reason))
            .await;
        if let Err(panic) = reported {
            error!("Session {}: {}", session_id, panic);
        }
        self.teardown(Some(session_id), false).await;
    }

    async fn is_current(&self, session_id: u64) -> bool {
        self.shared.core.lock().await.is_current(session_id)
    }

    // ------------------------------------------------------------------------
    // Outbound Requests
    // ------------------------------------------------------------------------

    /// Ask the channel for the devices currently joined; answered by `on_devices_event`
    pub async fn request_devices_list(&self) -> Result<()> {
        self.send_command(OutboundCommand::GetDevices).await
    }

    /// Ask for the most recent events; empty filters match everything
    pub async fn request_last_events(&self, device: &str, event_prefix: &str) -> Result<()> {
        self.send_command(OutboundCommand::get_last_events(device, event_prefix))
            .await
    }

    /// Broadcast an event to subscribed devices; with `ack` the channel replies `ack`
    pub async fn send_event(&self, id: &str, params: &str, ack: bool) -> Result<()> {
        self.send_command(OutboundCommand::send_event(id, params, ack))
            .await
    }

    pub async fn send_message(&self, to_device: &str, id: &str, params: &str) -> Result<()> {
        self.send_command(OutboundCommand::send_message(to_device, id, params))
            .await
    }

    async fn send_command(&self, command: OutboundCommand) -> Result<()> {
        let (sink, activity) = {
            let core = self.shared.core.lock().await;
            match (&core.session, core.state.can_send()) {
                (Some(session), true) => (Arc::clone(&session.sink), Arc::clone(&session.activity)),
                _ => {
                    debug!(
                        "Not sending {} while {}",
                        command.kind(),
                        core.state.state_name()
                    );
                    return Err(ChannelError::NotConnected);
                }
            }
        };

        let text = codec::encode(&command)?;
        let mut sink = sink.lock().await;
        match sink.send_text(text).await {
            Ok(()) => {
                activity.touch();
                debug!("Sent {} command", command.kind());
                Ok(())
            }
            Err(e) => {
                warn!("Failed to send {} command: {}", command.kind(), e);
                Err(match e {
                    ChannelError::Transport { .. } => e,
                    other => ChannelError::transport(other.to_string()),
                })
            }
        }
    }

    // ------------------------------------------------------------------------
    // Configuration
    // ------------------------------------------------------------------------

    /// Replace the configuration used by the next `connect`
    pub async fn set_config(&self, config: ConnectionConfig) {
        self.shared.core.lock().await.config = config;
    }

    /// Receive every event from the next session on
    pub async fn subscribe_to_all(&self) {
        self.shared.core.lock().await.config.subscriptions = SubscriptionSpec::all();
    }

    /// Receive events whose id starts with one of `prefixes` from the next session on
    pub async fn subscribe_to_events<I, S>(&self, prefixes: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.shared.core.lock().await.config.subscriptions = SubscriptionSpec::events(prefixes);
    }

    /// Set the idle timeout; also applies to the live session
    pub async fn set_idle_timeout(&self, idle_timeout: Duration) {
        let mut core = self.shared.core.lock().await;
        core.config.idle_timeout = idle_timeout;
        if let Some(session) = &core.session {
            session.activity.set_idle_timeout(idle_timeout);
        }
    }

    pub async fn set_listener(&self, listener: Option<Arc<dyn ChannelListener>>) {
        self.shared.dispatcher.set_listener(listener).await;
    }

    pub async fn set_activity_guard(&self, guard: Option<Arc<dyn ActivityGuard>>) {
        *self.shared.activity_guard.write().await = guard;
    }

    async fn activity_guard(&self) -> Option<Arc<dyn ActivityGuard>> {
        self.shared.activity_guard.read().await.clone()
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    pub async fn config(&self) -> ConnectionConfig {
        self.shared.core.lock().await.config.clone()
    }

    pub async fn endpoint(&self) -> String {
        self.shared.core.lock().await.config.endpoint.clone()
    }

    pub async fn channel(&self) -> String {
        self.shared.core.lock().await.config.channel.clone()
    }

    pub async fn device(&self) -> String {
        self.shared.core.lock().await.config.device.clone()
    }

    pub async fn password(&self) -> String {
        self.shared.core.lock().await.config.password.clone()
    }

    pub async fn idle_timeout(&self) -> Duration {
        self.shared.core.lock().await.config.idle_timeout
    }

    pub async fn state(&self) -> SessionState {
        self.shared.core.lock().await.state
    }

    /// Whether the channel acknowledged the current session
    pub async fn is_connected_to_channel(&self) -> bool {
        self.state().await == SessionState::Connected
    }

    /// Monitor of the live session, released when it closes
    pub async fn keep_alive(&self) -> Option<KeepAliveMonitor> {
        self.shared
            .core
            .lock()
            .await
            .session
            .as_ref()
            .map(|session| session.monitor.clone())
    }
}

async fn close_sink(sink: &mut dyn FrameSink) {
    if let Err(e) = sink.close().await {
        debug!("Ignoring transport close failure: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_idle_deadline_follows_activity() {
        let activity = SessionActivity::new(Duration::from_secs(10));
        let first = activity.idle_deadline().unwrap();
        assert!(!activity.is_idle());

        tokio::time::advance(Duration::from_secs(4)).await;
        activity.touch();
        let second = activity.idle_deadline().unwrap();
        assert_eq!(second - first, Duration::from_secs(4));

        tokio::time::advance(Duration::from_secs(10)).await;
        assert!(activity.is_idle());
    }

    #[tokio::test]
    async fn test_huge_idle_timeout_saturates() {
        let activity = SessionActivity::new(Duration::MAX);
        assert_eq!(activity.idle_timeout_ms.load(Ordering::SeqCst), u64::MAX);
        assert!(!activity.is_idle());

        activity.set_idle_timeout(Duration::from_millis(u64::MAX) + Duration::from_secs(1));
        assert_eq!(activity.idle_timeout_ms.load(Ordering::SeqCst), u64::MAX);
        activity.touch();
        assert!(!activity.is_idle());
    }

    #[test]
    fn test_zero_timeout_disables_idle_deadline() {
        let activity = SessionActivity::new(Duration::ZERO);
        assert!(activity.idle_deadline().is_none());
        assert!(!activity.is_idle());

        activity.set_idle_timeout(Duration::from_millis(250));
        assert!(activity.idle_deadline().is_some());
    }
}
