//! Websocket link to one thermostat, with fixed-delay auto-reconnect.
//!
//! A [`DeviceClient`] owns at most one live transport. Inbound frames are
//! decoded and handed, in order, to the single [`EventHandler`] registered
//! at construction. One supervisor task owns the link after the first
//! attempt: when the transport drops it retries the handshake at a constant
//! delay until it succeeds or the client is closed.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use lytko_api::{DeviceClient, Event, ReconnectConfig, device_url};
//!
//! let url = device_url("192.168.1.50")?;
//! let client = DeviceClient::new(url, Arc::new(|event| println!("{event:?}")), ReconnectConfig::default());
//!
//! if !client.connect().await {
//!     // not fatal: the client keeps retrying in the background
//! }
//! client.send(&Event::target(21.5)).await;
//! client.close().await;
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};
use url::Url;

use crate::codec;
use crate::error::Error;
use crate::event::Event;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsWriter = SplitSink<WsStream, Message>;
type WsReader = SplitStream<WsStream>;

/// Receives every decoded inbound event, synchronously and in wire order.
pub type EventHandler = Arc<dyn Fn(Event) + Send + Sync>;

/// Build the thermostat's websocket endpoint from a bare network address.
pub fn device_url(address: &str) -> Result<Url, Error> {
    Ok(Url::parse(&format!("ws://{address}/ws"))?)
}

// ── ConnectionState ──────────────────────────────────────────────────

/// Link state observable by consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

// ── ReconnectConfig ──────────────────────────────────────────────────

/// Fixed-delay reconnection settings.
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Pause before every reconnection attempt. Default: 5s.
    pub delay: Duration,

    /// Upper bound on a single handshake. Default: 10s.
    pub connect_timeout: Duration,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            delay: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

// ── DeviceClient ─────────────────────────────────────────────────────

/// Handle to one logical device link.
///
/// Cheaply cloneable; all clones share the same transport and background
/// task. [`close`](Self::close) is terminal: a closed client never
/// reconnects and every later send is a no-op.
#[derive(Clone)]
pub struct DeviceClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    url: Url,
    handler: EventHandler,
    config: ReconnectConfig,
    state: watch::Sender<ConnectionState>,
    writer: Mutex<Option<WsWriter>>,
    cancel: CancellationToken,
    /// Set while a handshake or the supervisor owns the link. Every
    /// handshake happens under it, so at most one transport exists.
    active: AtomicBool,
    supervisor: Mutex<Option<JoinHandle<()>>>,
}

impl DeviceClient {
    /// Create a client. Does NOT connect -- call [`connect()`](Self::connect).
    pub fn new(url: Url, handler: EventHandler, config: ReconnectConfig) -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);

        Self {
            inner: Arc::new(ClientInner {
                url,
                handler,
                config,
                state,
                writer: Mutex::new(None),
                cancel: CancellationToken::new(),
                active: AtomicBool::new(false),
                supervisor: Mutex::new(None),
            }),
        }
    }

    pub fn url(&self) -> &Url {
        &self.inner.url
    }

    pub fn state(&self) -> ConnectionState {
        *self.inner.state.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.inner.state.subscribe()
    }

    /// Whether the background loop is currently retrying the handshake.
    pub fn is_reconnecting(&self) -> bool {
        self.inner.active.load(Ordering::Acquire) && self.state() != ConnectionState::Connected
    }

    /// Attempt one handshake.
    ///
    /// Returns `true` once connected and listening. `false` means "not yet
    /// connected": a background loop keeps retrying unless the client was
    /// closed.
    pub async fn connect(&self) -> bool {
        let inner = &self.inner;
        if inner.cancel.is_cancelled() {
            debug!(url = %inner.url, "connect called on a closed client");
            return false;
        }
        if inner
            .active
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            let connected = self.state() == ConnectionState::Connected;
            if !connected {
                debug!(url = %inner.url, "handshake already in flight");
            }
            return connected;
        }

        let result = tokio::select! {
            biased;
            () = inner.cancel.cancelled() => {
                inner.active.store(false, Ordering::Release);
                return false;
            }
            result = inner.handshake() => result,
        };

        // Held until the supervisor is registered so `close` can join it.
        let mut supervisor = inner.supervisor.lock().await;
        let (initial, connected) = match result {
            Ok(stream) => (Some(inner.go_live(stream).await), true),
            Err(e) => {
                warn!(url = %inner.url, error = %e, "device connection failed, retrying in background");
                inner.set_state(ConnectionState::Disconnected);
                (None, false)
            }
        };

        *supervisor = Some(tokio::spawn(Arc::clone(inner).supervise(initial)));
        connected
    }

    /// Best-effort send: encode and write if connected, otherwise log and
    /// drop. Never fails.
    pub async fn send(&self, event: &Event) {
        match self.try_send(event).await {
            Ok(()) => {}
            Err(Error::NoOutboundShape { kind }) => {
                debug!(kind, "event has no outbound wire shape, not sent");
            }
            Err(Error::NotConnected) => {
                debug!(kind = event.kind(), "device link down, dropping outbound event");
            }
            Err(e) => {
                warn!(kind = event.kind(), error = %e, "dropping outbound event");
            }
        }
    }

    /// Fallible send for callers that need to report a named failure.
    pub async fn try_send(&self, event: &Event) -> Result<(), Error> {
        let Some(payload) = codec::encode(event) else {
            return Err(Error::NoOutboundShape { kind: event.kind() });
        };

        let mut guard = self.inner.writer.lock().await;
        let Some(writer) = guard.as_mut() else {
            return Err(Error::NotConnected);
        };

        writer
            .send(Message::text(payload.to_string()))
            .await
            .map_err(|e| Error::Send(e.to_string()))?;

        trace!(kind = event.kind(), "frame sent");
        Ok(())
    }

    /// Cancel background work and release the transport.
    pub async fn close(&self) {
        let inner = &self.inner;
        inner.cancel.cancel();

        let supervisor = inner.supervisor.lock().await.take();
        if let Some(handle) = supervisor {
            let _ = handle.await;
        }

        if let Some(mut writer) = inner.writer.lock().await.take() {
            if let Err(e) = writer.close().await {
                debug!(error = %e, "error while closing websocket");
            }
        }

        inner.active.store(false, Ordering::Release);
        inner.set_state(ConnectionState::Disconnected);
        info!(url = %inner.url, "device link closed");
    }
}

// ── Background machinery ─────────────────────────────────────────────

impl ClientInner {
    fn set_state(&self, state: ConnectionState) {
        self.state.send_replace(state);
    }

    async fn handshake(&self) -> Result<WsStream, Error> {
        self.set_state(ConnectionState::Connecting);
        debug!(url = %self.url, "connecting to device");

        let attempt = tokio_tungstenite::connect_async(self.url.as_str());
        match tokio::time::timeout(self.config.connect_timeout, attempt).await {
            Ok(Ok((stream, _response))) => Ok(stream),
            Ok(Err(e)) => Err(Error::WebSocketConnect(e.to_string())),
            Err(_) => Err(Error::ConnectTimeout {
                timeout_secs: self.config.connect_timeout.as_secs(),
            }),
        }
    }

    /// Install a fresh transport's writer and hand back its reader.
    async fn go_live(&self, stream: WsStream) -> WsReader {
        let (writer, reader) = stream.split();
        *self.writer.lock().await = Some(writer);
        self.set_state(ConnectionState::Connected);
        info!(url = %self.url, "device connected");
        reader
    }

    /// Own the link until the client is closed: listen while a transport
    /// is live, otherwise wait `delay` and retry the handshake.
    async fn supervise(self: Arc<Self>, initial: Option<WsReader>) {
        let mut live = initial;
        let mut attempt: u32 = 0;

        loop {
            if let Some(reader) = live.take() {
                attempt = 0;
                self.listen(reader).await;
                if self.cancel.is_cancelled() {
                    // `close` sends the close frame on the writer.
                    break;
                }
                self.writer.lock().await.take();
                self.set_state(ConnectionState::Disconnected);
            }

            attempt = attempt.saturating_add(1);
            debug!(
                delay_ms = u64::try_from(self.config.delay.as_millis()).unwrap_or(u64::MAX),
                attempt,
                "waiting before reconnect"
            );

            tokio::select! {
                biased;
                () = self.cancel.cancelled() => break,
                () = tokio::time::sleep(self.config.delay) => {}
            }

            let result = tokio::select! {
                biased;
                () = self.cancel.cancelled() => break,
                result = self.handshake() => result,
            };

            match result {
                Ok(stream) => {
                    info!(attempt, "device reconnected");
                    live = Some(self.go_live(stream).await);
                }
                Err(e) => {
                    warn!(url = %self.url, error = %e, attempt, "reconnect attempt failed");
                    self.set_state(ConnectionState::Disconnected);
                }
            }
        }

        debug!("link supervisor exiting");
    }

    /// Read frames until the transport ends or the client is closed.
    async fn listen(&self, mut reader: WsReader) {
        loop {
            tokio::select! {
                biased;
                () = self.cancel.cancelled() => return,
                frame = reader.next() => {
                    match frame {
                        Some(Ok(Message::Text(text))) => {
                            for event in codec::decode_text(text.as_str()) {
                                (self.handler)(event);
                            }
                        }
                        Some(Ok(Message::Close(frame))) => {
                            if let Some(ref cf) = frame {
                                info!(code = %cf.code, reason = %cf.reason, "device closed the connection");
                            } else {
                                info!("device closed the connection (no payload)");
                            }
                            return;
                        }
                        Some(Ok(_)) => {
                            // Ping / Pong / Binary -- tungstenite answers pings itself
                            trace!("non-text frame ignored");
                        }
                        Some(Err(e)) => {
                            warn!(url = %self.url, error = %e, "device stream error");
                            return;
                        }
                        None => {
                            info!("device stream ended");
                            return;
                        }
                    }
                }
            }
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn noop_handler() -> EventHandler {
        Arc::new(|_event| {})
    }

    #[test]
    fn default_reconnect_config() {
        let config = ReconnectConfig::default();
        assert_eq!(config.delay, Duration::from_secs(5));
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
    }

    #[test]
    fn device_url_targets_ws_path() {
        let url = device_url("192.168.1.50").unwrap();
        assert_eq!(url.as_str(), "ws://192.168.1.50/ws");

        let url = device_url("127.0.0.1:8080").unwrap();
        assert_eq!(url.as_str(), "ws://127.0.0.1:8080/ws");
    }

    #[tokio::test]
    async fn starts_disconnected_and_drops_sends() {
        let client = DeviceClient::new(
            device_url("127.0.0.1:9").unwrap(),
            noop_handler(),
            ReconnectConfig::default(),
        );
        assert_eq!(client.state(), ConnectionState::Disconnected);
        assert!(matches!(
            client.try_send(&Event::target(20.0)).await,
            Err(Error::NotConnected)
        ));
        // Best-effort variant must not panic or block.
        client.send(&Event::heating(true)).await;
    }

    #[tokio::test]
    async fn unsendable_events_are_rejected_before_the_transport() {
        let client = DeviceClient::new(
            device_url("127.0.0.1:9").unwrap(),
            noop_handler(),
            ReconnectConfig::default(),
        );
        assert!(matches!(
            client.try_send(&Event::ChildLock { on: true }).await,
            Err(Error::NoOutboundShape { kind: "child_lock" })
        ));
    }

    #[tokio::test]
    async fn closed_client_never_connects() {
        let client = DeviceClient::new(
            device_url("127.0.0.1:9").unwrap(),
            noop_handler(),
            ReconnectConfig::default(),
        );
        client.close().await;
        assert!(!client.connect().await);
        assert!(!client.is_reconnecting());
        assert_eq!(client.state(), ConnectionState::Disconnected);
    }
}
