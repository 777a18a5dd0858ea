use thiserror::Error;

/// Top-level error type for the `lytko-api` crate.
///
/// Transport faults never escape the connection client's background loops;
/// these variants surface only from explicit, fallible calls such as
/// [`DeviceClient::try_send`](crate::DeviceClient::try_send).
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// Websocket handshake failed (refused, DNS failure, bad upgrade, etc.)
    #[error("WebSocket connection failed: {0}")]
    WebSocketConnect(String),

    /// Handshake did not complete in time.
    #[error("WebSocket handshake timed out after {timeout_secs}s")]
    ConnectTimeout { timeout_secs: u64 },

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // ── Outbound ────────────────────────────────────────────────────
    /// No live transport to write to.
    #[error("Device link is not connected")]
    NotConnected,

    /// The event has no wire representation and is never sent.
    #[error("Event '{kind}' has no outbound wire shape")]
    NoOutboundShape { kind: &'static str },

    /// Writing a frame to the transport failed.
    #[error("Failed to send frame: {0}")]
    Send(String),
}
