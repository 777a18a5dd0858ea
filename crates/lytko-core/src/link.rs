//! Device link port.
//!
//! The coordinator never builds a websocket client itself: it asks a
//! [`Connector`] for a [`DeviceLink`] bound to an address and an event
//! handler. [`WsConnector`] is the production adapter; tests substitute a
//! recording fake.

use std::future::Future;

use lytko_api::{DeviceClient, Event, EventHandler, ReconnectConfig, device_url};
use tracing::info;

use crate::error::CoreError;

/// One live (or reconnecting) link to a device.
pub trait DeviceLink: Send + Sync + 'static {
    /// Best-effort send. Never fails.
    fn send(&self, event: &Event) -> impl Future<Output = ()> + Send;

    /// Send that reports a named failure.
    fn try_send(&self, event: &Event) -> impl Future<Output = Result<(), lytko_api::Error>> + Send;

    /// Release the link. No events are delivered after this resolves.
    fn close(&self) -> impl Future<Output = ()> + Send;
}

/// Factory for device links.
pub trait Connector: Send + Sync + 'static {
    type Link: DeviceLink;

    /// Build a link to `address` and start connecting. A link that could
    /// not connect yet is still returned; it keeps retrying on its own.
    fn open(
        &self,
        address: &str,
        handler: EventHandler,
    ) -> impl Future<Output = Result<Self::Link, CoreError>> + Send;
}

// ── Websocket adapter ────────────────────────────────────────────────

/// Opens [`DeviceClient`]s at `ws://{address}/ws`.
#[derive(Debug, Clone, Default)]
pub struct WsConnector {
    reconnect: ReconnectConfig,
}

impl WsConnector {
    pub fn new(reconnect: ReconnectConfig) -> Self {
        Self { reconnect }
    }
}

impl Connector for WsConnector {
    type Link = DeviceClient;

    async fn open(&self, address: &str, handler: EventHandler) -> Result<DeviceClient, CoreError> {
        let url = device_url(address).map_err(|e| CoreError::ConnectionFailed {
            address: address.to_owned(),
            reason: e.to_string(),
        })?;

        let client = DeviceClient::new(url, handler, self.reconnect.clone());
        if !client.connect().await {
            info!(address, "device not reachable yet, retrying in background");
        }
        Ok(client)
    }
}

impl DeviceLink for DeviceClient {
    async fn send(&self, event: &Event) {
        DeviceClient::send(self, event).await;
    }

    async fn try_send(&self, event: &Event) -> Result<(), lytko_api::Error> {
        DeviceClient::try_send(self, event).await
    }

    async fn close(&self) {
        DeviceClient::close(self).await;
    }
}
