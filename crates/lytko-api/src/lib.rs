// lytko-api: Async websocket client and wire codec for Lytko thermostats

pub mod codec;
pub mod error;
pub mod event;
pub mod websocket;

pub use codec::{decode, decode_text, encode};
pub use error::Error;
pub use event::Event;
pub use websocket::{ConnectionState, DeviceClient, EventHandler, ReconnectConfig, device_url};
