//! mDNS browsing for thermostat announcements.
//!
//! Lytko devices advertise `_hap._tcp.local.` with their hardware address
//! in the `id` TXT record. Every resolved announcement is published on a
//! broadcast feed that coordinators subscribe to while rediscovering.

use std::time::Duration;

use lytko_core::DiscoveryAnnouncement;
use mdns_sd::{ServiceDaemon, ServiceEvent, ServiceInfo};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

pub const SERVICE_TYPE: &str = "_hap._tcp.local.";

const FEED_CAPACITY: usize = 64;
const POLL: Duration = Duration::from_millis(500);

/// A running mDNS browser and its announcement feed.
pub struct Browser {
    feed: broadcast::Sender<DiscoveryAnnouncement>,
    handle: JoinHandle<()>,
}

impl Browser {
    /// Start browsing on a blocking thread until `cancel` fires.
    pub fn start(cancel: CancellationToken) -> Result<Self, mdns_sd::Error> {
        let daemon = ServiceDaemon::new()?;
        let receiver = daemon.browse(SERVICE_TYPE)?;
        let (feed, _) = broadcast::channel(FEED_CAPACITY);
        let publisher = feed.clone();

        let handle = tokio::task::spawn_blocking(move || {
            while !cancel.is_cancelled() {
                match receiver.recv_timeout(POLL) {
                    Ok(ServiceEvent::ServiceResolved(info)) => match announcement(&info) {
                        Some(announcement) => {
                            trace!(?announcement, "device announced");
                            // No subscribers outside a rediscovery window.
                            let _ = publisher.send(announcement);
                        }
                        None => trace!(name = info.get_fullname(), "announcement without id or IPv4"),
                    },
                    Ok(other) => trace!(event = ?other, "mdns event"),
                    Err(_) if receiver.is_disconnected() => {
                        warn!("mdns browser stopped unexpectedly");
                        break;
                    }
                    Err(_) => {}
                }
            }
            if let Err(e) = daemon.shutdown() {
                debug!(error = %e, "mdns daemon shutdown failed");
            }
        });

        Ok(Self { feed, handle })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DiscoveryAnnouncement> {
        self.feed.subscribe()
    }

    /// Publishing side of the feed, for re-subscribing later.
    pub fn feed(&self) -> broadcast::Sender<DiscoveryAnnouncement> {
        self.feed.clone()
    }

    /// Wait for the browsing thread after its token was cancelled.
    pub async fn join(self) {
        let _ = self.handle.await;
    }
}

/// Extract the hardware id and IPv4 address from a resolved service.
fn announcement(info: &ServiceInfo) -> Option<DiscoveryAnnouncement> {
    let hardware_id = info.get_property_val_str("id")?.trim();
    if hardware_id.is_empty() {
        return None;
    }
    let address = info.get_addresses_v4().into_iter().min()?;
    Some(DiscoveryAnnouncement {
        address: address.to_string(),
        hardware_id: hardware_id.to_owned(),
    })
}
