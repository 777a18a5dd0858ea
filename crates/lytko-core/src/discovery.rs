/// A service announcement resolved by the host's discovery layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryAnnouncement {
    /// IPv4 address (optionally with port) the device answers on.
    pub address: String,
    /// Hardware identifier from the announcement's `id` TXT record.
    pub hardware_id: String,
}
