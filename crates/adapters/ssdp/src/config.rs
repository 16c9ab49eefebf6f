//! SSDP announcer configuration.

use std::net::Ipv4Addr;
use std::time::Duration;

use serde::Deserialize;

/// Configuration shared by the announcers of every hub.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SsdpConfig {
    /// Start an announcer next to each hub listener.
    pub enabled: bool,
    /// Interface used to join the multicast group (`0.0.0.0` lets the OS pick).
    pub interface: Ipv4Addr,
    /// Seconds between two rounds of `NOTIFY ssdp:alive`.
    pub notify_interval_secs: u16,
    /// Value of the `CACHE-CONTROL: max-age` header, in seconds.
    pub max_age_secs: u16,
}

impl SsdpConfig {
    pub(crate) fn notify_interval(&self) -> Duration {
        Duration::from_secs(u64::from(self.notify_interval_secs.max(1)))
    }
}

impl Default for SsdpConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interface: Ipv4Addr::UNSPECIFIED,
            notify_interval_secs: 30,
            max_age_secs: 100,
        }
    }
}
