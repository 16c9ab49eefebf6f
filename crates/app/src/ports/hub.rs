//! Hub ports — start and stop one emulated bridge.
//!
//! A hub is one listener plus one discovery announcer. The scaler only
//! decides *when* hubs come and go; how a hub binds its socket and announces
//! itself is up to the [`HubLauncher`] implementation.

use std::future::Future;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use huehub_domain::error::BridgeError;

/// Addressing and lifecycle flag of a single hub.
#[derive(Debug, Clone)]
pub struct HubRecord {
    /// 0-based position in the pool.
    pub index: usize,
    /// `base_port + index`.
    pub port: u16,
    pub bind_address: IpAddr,
    closing: Arc<AtomicBool>,
}

impl HubRecord {
    /// Describe hub `index` of a pool starting at `base_port`.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::HubLaunch`] when `base_port + index` does not
    /// fit in a port number.
    pub fn new(index: usize, bind_address: IpAddr, base_port: u16) -> Result<Self, BridgeError> {
        let port = u16::try_from(index)
            .ok()
            .and_then(|offset| base_port.checked_add(offset))
            .ok_or_else(|| BridgeError::HubLaunch {
                index,
                source: format!("port {base_port} + {index} is out of range").into(),
            })?;
        Ok(Self {
            index,
            port,
            bind_address,
            closing: Arc::new(AtomicBool::new(false)),
        })
    }

    #[must_use]
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_address, self.port)
    }

    /// Whether the hub is being torn down.
    #[must_use]
    pub fn is_closing(&self) -> bool {
        self.closing.load(Ordering::Acquire)
    }

    /// Flag the hub as closing. Visible to every clone of this record.
    pub fn mark_closing(&self) {
        self.closing.store(true, Ordering::Release);
    }
}

/// Starts hubs.
pub trait HubLauncher {
    /// Handle kept by the scaler for as long as the hub is alive.
    type Handle: HubHandle + Send;

    /// Bind the hub's listener, then start its announcer.
    ///
    /// The listener must be accepting connections before the announcer
    /// advertises it.
    fn launch(
        &self,
        hub: &HubRecord,
    ) -> impl Future<Output = Result<Self::Handle, BridgeError>> + Send;
}

/// A running hub.
pub trait HubHandle {
    /// Stop answering discovery and send the byebye notifications.
    fn stop_discovery(&mut self) -> impl Future<Output = ()> + Send;

    /// Stop the listener once in-flight responses have been written.
    fn close(self) -> impl Future<Output = ()> + Send;
}
