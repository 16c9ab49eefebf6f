//! Hub scaler — keeps the number of running hubs in line with the registry.
//!
//! Alexa caps the number of lights it accepts per bridge, so the registry is
//! split across a pool of hubs holding at most `max_items_per_hub` devices
//! each. The pool grows by one hub when a registration pushes the registry
//! past the current capacity, and shrinks by one (highest index first) when
//! a removal leaves a hub with nothing to serve. There is always at least
//! one hub.

use std::net::IpAddr;

use tokio::sync::Mutex;

use huehub_domain::error::BridgeError;

use crate::ports::{HubHandle, HubLauncher, HubRecord};

/// Number of hubs needed to serve `device_count` devices.
#[must_use]
pub fn needed_hubs(device_count: usize, max_items_per_hub: usize) -> usize {
    if max_items_per_hub == 0 {
        1
    } else {
        device_count.div_ceil(max_items_per_hub).max(1)
    }
}

/// Pool addressing and capacity.
#[derive(Debug, Clone)]
pub struct ScalerSettings {
    pub bind_address: IpAddr,
    /// Port of hub 0; hub `i` listens on `base_port + i`.
    pub base_port: u16,
    /// `0` means a single hub serves every device.
    pub max_items_per_hub: usize,
}

/// What a scaling step did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScaleChange {
    Unchanged,
    Launched(usize),
    Removed(usize),
}

struct ActiveHub<H> {
    record: HubRecord,
    handle: H,
}

/// Owns the running hubs, indexed by hub index.
pub struct HubScaler<L: HubLauncher> {
    launcher: L,
    settings: ScalerSettings,
    hubs: Mutex<Vec<ActiveHub<L::Handle>>>,
}

impl<L: HubLauncher> HubScaler<L> {
    #[must_use]
    pub fn new(launcher: L, settings: ScalerSettings) -> Self {
        Self {
            launcher,
            settings,
            hubs: Mutex::new(Vec::new()),
        }
    }

    #[must_use]
    pub fn settings(&self) -> &ScalerSettings {
        &self.settings
    }

    /// Launch hub 0 if the pool is empty.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::HubLaunch`] if the hub fails to start.
    pub async fn start(&self) -> Result<(), BridgeError> {
        let mut hubs = self.hubs.lock().await;
        if hubs.is_empty() {
            self.launch_next(&mut hubs).await?;
        }
        Ok(())
    }

    /// Grow the pool by one hub if `device_count` exceeds its capacity.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::HubLaunch`] if the new hub fails to start; the
    /// pool is left unchanged.
    #[tracing::instrument(skip(self))]
    pub async fn scale_up(&self, device_count: usize) -> Result<ScaleChange, BridgeError> {
        let mut hubs = self.hubs.lock().await;
        if needed_hubs(device_count, self.settings.max_items_per_hub) > hubs.len() {
            let index = self.launch_next(&mut hubs).await?;
            return Ok(ScaleChange::Launched(index));
        }
        Ok(ScaleChange::Unchanged)
    }

    /// Remove the highest-indexed hub if `device_count` no longer needs it.
    ///
    /// The hub is flagged as closing before its announcer is stopped, and the
    /// announcer is stopped before the listener is closed. The last hub is
    /// never removed.
    #[tracing::instrument(skip(self))]
    pub async fn scale_down(&self, device_count: usize) -> ScaleChange {
        let mut hubs = self.hubs.lock().await;
        let needed = needed_hubs(device_count, self.settings.max_items_per_hub);
        if needed >= hubs.len() || hubs.len() <= 1 {
            return ScaleChange::Unchanged;
        }
        match hubs.pop() {
            Some(hub) => {
                let index = hub.record.index;
                teardown(hub).await;
                ScaleChange::Removed(index)
            }
            None => ScaleChange::Unchanged,
        }
    }

    /// Tear down every hub, highest index first.
    pub async fn shutdown(&self) {
        let mut hubs = self.hubs.lock().await;
        while let Some(hub) = hubs.pop() {
            teardown(hub).await;
        }
    }

    /// Records of the running hubs, by index.
    pub async fn hubs(&self) -> Vec<HubRecord> {
        self.hubs
            .lock()
            .await
            .iter()
            .map(|hub| hub.record.clone())
            .collect()
    }

    async fn launch_next(&self, hubs: &mut Vec<ActiveHub<L::Handle>>) -> Result<usize, BridgeError> {
        let index = hubs.len();
        let record = HubRecord::new(index, self.settings.bind_address, self.settings.base_port)
            .inspect_err(|err| tracing::error!(hub = index, error = %err, "invalid hub address"))?;
        let handle = self
            .launcher
            .launch(&record)
            .await
            .inspect_err(|err| tracing::error!(hub = index, error = %err, "unable to launch hub"))?;
        tracing::info!(hub = index, port = record.port, "hub started");
        hubs.push(ActiveHub { record, handle });
        Ok(index)
    }
}

async fn teardown<H: HubHandle>(hub: ActiveHub<H>) {
    let ActiveHub { record, mut handle } = hub;
    record.mark_closing();
    handle.stop_discovery().await;
    handle.close().await;
    tracing::info!(hub = record.index, port = record.port, "hub stopped");
}
