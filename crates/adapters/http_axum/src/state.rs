//! Shared application state for axum handlers.

use std::sync::Arc;

use huehub_app::ports::{EventPublisher, HubRecord};
use huehub_app::registry::DeviceRegistry;
use huehub_app::services::control_service::ControlService;
use huehub_domain::device::DeviceRecord;
use huehub_domain::error::BridgeError;
use huehub_domain::identity::HubIdentity;

use crate::sse::SseClients;

/// Bridge-wide settings every hub presents.
#[derive(Debug, Clone)]
pub struct BridgeSettings {
    /// Friendly name shown in the descriptor and the v1 config.
    pub name: String,
    /// Username handed out on registration.
    pub default_username: String,
    /// IANA time zone reported by the bridge.
    pub timezone: String,
    /// Host (usually an IP) that clients use to reach the hubs.
    pub advertise_host: String,
    /// `http` or `https`, used in the descriptor's `URLBase`.
    pub protocol: String,
    /// `0` means a single hub serves every device.
    pub max_items_per_hub: usize,
}

/// State shared by the handlers of one hub.
///
/// Generic over the event publisher to avoid dynamic dispatch.
/// `Clone` is implemented manually so the publisher does not need to be
/// `Clone` — only the `Arc` wrappers are cloned.
pub struct AppState<P> {
    pub registry: Arc<DeviceRegistry>,
    pub control: Arc<ControlService<P>>,
    /// The hub this router serves.
    pub hub: HubRecord,
    pub identity: Arc<HubIdentity>,
    pub settings: Arc<BridgeSettings>,
    /// v2 event stream subscribers of this hub.
    pub sse: Arc<SseClients>,
}

impl<P> Clone for AppState<P> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
            control: Arc::clone(&self.control),
            hub: self.hub.clone(),
            identity: Arc::clone(&self.identity),
            settings: Arc::clone(&self.settings),
            sse: Arc::clone(&self.sse),
        }
    }
}

impl<P> AppState<P>
where
    P: EventPublisher + Send + Sync + 'static,
{
    /// Create the state of `hub`.
    pub fn new(
        control: Arc<ControlService<P>>,
        hub: HubRecord,
        identity: HubIdentity,
        settings: Arc<BridgeSettings>,
    ) -> Self {
        Self {
            registry: Arc::clone(control.registry()),
            identity: Arc::new(identity),
            control,
            hub,
            settings,
            sse: Arc::new(SseClients::default()),
        }
    }

    /// The devices this hub serves.
    #[must_use]
    pub fn page(&self) -> Vec<DeviceRecord> {
        self.registry
            .page(self.hub.index, self.settings.max_items_per_hub)
    }

    /// Look up a device of this hub's page.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::NotFound`] when the device is unknown or served
    /// by another hub.
    pub fn device(&self, uuid: &str) -> Result<DeviceRecord, BridgeError> {
        self.registry
            .get_in_page(self.hub.index, self.settings.max_items_per_hub, uuid)
    }

    /// Look up a device of this hub's page by v2 light id.
    #[must_use]
    pub fn device_by_v2_id(&self, id: &str) -> Option<DeviceRecord> {
        self.registry
            .find_by_v2_id(id)
            .and_then(|device| self.device(&device.uuid).ok())
    }
}
