//! Bridge service — the accessory lifecycle implementation.
//!
//! Combines the registry, the hub scaler and the control service: every
//! membership change is followed by one scaling step.

use std::sync::Arc;

use huehub_domain::command::{NormalizedCommand, RawCommand};
use huehub_domain::device::AccessoryRegistration;
use huehub_domain::error::BridgeError;
use huehub_domain::event::CommandOrigin;

use crate::hub_scaler::HubScaler;
use crate::ports::{AccessoryLifecycle, EventPublisher, HubLauncher};
use crate::registry::DeviceRegistry;
use crate::services::control_service::ControlService;

/// Drives the registry and the hub pool on behalf of the accessory runtime.
pub struct BridgeService<L: HubLauncher, P> {
    registry: Arc<DeviceRegistry>,
    scaler: Arc<HubScaler<L>>,
    control: Arc<ControlService<P>>,
}

impl<L, P> BridgeService<L, P>
where
    L: HubLauncher + Send + Sync,
    P: EventPublisher + Send + Sync,
{
    pub fn new(scaler: Arc<HubScaler<L>>, control: Arc<ControlService<P>>) -> Self {
        Self {
            registry: Arc::clone(control.registry()),
            scaler,
            control,
        }
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<DeviceRegistry> {
        &self.registry
    }

    #[must_use]
    pub fn scaler(&self) -> &Arc<HubScaler<L>> {
        &self.scaler
    }
}

impl<L, P> AccessoryLifecycle for BridgeService<L, P>
where
    L: HubLauncher + Send + Sync,
    P: EventPublisher + Send + Sync,
{
    #[tracing::instrument(skip(self, registration), fields(id = %registration.id))]
    async fn on_register(&self, registration: AccessoryRegistration) -> Result<String, BridgeError> {
        let (uuid, added) = self.registry.upsert(registration)?;
        if let Err(err) = self.scaler.scale_up(self.registry.len()).await {
            // a device no hub can serve must not stay registered
            if added {
                let _ = self.registry.deregister(&uuid);
            }
            return Err(err);
        }
        Ok(uuid)
    }

    #[tracing::instrument(skip(self))]
    async fn on_deregister(&self, uuid: &str) -> Result<(), BridgeError> {
        self.registry.deregister(uuid)?;
        self.scaler.scale_down(self.registry.len()).await;
        Ok(())
    }

    async fn on_local_input(
        &self,
        uuid: &str,
        raw: RawCommand,
    ) -> Result<NormalizedCommand, BridgeError> {
        self.control
            .control(uuid, &raw, CommandOrigin::Accessory)
            .await
    }
}
