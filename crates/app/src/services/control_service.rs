//! Control service — apply commands to devices and forward them downstream.

use std::sync::Arc;

use huehub_domain::command::{NormalizedCommand, RawCommand};
use huehub_domain::error::BridgeError;
use huehub_domain::event::{CommandOrigin, DeviceEvent};

use crate::ports::EventPublisher;
use crate::registry::DeviceRegistry;

/// Application service that turns raw payloads into device state changes.
pub struct ControlService<P> {
    registry: Arc<DeviceRegistry>,
    publisher: P,
}

impl<P: EventPublisher> ControlService<P> {
    /// Create a new service over the shared registry.
    pub fn new(registry: Arc<DeviceRegistry>, publisher: P) -> Self {
        Self {
            registry,
            publisher,
        }
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<DeviceRegistry> {
        &self.registry
    }

    /// Normalize `raw`, store the result, and publish a [`DeviceEvent`] when
    /// the device forwards its commands.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::NotFound`] for an unknown device,
    /// [`BridgeError::Normalize`] when the payload is not understood (the
    /// state is left unchanged), or an error from the publisher.
    #[tracing::instrument(skip(self, raw), fields(kind = raw.kind()))]
    pub async fn control(
        &self,
        uuid: &str,
        raw: &RawCommand,
        origin: CommandOrigin,
    ) -> Result<NormalizedCommand, BridgeError> {
        let applied = self.registry.apply(uuid, raw).inspect_err(|err| {
            if let BridgeError::Normalize(reason) = err {
                tracing::warn!(uuid = %uuid, reason = %reason, "command ignored");
            }
        })?;
        if applied.device.forward_commands {
            let event = DeviceEvent::new(&applied.device, applied.command.clone(), origin);
            self.publisher.publish(event).await?;
        }
        Ok(applied.command)
    }
}
