//! Device event — an immutable record of a state change on an accessory.
//!
//! Events are produced whenever a normalized command is applied to a device
//! that forwards its commands, and are published toward the downstream
//! runtime over the in-process event bus.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::command::NormalizedCommand;
use crate::device::DeviceRecord;
use crate::time::{Timestamp, now};

/// Where a command came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandOrigin {
    /// The voice assistant, through the v1 or v2 API.
    Alexa,
    /// The accessory itself reported a local change.
    Accessory,
}

/// A normalized command applied to a device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceEvent {
    pub event_id: Uuid,
    /// Registry key of the device.
    pub uuid: String,
    /// Opaque id of the owning accessory.
    pub id: String,
    pub command: NormalizedCommand,
    pub origin: CommandOrigin,
    pub timestamp: Timestamp,
}

impl DeviceEvent {
    /// Create an event for `device`, timestamped now.
    #[must_use]
    pub fn new(device: &DeviceRecord, command: NormalizedCommand, origin: CommandOrigin) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            uuid: device.uuid.clone(),
            id: device.id.clone(),
            command,
            origin,
            timestamp: now(),
        }
    }
}
