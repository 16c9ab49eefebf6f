//! Device registry — the insertion-ordered set of accessories exposed to Alexa.
//!
//! The registry is shared by every hub. Each hub only ever sees its own
//! page of it (see [`DeviceRegistry::page`]), so enumeration order must stay
//! stable for as long as membership does not change: devices are kept in a
//! `Vec` in registration order and re-registration replaces in place.

use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use huehub_domain::command::{NormalizedCommand, RawCommand};
use huehub_domain::device::{AccessoryRegistration, DeviceRecord};
use huehub_domain::error::{BridgeError, NotFoundError, ValidationError};
use huehub_domain::identity::{format_uuid, resource_id};
use huehub_domain::normalizer::normalize;

/// Result of applying a command to a device.
#[derive(Debug, Clone)]
pub struct AppliedCommand {
    /// The device as stored after the update.
    pub device: DeviceRecord,
    pub command: NormalizedCommand,
}

/// Shared, insertion-ordered device store.
#[derive(Debug, Default)]
pub struct DeviceRegistry {
    devices: RwLock<Vec<DeviceRecord>>,
}

impl DeviceRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<DeviceRecord>> {
        self.devices.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<DeviceRecord>> {
        self.devices.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add an accessory, or replace the one registered under the same id.
    ///
    /// A replaced record keeps its position and, unless the registration
    /// carries one, its current state.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Validation`] if the registration is invalid or
    /// its key already belongs to an accessory with another id.
    pub fn register(&self, registration: AccessoryRegistration) -> Result<String, BridgeError> {
        self.upsert(registration).map(|(uuid, _)| uuid)
    }

    /// Same as [`DeviceRegistry::register`], also telling whether the
    /// accessory is new to the registry.
    ///
    /// # Errors
    ///
    /// See [`DeviceRegistry::register`].
    pub fn upsert(&self, registration: AccessoryRegistration) -> Result<(String, bool), BridgeError> {
        registration.validate()?;
        let uuid = format_uuid(&registration.id);
        let mut devices = self.write();
        if let Some(existing) = devices.iter_mut().find(|device| device.uuid == uuid) {
            if existing.id != registration.id {
                return Err(ValidationError::DuplicateUuid {
                    uuid,
                    existing_id: existing.id.clone(),
                }
                .into());
            }
            let keep_state = registration.state.is_none() && registration.device_type == existing.device_type;
            let previous = existing.state.clone();
            *existing = registration.into_record(uuid.clone());
            if keep_state {
                existing.state = previous;
            }
            tracing::debug!(uuid = %uuid, "device replaced");
            Ok((uuid, false))
        } else {
            devices.push(registration.into_record(uuid.clone()));
            tracing::debug!(uuid = %uuid, "device added");
            Ok((uuid, true))
        }
    }

    /// Remove a device.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::NotFound`] when no device has this key.
    pub fn deregister(&self, uuid: &str) -> Result<DeviceRecord, BridgeError> {
        let mut devices = self.write();
        let position = devices
            .iter()
            .position(|device| device.uuid == uuid)
            .ok_or_else(|| not_found(uuid))?;
        Ok(devices.remove(position))
    }

    /// Look up a device by registry key.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::NotFound`] when no device has this key.
    pub fn get(&self, uuid: &str) -> Result<DeviceRecord, BridgeError> {
        self.read()
            .iter()
            .find(|device| device.uuid == uuid)
            .cloned()
            .ok_or_else(|| not_found(uuid))
    }

    /// The devices served by hub `hub_index` when each hub holds at most
    /// `max_items_per_hub` devices (`0` means unlimited).
    ///
    /// Pages of consecutive hubs are disjoint and together cover the whole
    /// registry in insertion order.
    #[must_use]
    pub fn page(&self, hub_index: usize, max_items_per_hub: usize) -> Vec<DeviceRecord> {
        let devices = self.read();
        let items = page_size(devices.len(), max_items_per_hub);
        let start = hub_index.saturating_mul(items).saturating_add(1);
        let end = hub_index.saturating_add(1).saturating_mul(items).saturating_add(1);
        devices
            .iter()
            .enumerate()
            .filter(|(position, _)| (start..end).contains(&(position + 1)))
            .map(|(_, device)| device.clone())
            .collect()
    }

    /// Look up a device only if it belongs to the page of `hub_index`.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::NotFound`] when the device is unknown or served
    /// by another hub.
    pub fn get_in_page(
        &self,
        hub_index: usize,
        max_items_per_hub: usize,
        uuid: &str,
    ) -> Result<DeviceRecord, BridgeError> {
        let devices = self.read();
        let items = page_size(devices.len(), max_items_per_hub);
        devices
            .iter()
            .position(|device| device.uuid == uuid)
            .filter(|position| items > 0 && position / items == hub_index)
            .map(|position| devices[position].clone())
            .ok_or_else(|| not_found(uuid))
    }

    /// Find the device whose v2 light resource id is `id`.
    #[must_use]
    pub fn find_by_v2_id(&self, id: &str) -> Option<DeviceRecord> {
        self.read()
            .iter()
            .find(|device| resource_id("light", &device.uuid).to_string() == id)
            .cloned()
    }

    /// Normalize `raw` against the device's current state and store the result.
    ///
    /// Normalization and write-back happen under one write lock, so two
    /// concurrent commands never read the same previous state.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::NotFound`] for an unknown device and
    /// [`BridgeError::Normalize`] when the payload is not understood, in which
    /// case the state is left unchanged.
    pub fn apply(&self, uuid: &str, raw: &RawCommand) -> Result<AppliedCommand, BridgeError> {
        let mut devices = self.write();
        let device = devices
            .iter_mut()
            .find(|device| device.uuid == uuid)
            .ok_or_else(|| not_found(uuid))?;
        let command = normalize(device.device_type, &device.state, raw)?;
        device.state.apply(&command);
        Ok(AppliedCommand {
            device: device.clone(),
            command,
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Every device, in registration order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<DeviceRecord> {
        self.read().clone()
    }
}

fn page_size(device_count: usize, max_items_per_hub: usize) -> usize {
    if max_items_per_hub == 0 {
        device_count
    } else {
        max_items_per_hub
    }
}

fn not_found(uuid: &str) -> BridgeError {
    NotFoundError {
        entity: "Device",
        id: uuid.to_string(),
    }
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use huehub_domain::device::{DeviceState, DeviceType};
    use huehub_domain::error::NormalizeError;

    fn registration(id: &str) -> AccessoryRegistration {
        AccessoryRegistration::builder()
            .id(id)
            .name(format!("Device {id}"))
            .build()
            .unwrap()
    }

    fn registry_with(count: usize) -> DeviceRegistry {
        let registry = DeviceRegistry::new();
        for i in 0..count {
            registry.register(registration(&format!("d{i}"))).unwrap();
        }
        registry
    }

    #[test]
    fn should_derive_uuid_from_id() {
        let registry = DeviceRegistry::new();
        let uuid = registry.register(registration("node.12.3")).unwrap();
        assert_eq!(uuid, "node123");
        assert_eq!(registry.get("node123").unwrap().id, "node.12.3");
    }

    #[test]
    fn should_replace_in_place_when_registered_twice() {
        let registry = registry_with(3);
        let renamed = AccessoryRegistration::builder()
            .id("d1")
            .name("Renamed")
            .build()
            .unwrap();
        registry.register(renamed).unwrap();

        let names: Vec<String> = registry.snapshot().into_iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["Device d0", "Renamed", "Device d2"]);
    }

    #[test]
    fn should_keep_state_when_re_registered_without_one() {
        let registry = registry_with(1);
        registry.apply("d0", &RawCommand::Bool(true)).unwrap();
        registry.register(registration("d0")).unwrap();
        assert!(registry.get("d0").unwrap().state.on);
    }

    #[test]
    fn should_reject_colliding_ids() {
        let registry = DeviceRegistry::new();
        registry.register(registration("a.b")).unwrap();

        let result = registry.register(registration("ab"));
        assert!(matches!(
            result,
            Err(BridgeError::Validation(ValidationError::DuplicateUuid { ref uuid, ref existing_id }))
                if uuid == "ab" && existing_id == "a.b"
        ));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("ab").unwrap().name, "Device a.b");
    }

    #[test]
    fn should_report_whether_device_is_new() {
        let registry = DeviceRegistry::new();
        assert_eq!(registry.upsert(registration("d0")).unwrap(), ("d0".to_string(), true));
        assert_eq!(registry.upsert(registration("d0")).unwrap(), ("d0".to_string(), false));
    }

    #[test]
    fn should_deregister_last_device() {
        let registry = registry_with(1);
        registry.deregister("d0").unwrap();
        assert!(registry.is_empty());
    }

    #[test]
    fn should_return_not_found_for_unknown_device() {
        let registry = DeviceRegistry::new();
        assert!(matches!(registry.get("nope"), Err(BridgeError::NotFound(_))));
        assert!(matches!(
            registry.deregister("nope"),
            Err(BridgeError::NotFound(_))
        ));
    }

    #[test]
    fn should_cover_registry_with_disjoint_pages() {
        for count in 0..12 {
            for max in 1..5 {
                let registry = registry_with(count);
                let hubs = count.div_ceil(max).max(1);
                let mut seen = Vec::new();
                for hub in 0..hubs {
                    let page = registry.page(hub, max);
                    assert!(page.len() <= max);
                    seen.extend(page.into_iter().map(|d| d.uuid));
                }
                let all: Vec<String> = registry.snapshot().into_iter().map(|d| d.uuid).collect();
                assert_eq!(seen, all, "count {count} max {max}");
                assert!(registry.page(hubs, max).is_empty());
            }
        }
    }

    #[test]
    fn should_put_everything_on_first_hub_when_unlimited() {
        let registry = registry_with(7);
        assert_eq!(registry.page(0, 0).len(), 7);
        assert!(registry.page(1, 0).is_empty());
    }

    #[test]
    fn should_only_find_devices_in_own_page() {
        let registry = registry_with(5);
        assert!(registry.get_in_page(2, 2, "d4").is_ok());
        assert!(registry.get_in_page(0, 2, "d4").is_err());
        assert!(registry.get_in_page(0, 0, "d4").is_ok());
    }

    #[test]
    fn should_find_device_by_v2_id() {
        let registry = registry_with(2);
        let id = resource_id("light", "d1").to_string();
        assert_eq!(registry.find_by_v2_id(&id).unwrap().uuid, "d1");
        assert!(registry.find_by_v2_id("missing").is_none());
    }

    #[test]
    fn should_store_normalized_state() {
        let registry = registry_with(1);
        let applied = registry
            .apply("d0", &RawCommand::from_json(&serde_json::json!({"bri": 100})))
            .unwrap();
        assert_eq!(applied.command.bri, 100);
        assert_eq!(registry.get("d0").unwrap().state.bri, 100);
    }

    #[test]
    fn should_leave_state_unchanged_on_unrecognized_command() {
        let registry = DeviceRegistry::new();
        let state = DeviceState::initial(DeviceType::DimmableLight);
        registry
            .register(
                AccessoryRegistration::builder()
                    .id("lamp")
                    .name("Lamp")
                    .state(state.clone())
                    .build()
                    .unwrap(),
            )
            .unwrap();

        let result = registry.apply("lamp", &RawCommand::Unsupported("null"));
        assert!(matches!(
            result,
            Err(BridgeError::Normalize(NormalizeError::Unrecognized(_)))
        ));
        assert_eq!(registry.get("lamp").unwrap().state, state);
    }
}
