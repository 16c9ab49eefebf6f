//! v2 (CLIP) wire model.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use huehub_domain::command::{CommandKind, NormalizedCommand};
use huehub_domain::device::{DeviceRecord, DeviceType};
use huehub_domain::identity::{HubIdentity, resource_id};
use huehub_domain::normalizer::{MAX_MIREK, MIN_MIREK, bri_to_brightness};
use huehub_domain::time::{Timestamp, hue_datetime};

use crate::state::BridgeSettings;
use crate::v1::model::{GAMUT_C, LIGHT_SW_VERSION, MANUFACTURER, WhitelistEntry, whitelist};

/// Lowest brightness percent a light can be dimmed to.
const MIN_DIM_LEVEL: f64 = 0.2;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResourceRef {
    pub rid: Uuid,
    pub rtype: String,
}

impl ResourceRef {
    #[must_use]
    pub fn new(rid: Uuid, rtype: &str) -> Self {
        Self {
            rid,
            rtype: rtype.to_string(),
        }
    }
}

/// v2 light id of a device.
#[must_use]
pub fn light_id(device: &DeviceRecord) -> Uuid {
    resource_id("light", &device.uuid)
}

/// v2 device id of a device.
#[must_use]
pub fn device_id(device: &DeviceRecord) -> Uuid {
    resource_id("device", &device.uuid)
}

fn id_v1(device: &DeviceRecord) -> String {
    format!("/lights/{}", device.uuid)
}

#[derive(Debug, Serialize)]
pub struct Metadata {
    pub name: String,
    pub archetype: &'static str,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct On {
    pub on: bool,
}

#[derive(Debug, Serialize)]
pub struct Dimming {
    pub brightness: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_dim_level: Option<f64>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Xy {
    pub x: f64,
    pub y: f64,
}

impl From<[f64; 2]> for Xy {
    fn from([x, y]: [f64; 2]) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Serialize)]
pub struct Gamut {
    pub red: Xy,
    pub green: Xy,
    pub blue: Xy,
}

#[derive(Debug, Serialize)]
pub struct Color {
    pub xy: Xy,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gamut: Option<Gamut>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gamut_type: Option<&'static str>,
}

#[derive(Debug, Serialize)]
pub struct MirekSchema {
    pub mirek_minimum: u16,
    pub mirek_maximum: u16,
}

#[derive(Debug, Serialize)]
pub struct ColorTemperature {
    pub mirek: Option<u16>,
    pub mirek_valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mirek_schema: Option<MirekSchema>,
}

#[derive(Debug, Serialize)]
pub struct Dynamics {
    pub status: &'static str,
    pub status_values: [&'static str; 1],
    pub speed: f64,
    pub speed_valid: bool,
}

#[derive(Debug, Serialize)]
pub struct Alert {
    pub action_values: [&'static str; 1],
}

#[derive(Debug, Serialize)]
pub struct Signaling {
    pub signal_values: [&'static str; 2],
}

#[derive(Debug, Serialize)]
pub struct Effects {
    pub status: &'static str,
    pub status_values: [&'static str; 1],
    pub effect_values: [&'static str; 1],
}

/// A v2 `light` resource.
#[derive(Debug, Serialize)]
pub struct LightResource {
    pub id: Uuid,
    pub id_v1: String,
    pub owner: ResourceRef,
    pub metadata: Metadata,
    pub on: On,
    pub dimming: Dimming,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color_temperature: Option<ColorTemperature>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<Color>,
    pub dynamics: Dynamics,
    pub alert: Alert,
    pub signaling: Signaling,
    pub mode: &'static str,
    pub effects: Effects,
    pub service_id: u8,
    #[serde(rename = "type")]
    pub kind: &'static str,
}

impl LightResource {
    #[must_use]
    pub fn from_device(device: &DeviceRecord) -> Self {
        let ty = device.device_type;
        let state = &device.state;
        Self {
            id: light_id(device),
            id_v1: id_v1(device),
            owner: ResourceRef::new(device_id(device), "device"),
            metadata: Metadata {
                name: device.name.clone(),
                archetype: ty.archetype(),
            },
            on: On { on: state.on },
            dimming: Dimming {
                brightness: f64::from(bri_to_brightness(state.bri)),
                min_dim_level: Some(MIN_DIM_LEVEL),
            },
            color_temperature: ty.supports_color_temperature().then(|| ColorTemperature {
                mirek: state.ct,
                mirek_valid: state.ct.is_some(),
                mirek_schema: Some(MirekSchema {
                    mirek_minimum: MIN_MIREK,
                    mirek_maximum: MAX_MIREK,
                }),
            }),
            color: color_of(ty, state.xy),
            dynamics: Dynamics {
                status: "none",
                status_values: ["none"],
                speed: 0.0,
                speed_valid: false,
            },
            alert: Alert {
                action_values: ["breathe"],
            },
            signaling: Signaling {
                signal_values: ["no_signal", "on_off"],
            },
            mode: "normal",
            effects: Effects {
                status: "no_effect",
                status_values: ["no_effect"],
                effect_values: ["no_effect"],
            },
            service_id: 0,
            kind: "light",
        }
    }
}

fn color_of(ty: DeviceType, xy: Option<[f64; 2]>) -> Option<Color> {
    if !ty.supports_color() {
        return None;
    }
    let [red, green, blue] = GAMUT_C;
    xy.map(|xy| Color {
        xy: xy.into(),
        gamut: Some(Gamut {
            red: red.into(),
            green: green.into(),
            blue: blue.into(),
        }),
        gamut_type: Some("C"),
    })
}

/// The changed attributes of a light, as pushed on the event stream.
#[derive(Debug, Serialize)]
pub struct LightUpdate {
    pub id: Uuid,
    pub id_v1: String,
    pub owner: ResourceRef,
    pub on: On,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dimming: Option<Dimming>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<Color>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color_temperature: Option<ColorTemperature>,
    #[serde(rename = "type")]
    pub kind: &'static str,
}

impl LightUpdate {
    /// What `command` changed on `device` (already updated).
    #[must_use]
    pub fn new(device: &DeviceRecord, command: &NormalizedCommand) -> Self {
        let ty = device.device_type;
        let color = command.command == CommandKind::Color;
        Self {
            id: light_id(device),
            id_v1: id_v1(device),
            owner: ResourceRef::new(device_id(device), "device"),
            on: On { on: device.state.on },
            dimming: ty.supports_dimming().then(|| Dimming {
                brightness: f64::from(bri_to_brightness(device.state.bri)),
                min_dim_level: None,
            }),
            color: command.xy.filter(|_| color).map(|xy| Color {
                xy: xy.into(),
                gamut: None,
                gamut_type: None,
            }),
            color_temperature: command.ct.filter(|_| color).map(|mirek| ColorTemperature {
                mirek: Some(mirek),
                mirek_valid: true,
                mirek_schema: None,
            }),
            kind: "light",
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ProductData {
    pub model_id: &'static str,
    pub manufacturer_name: &'static str,
    pub product_name: &'static str,
    pub product_archetype: &'static str,
    pub certified: bool,
    pub software_version: &'static str,
}

/// A v2 `device` resource, one per light.
#[derive(Debug, Serialize)]
pub struct DeviceResource {
    pub id: Uuid,
    pub id_v1: String,
    pub product_data: ProductData,
    pub metadata: Metadata,
    pub services: Vec<ResourceRef>,
    #[serde(rename = "type")]
    pub kind: &'static str,
}

impl DeviceResource {
    #[must_use]
    pub fn from_device(device: &DeviceRecord) -> Self {
        let ty = device.device_type;
        Self {
            id: device_id(device),
            id_v1: id_v1(device),
            product_data: ProductData {
                model_id: ty.model_id(),
                manufacturer_name: MANUFACTURER,
                product_name: ty.product_name(),
                product_archetype: ty.archetype(),
                certified: true,
                software_version: LIGHT_SW_VERSION,
            },
            metadata: Metadata {
                name: device.name.clone(),
                archetype: ty.archetype(),
            },
            services: vec![ResourceRef::new(light_id(device), "light")],
            kind: "device",
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TimeZone {
    pub time_zone: String,
}

/// The v2 `bridge` resource, with the live network identity of the hub.
#[derive(Debug, Serialize)]
pub struct BridgeResource {
    pub id: Uuid,
    pub id_v1: String,
    pub owner: ResourceRef,
    pub bridge_id: String,
    pub time_zone: TimeZone,
    pub ipaddress: String,
    pub mac_address: String,
    #[serde(rename = "UTC")]
    pub utc: String,
    pub localtime: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub whitelist: BTreeMap<String, WhitelistEntry>,
    #[serde(rename = "type")]
    pub kind: &'static str,
}

impl BridgeResource {
    #[must_use]
    pub fn new(
        settings: &BridgeSettings,
        identity: &HubIdentity,
        username: Option<&str>,
        at: Timestamp,
    ) -> Self {
        let clock = hue_datetime(at);
        Self {
            id: resource_id("bridge", &identity.bridge_id),
            id_v1: String::new(),
            owner: ResourceRef::new(resource_id("device", &identity.bridge_id), "device"),
            bridge_id: identity.bridge_id.to_ascii_lowercase(),
            time_zone: TimeZone {
                time_zone: settings.timezone.clone(),
            },
            ipaddress: settings.advertise_host.clone(),
            mac_address: identity.mac_lower(),
            utc: clock.clone(),
            localtime: clock.clone(),
            whitelist: whitelist(username, &clock),
            kind: "bridge",
        }
    }
}

/// `PUT /clip/v2/resource/light/{id}` body. Unknown fields are ignored.
#[derive(Debug, Default, Deserialize)]
pub struct LightUpdateRequest {
    pub on: Option<On>,
    pub dimming: Option<DimmingRequest>,
    pub color: Option<ColorRequest>,
    pub color_temperature: Option<ColorTemperatureRequest>,
}

#[derive(Debug, Deserialize)]
pub struct DimmingRequest {
    pub brightness: f64,
}

#[derive(Debug, Deserialize)]
pub struct ColorRequest {
    pub xy: Xy,
}

#[derive(Debug, Deserialize)]
pub struct ColorTemperatureRequest {
    pub mirek: f64,
}

/// `{"success": {rid, rtype}}` data entry of a v2 PUT.
#[derive(Debug, Serialize)]
pub struct PutSuccess {
    pub success: ResourceRef,
}

#[cfg(test)]
mod tests {
    use super::*;
    use huehub_domain::device::AccessoryRegistration;

    fn device(ty: DeviceType) -> DeviceRecord {
        AccessoryRegistration::builder()
            .id("lamp")
            .name("Lamp")
            .device_type(ty)
            .build()
            .unwrap()
            .into_record("lamp".to_string())
    }

    #[test]
    fn should_link_light_to_owning_device() {
        let device = device(DeviceType::DimmableLight);
        let light = LightResource::from_device(&device);
        let owner = DeviceResource::from_device(&device);
        assert_eq!(light.owner.rid, owner.id);
        assert_eq!(owner.services[0].rid, light.id);
    }

    #[test]
    fn should_report_brightness_as_percent() {
        let mut device = device(DeviceType::DimmableLight);
        device.state.bri = 127;
        let json = serde_json::to_value(LightResource::from_device(&device)).unwrap();
        assert_eq!(json["dimming"]["brightness"], 50.0);
        assert!(json.get("color").is_none());
        assert!(json.get("color_temperature").is_none());
    }

    #[test]
    fn should_render_dimming_for_every_device_type() {
        for ty in [DeviceType::OnOffPlug, DeviceType::TemperatureSensor] {
            let mut device = device(ty);
            device.state.bri = 254;
            let json = serde_json::to_value(LightResource::from_device(&device)).unwrap();
            assert_eq!(json["dimming"]["brightness"], 100.0, "{ty:?}");
            assert_eq!(json["dimming"]["min_dim_level"], MIN_DIM_LEVEL, "{ty:?}");
        }
    }

    #[test]
    fn should_render_color_blocks_for_extended_color_lights() {
        let json =
            serde_json::to_value(LightResource::from_device(&device(DeviceType::ExtendedColorLight)))
                .unwrap();
        assert_eq!(json["color"]["gamut_type"], "C");
        assert_eq!(json["color_temperature"]["mirek"], 366);
        assert_eq!(json["id_v1"], "/lights/lamp");
    }

    #[test]
    fn should_ignore_unknown_fields_in_update_request() {
        let request: LightUpdateRequest =
            serde_json::from_value(serde_json::json!({"on": {"on": true}, "dynamics": {"duration": 400}}))
                .unwrap();
        assert!(request.on.is_some());
        assert!(request.dimming.is_none());
    }
}
