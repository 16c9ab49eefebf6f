//! v1 wire model.
//!
//! Responses are built structurally: optional attributes are skipped when
//! they make no sense for a device type, and empty collections are left out
//! of the output entirely.

use std::collections::BTreeMap;
use std::net::Ipv4Addr;

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

use huehub_domain::command::ColorMode;
use huehub_domain::device::{DeviceRecord, DeviceType};
use huehub_domain::identity::{HubIdentity, light_unique_id, resource_id};
use huehub_domain::normalizer::{MAX_MIREK, MIN_MIREK};
use huehub_domain::time::{Timestamp, hue_datetime};

use crate::state::BridgeSettings;

pub const MANUFACTURER: &str = "Signify Netherlands B.V.";
pub const LIGHT_SW_VERSION: &str = "1.104.2";
pub const BRIDGE_MODEL_ID: &str = "BSB002";
pub const BRIDGE_SW_VERSION: &str = "1967054020";
pub const API_VERSION: &str = "1.67.0";
pub const DATASTORE_VERSION: &str = "131";

/// Wide color gamut ("C") corners: red, green, blue.
pub const GAMUT_C: [[f64; 2]; 3] = [[0.6915, 0.3083], [0.17, 0.7], [0.1532, 0.0475]];

/// `state` object of a v1 light.
#[derive(Debug, Serialize)]
pub struct LightState {
    pub on: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bri: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hue: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sat: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub effect: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub xy: Option<[f64; 2]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ct: Option<u16>,
    pub alert: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub colormode: Option<ColorMode>,
    pub mode: &'static str,
    pub reachable: bool,
}

impl LightState {
    #[must_use]
    pub fn from_device(device: &DeviceRecord) -> Self {
        let ty = device.device_type;
        let state = &device.state;
        let color = ty.supports_color();
        let ct = ty.supports_color_temperature();
        Self {
            on: state.on,
            bri: ty.supports_dimming().then_some(state.bri),
            hue: if color { state.hue } else { None },
            sat: if color { state.sat } else { None },
            effect: color.then_some("none"),
            xy: if color { state.xy } else { None },
            ct: if ct { state.ct } else { None },
            alert: "none",
            colormode: if color || ct { state.color_mode } else { None },
            mode: "homeautomation",
            reachable: true,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CtRange {
    pub min: u16,
    pub max: u16,
}

#[derive(Debug, Serialize)]
pub struct Control {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mindimlevel: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maxlumen: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub colorgamuttype: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub colorgamut: Option<[[f64; 2]; 3]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ct: Option<CtRange>,
}

#[derive(Debug, Serialize)]
pub struct Streaming {
    pub renderer: bool,
    pub proxy: bool,
}

#[derive(Debug, Serialize)]
pub struct Capabilities {
    pub certified: bool,
    pub control: Control,
    pub streaming: Streaming,
}

impl Capabilities {
    #[must_use]
    pub fn for_type(ty: DeviceType) -> Self {
        let color = ty.supports_color();
        Self {
            certified: true,
            control: Control {
                mindimlevel: ty.supports_dimming().then_some(1000),
                maxlumen: ty.supports_dimming().then_some(800),
                colorgamuttype: color.then_some("C"),
                colorgamut: color.then_some(GAMUT_C),
                ct: ty.supports_color_temperature().then_some(CtRange {
                    min: MIN_MIREK,
                    max: MAX_MIREK,
                }),
            },
            streaming: Streaming {
                renderer: color,
                proxy: color,
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LightConfig {
    pub archetype: &'static str,
    pub function: &'static str,
    pub direction: &'static str,
}

/// A v1 light.
#[derive(Debug, Serialize)]
pub struct Light {
    pub state: LightState,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub name: String,
    pub modelid: &'static str,
    pub manufacturername: &'static str,
    pub productname: &'static str,
    pub capabilities: Capabilities,
    pub config: LightConfig,
    pub uniqueid: String,
    pub swversion: &'static str,
}

impl Light {
    #[must_use]
    pub fn from_device(device: &DeviceRecord) -> Self {
        let ty = device.device_type;
        Self {
            state: LightState::from_device(device),
            kind: ty.v1_type(),
            name: device.name.clone(),
            modelid: ty.model_id(),
            manufacturername: MANUFACTURER,
            productname: ty.product_name(),
            capabilities: Capabilities::for_type(ty),
            config: LightConfig {
                archetype: ty.archetype(),
                function: "mixed",
                direction: "omnidirectional",
            },
            uniqueid: light_unique_id(&device.uuid),
            swversion: LIGHT_SW_VERSION,
        }
    }
}

/// Lights keyed by registry key, in page order.
#[derive(Debug, Default)]
pub struct LightMap(pub Vec<(String, Light)>);

impl LightMap {
    #[must_use]
    pub fn from_devices(devices: &[DeviceRecord]) -> Self {
        Self(
            devices
                .iter()
                .map(|device| (device.uuid.clone(), Light::from_device(device)))
                .collect(),
        )
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for LightMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (key, light) in &self.0 {
            map.serialize_entry(key, light)?;
        }
        map.end()
    }
}

/// A whitelisted API user.
#[derive(Debug, Serialize)]
pub struct WhitelistEntry {
    #[serde(rename = "last use date")]
    pub last_use_date: String,
    #[serde(rename = "create date")]
    pub create_date: String,
    pub name: String,
}

/// `config` object of the bridge.
#[derive(Debug, Serialize)]
pub struct BridgeConfig {
    pub name: String,
    pub zigbeechannel: u8,
    pub bridgeid: String,
    pub mac: String,
    pub dhcp: bool,
    pub ipaddress: String,
    pub netmask: &'static str,
    pub gateway: String,
    pub proxyaddress: &'static str,
    pub proxyport: u16,
    #[serde(rename = "UTC")]
    pub utc: String,
    pub localtime: String,
    pub timezone: String,
    pub modelid: &'static str,
    pub datastoreversion: &'static str,
    pub swversion: &'static str,
    pub apiversion: &'static str,
    pub linkbutton: bool,
    pub portalservices: bool,
    pub factorynew: bool,
    pub replacesbridgeid: Option<String>,
    pub starterkitid: &'static str,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub whitelist: BTreeMap<String, WhitelistEntry>,
}

impl BridgeConfig {
    /// Config as seen by `username` (if any) at `at`.
    #[must_use]
    pub fn new(
        settings: &BridgeSettings,
        identity: &HubIdentity,
        username: Option<&str>,
        at: Timestamp,
    ) -> Self {
        let clock = hue_datetime(at);
        Self {
            name: settings.name.clone(),
            zigbeechannel: 15,
            bridgeid: identity.bridge_id.clone(),
            mac: identity.mac_lower(),
            dhcp: true,
            ipaddress: settings.advertise_host.clone(),
            netmask: "255.255.255.0",
            gateway: gateway_for(&settings.advertise_host),
            proxyaddress: "none",
            proxyport: 0,
            utc: clock.clone(),
            localtime: clock.clone(),
            timezone: settings.timezone.clone(),
            modelid: BRIDGE_MODEL_ID,
            datastoreversion: DATASTORE_VERSION,
            swversion: BRIDGE_SW_VERSION,
            apiversion: API_VERSION,
            linkbutton: true,
            portalservices: false,
            factorynew: false,
            replacesbridgeid: None,
            starterkitid: "",
            whitelist: whitelist(username, &clock),
        }
    }
}

/// Single-entry whitelist for `username`, empty without one.
#[must_use]
pub fn whitelist(username: Option<&str>, clock: &str) -> BTreeMap<String, WhitelistEntry> {
    username
        .map(|username| {
            (
                username.to_string(),
                WhitelistEntry {
                    last_use_date: clock.to_string(),
                    create_date: clock.to_string(),
                    name: "Echo".to_string(),
                },
            )
        })
        .into_iter()
        .collect()
}

/// Default gateway guess: the `.1` address of the host's /24.
fn gateway_for(host: &str) -> String {
    host.parse::<Ipv4Addr>().map_or_else(
        |_| host.to_string(),
        |ip| {
            let [a, b, c, _] = ip.octets();
            Ipv4Addr::new(a, b, c, 1).to_string()
        },
    )
}

/// `GET /api/{username}` body.
#[derive(Debug, Serialize)]
pub struct FullState {
    #[serde(skip_serializing_if = "LightMap::is_empty")]
    pub lights: LightMap,
    pub config: BridgeConfig,
}

/// `POST /api` body.
#[derive(Debug, Default, Deserialize)]
pub struct RegistrationRequest {
    #[serde(default)]
    pub devicetype: Option<String>,
    #[serde(default)]
    pub generateclientkey: bool,
}

#[derive(Debug, Serialize)]
pub struct Registration {
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clientkey: Option<String>,
}

impl Registration {
    /// Hand out `username`, with a client key derived from it on request.
    #[must_use]
    pub fn new(username: &str, with_client_key: bool) -> Self {
        Self {
            username: username.to_string(),
            clientkey: with_client_key.then(|| {
                resource_id("clientkey", username)
                    .simple()
                    .to_string()
                    .to_ascii_uppercase()
            }),
        }
    }
}

/// Hue `{"success": ...}` wrapper.
#[derive(Debug, Serialize)]
pub struct Success<T> {
    pub success: T,
}

#[derive(Debug, Serialize)]
pub struct HueErrorDetail {
    #[serde(rename = "type")]
    pub kind: u16,
    pub address: String,
    pub description: String,
}

/// Hue `{"error": ...}` wrapper, reported with a `200` status.
#[derive(Debug, Serialize)]
pub struct HueError {
    pub error: HueErrorDetail,
}

/// Hue v1 error type for an invalid parameter value.
pub const INVALID_VALUE: u16 = 7;

#[cfg(test)]
mod tests {
    use super::*;
    use huehub_domain::device::AccessoryRegistration;
    use serde_json::json;

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
    fn should_omit_color_attributes_for_dimmable_lights() {
        let json = serde_json::to_value(Light::from_device(&device(DeviceType::DimmableLight))).unwrap();
        let state = &json["state"];
        assert_eq!(state["bri"], 254);
        assert!(state.get("xy").is_none());
        assert!(state.get("hue").is_none());
        assert!(state.get("colormode").is_none());
        assert_eq!(json["type"], "Dimmable light");
    }

    #[test]
    fn should_render_color_attributes_for_color_lights() {
        let json =
            serde_json::to_value(Light::from_device(&device(DeviceType::ExtendedColorLight))).unwrap();
        let state = &json["state"];
        assert_eq!(state["xy"], json!([0.3127, 0.329]));
        assert_eq!(state["ct"], 366);
        assert_eq!(state["colormode"], "xy");
        assert_eq!(json["capabilities"]["control"]["colorgamuttype"], "C");
    }

    #[test]
    fn should_omit_brightness_for_plugs() {
        let json = serde_json::to_value(Light::from_device(&device(DeviceType::OnOffPlug))).unwrap();
        assert!(json["state"].get("bri").is_none());
        assert!(json["capabilities"]["control"].get("mindimlevel").is_none());
    }

    #[test]
    fn should_keep_page_order_in_light_map() {
        let mut second = device(DeviceType::OnOffPlug);
        second.uuid = "aaa".to_string();
        let map = LightMap::from_devices(&[device(DeviceType::DimmableLight), second]);
        let text = serde_json::to_string(&map).unwrap();
        assert!(text.find("\"lamp\"").unwrap() < text.find("\"aaa\"").unwrap());
    }

    #[test]
    fn should_skip_whitelist_without_username() {
        assert!(whitelist(None, "2024-01-01T00:00:00").is_empty());
        assert_eq!(whitelist(Some("user"), "2024-01-01T00:00:00").len(), 1);
    }

    #[test]
    fn should_derive_gateway_from_ipv4_host() {
        assert_eq!(gateway_for("192.168.1.40"), "192.168.1.1");
        assert_eq!(gateway_for("bridge.local"), "bridge.local");
    }

    #[test]
    fn should_only_add_client_key_on_request() {
        assert!(Registration::new("u", false).clientkey.is_none());
        let key = Registration::new("u", true).clientkey.unwrap();
        assert_eq!(key.len(), 32);
        assert_eq!(Some(key), Registration::new("u", true).clientkey);
    }
}
