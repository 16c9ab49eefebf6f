//! Bridge identity derivation.
//!
//! Alexa identifies a Hue bridge by its MAC-derived bridge id and UPnP UUID,
//! and identifies lights by v1 keys and v2 resource ids. All of these are
//! derived here from opaque ids so that they are stable for identical input.

use std::fmt::Display;

use uuid::Uuid;

/// Template whose digit positions receive the id characters.
const MAC_TEMPLATE: &str = "00:11:22:33:44:55";

/// Prefix shared by every Hue bridge UPnP UUID.
pub const BRIDGE_UUID_PREFIX: &str = "2f402f80-da50-11e1-9b23-";

/// Namespace for v2 resource ids.
const RESOURCE_NAMESPACE: Uuid = Uuid::from_u128(0x2f40_2f80_da50_11e1_9b23_0017_8800_0000);

/// Map the hex characters of `id` onto a MAC address.
///
/// Each digit slot of `00:11:22:33:44:55` takes the next upper-cased hex
/// character of `id`. Once `id` is exhausted the remaining slots count down
/// from 9 and stay at 0.
#[must_use]
pub fn generate_mac_address(id: &str) -> String {
    let mut input = id
        .chars()
        .filter(char::is_ascii_hexdigit)
        .map(|c| c.to_ascii_uppercase());
    let mut counter: u8 = 9;
    MAC_TEMPLATE
        .chars()
        .map(|slot| {
            if slot == ':' {
                return ':';
            }
            input.next().unwrap_or_else(|| {
                let digit = char::from(b'0' + counter);
                counter = counter.saturating_sub(1);
                digit
            })
        })
        .collect()
}

/// Hue bridge id for a MAC: the twelve hex digits with `FFFE` inserted after
/// the third octet.
#[must_use]
pub fn get_bridge_id(mac: &str) -> String {
    let hex: String = mac
        .chars()
        .filter(|c| *c != ':')
        .map(|c| c.to_ascii_uppercase())
        .collect();
    match hex.get(..6) {
        Some(head) => format!("{head}FFFE{}", &hex[6..]),
        None => hex,
    }
}

/// Registry key for an accessory id: stringified, dots removed, trimmed.
#[must_use]
pub fn format_uuid(id: impl Display) -> String {
    id.to_string().replace('.', "").trim().to_string()
}

/// UPnP UUID of a bridge.
#[must_use]
pub fn format_bridge_uuid(id: impl Display) -> String {
    format!("{BRIDGE_UUID_PREFIX}{}", format_uuid(id))
}

/// Deterministic v2 resource id for a `(kind, key)` pair.
#[must_use]
pub fn resource_id(kind: &str, key: &str) -> Uuid {
    Uuid::new_v5(&RESOURCE_NAMESPACE, format!("{kind}:{key}").as_bytes())
}

/// Zigbee-style `uniqueid` reported for a v1 light.
#[must_use]
pub fn light_unique_id(uuid: &str) -> String {
    let bytes = resource_id("light", uuid).into_bytes();
    let octets: Vec<String> = bytes[..8].iter().map(|b| format!("{b:02x}")).collect();
    format!("{}-0b", octets.join(":"))
}

/// Identity a single hub presents on the network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HubIdentity {
    /// Pseudo MAC, `AA:BB:CC:DD:EE:FF`.
    pub mac: String,
    /// Hue bridge id, sixteen upper-case hex digits.
    pub bridge_id: String,
    /// UPnP UUID (without the `uuid:` prefix).
    pub bridge_uuid: String,
}

impl HubIdentity {
    /// Derive the identity of hub `index` from the controller seed.
    ///
    /// The index leads the seed so that it survives the MAC truncation and
    /// every hub gets a distinct identity.
    #[must_use]
    pub fn derive(seed: &str, index: usize) -> Self {
        let mac = generate_mac_address(&format!("{index:02x}{seed}"));
        let bridge_id = get_bridge_id(&mac);
        let hex = mac.replace(':', "").to_ascii_lowercase();
        Self {
            bridge_uuid: format_bridge_uuid(hex),
            bridge_id,
            mac,
        }
    }

    /// Lower-case MAC, as the v1 config reports it.
    #[must_use]
    pub fn mac_lower(&self) -> String {
        self.mac.to_ascii_lowercase()
    }
}
