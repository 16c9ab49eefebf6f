//! Device record — an accessory exposed to the voice assistant as a Hue light.

use serde::{Deserialize, Serialize};

use crate::command::{ColorMode, CommandKind, NormalizedCommand};
use crate::error::{BridgeError, ValidationError};
use crate::identity::format_uuid;

/// Kind of accessory, which decides the capabilities advertised over v1/v2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceType {
    ExtendedColorLight,
    ColorLight,
    ColorTemperatureLight,
    DimmableLight,
    WindowCovering,
    OnOffPlug,
    TemperatureSensor,
}

impl DeviceType {
    /// Whether the device accepts `xy` / hue-saturation colors.
    #[must_use]
    pub fn supports_color(self) -> bool {
        matches!(self, Self::ExtendedColorLight | Self::ColorLight)
    }

    /// Whether the device accepts a color temperature in mirek.
    #[must_use]
    pub fn supports_color_temperature(self) -> bool {
        matches!(self, Self::ExtendedColorLight | Self::ColorTemperatureLight)
    }

    /// Whether brightness is meaningful for the device.
    #[must_use]
    pub fn supports_dimming(self) -> bool {
        !matches!(self, Self::OnOffPlug | Self::TemperatureSensor)
    }

    /// Light type string used by the v1 API.
    #[must_use]
    pub fn v1_type(self) -> &'static str {
        match self {
            Self::ExtendedColorLight => "Extended color light",
            Self::ColorLight => "Color light",
            Self::ColorTemperatureLight => "Color temperature light",
            Self::DimmableLight | Self::WindowCovering => "Dimmable light",
            Self::OnOffPlug | Self::TemperatureSensor => "On/Off plug-in unit",
        }
    }

    /// Hue model id reported for the device.
    #[must_use]
    pub fn model_id(self) -> &'static str {
        match self {
            Self::ExtendedColorLight => "LCT015",
            Self::ColorLight => "LLC020",
            Self::ColorTemperatureLight => "LTW001",
            Self::DimmableLight | Self::WindowCovering => "LWB010",
            Self::OnOffPlug | Self::TemperatureSensor => "LOM001",
        }
    }

    /// Hue product name reported for the device.
    #[must_use]
    pub fn product_name(self) -> &'static str {
        match self {
            Self::ExtendedColorLight => "Hue color lamp",
            Self::ColorLight => "Hue go",
            Self::ColorTemperatureLight => "Hue ambiance lamp",
            Self::DimmableLight | Self::WindowCovering => "Hue white lamp",
            Self::OnOffPlug | Self::TemperatureSensor => "Hue smart plug",
        }
    }

    /// Archetype reported in v2 `metadata`.
    #[must_use]
    pub fn archetype(self) -> &'static str {
        match self {
            Self::ExtendedColorLight | Self::ColorLight | Self::ColorTemperatureLight => {
                "sultan_bulb"
            }
            Self::DimmableLight => "classic_bulb",
            Self::WindowCovering => "ceiling_horizontal",
            Self::OnOffPlug | Self::TemperatureSensor => "plug",
        }
    }
}

/// Live state of a device, shared by both protocol views.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceState {
    pub on: bool,
    /// Brightness, 0–254.
    pub bri: u8,
    pub xy: Option<[f64; 2]>,
    /// Hue, 0–65535.
    pub hue: Option<u16>,
    /// Saturation, 0–254.
    pub sat: Option<u8>,
    /// Color temperature in mirek.
    pub ct: Option<u16>,
    /// Covering position, 0–100.
    pub position: u8,
    /// Sensor reading.
    pub temperature: f64,
    pub color_mode: Option<ColorMode>,
}

/// Default white point used when a color payload is unusable.
pub const DEFAULT_XY: [f64; 2] = [0.3127, 0.329];

/// Default color temperature (mirek) for ct-capable lights.
pub const DEFAULT_MIREK: u16 = 366;

impl DeviceState {
    /// Initial state for a freshly registered device of the given type.
    #[must_use]
    pub fn initial(device_type: DeviceType) -> Self {
        let color = device_type.supports_color();
        let ct = device_type.supports_color_temperature();
        Self {
            on: false,
            bri: 254,
            xy: color.then_some(DEFAULT_XY),
            hue: color.then_some(0),
            sat: color.then_some(0),
            ct: ct.then_some(DEFAULT_MIREK),
            position: 0,
            temperature: 0.0,
            color_mode: if color {
                Some(ColorMode::Xy)
            } else if ct {
                Some(ColorMode::Ct)
            } else {
                None
            },
        }
    }

    /// Write a normalized command back into the state.
    pub fn apply(&mut self, cmd: &NormalizedCommand) {
        self.on = cmd.on;
        self.bri = cmd.bri;
        if let Some(xy) = cmd.xy {
            self.xy = Some(xy);
        }
        if let Some(hue) = cmd.hue {
            self.hue = Some(hue);
        }
        if let Some(sat) = cmd.sat {
            self.sat = Some(sat);
        }
        if let Some(ct) = cmd.ct {
            self.ct = Some(ct);
        }
        if let Some(position) = cmd.position {
            self.position = position;
        }
        if let Some(temperature) = cmd.temperature {
            self.temperature = temperature;
        }
        if cmd.command == CommandKind::Color
            && let Some(mode) = cmd.color_mode()
        {
            self.color_mode = Some(mode);
        }
    }
}

/// An accessory registered in the bridge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceRecord {
    /// Opaque id supplied by the owning accessory.
    pub id: String,
    /// Registry key derived from `id`.
    pub uuid: String,
    pub name: String,
    pub device_type: DeviceType,
    pub state: DeviceState,
    /// Whether normalized commands are forwarded downstream.
    pub forward_commands: bool,
}

/// What an accessory hands the bridge when it registers.
#[derive(Debug, Clone, PartialEq)]
pub struct AccessoryRegistration {
    pub id: String,
    pub name: String,
    pub device_type: DeviceType,
    pub forward_commands: bool,
    pub state: Option<DeviceState>,
}

impl AccessoryRegistration {
    /// Create a builder for constructing an [`AccessoryRegistration`].
    #[must_use]
    pub fn builder() -> AccessoryRegistrationBuilder {
        AccessoryRegistrationBuilder::default()
    }

    /// Check domain invariants.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Validation`] when the id formats to an empty
    /// key or the name is empty.
    pub fn validate(&self) -> Result<(), BridgeError> {
        if format_uuid(&self.id).is_empty() {
            return Err(ValidationError::EmptyId.into());
        }
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyName.into());
        }
        Ok(())
    }

    /// Turn the registration into a record keyed by `uuid`.
    #[must_use]
    pub fn into_record(self, uuid: String) -> DeviceRecord {
        let state = self
            .state
            .unwrap_or_else(|| DeviceState::initial(self.device_type));
        DeviceRecord {
            id: self.id,
            uuid,
            name: self.name,
            device_type: self.device_type,
            state,
            forward_commands: self.forward_commands,
        }
    }
}

/// Step-by-step builder for [`AccessoryRegistration`].
#[derive(Debug, Default)]
pub struct AccessoryRegistrationBuilder {
    id: Option<String>,
    name: Option<String>,
    device_type: Option<DeviceType>,
    forward_commands: Option<bool>,
    state: Option<DeviceState>,
}

impl AccessoryRegistrationBuilder {
    #[must_use]
    pub fn id(mut self, id: impl ToString) -> Self {
        self.id = Some(id.to_string());
        self
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn device_type(mut self, device_type: DeviceType) -> Self {
        self.device_type = Some(device_type);
        self
    }

    #[must_use]
    pub fn forward_commands(mut self, forward: bool) -> Self {
        self.forward_commands = Some(forward);
        self
    }

    #[must_use]
    pub fn state(mut self, state: DeviceState) -> Self {
        self.state = Some(state);
        self
    }

    /// Consume the builder, validate, and return a registration.
    ///
    /// Defaults: `DimmableLight`, forwarding enabled, initial state for the type.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Validation`] if `id` or `name` is missing or empty.
    pub fn build(self) -> Result<AccessoryRegistration, BridgeError> {
        let registration = AccessoryRegistration {
            id: self.id.unwrap_or_default(),
            name: self.name.unwrap_or_default(),
            device_type: self.device_type.unwrap_or(DeviceType::DimmableLight),
            forward_commands: self.forward_commands.unwrap_or(true),
            state: self.state,
        };
        registration.validate()?;
        Ok(registration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_build_registration_with_defaults() {
        let reg = AccessoryRegistration::builder()
            .id("kitchen")
            .name("Kitchen")
            .build()
            .unwrap();
        assert_eq!(reg.device_type, DeviceType::DimmableLight);
        assert!(reg.forward_commands);
        assert!(reg.state.is_none());
    }

    #[test]
    fn should_reject_registration_when_id_formats_to_empty() {
        let result = AccessoryRegistration::builder().id(" . ").name("Dot").build();
        assert!(matches!(
            result,
            Err(BridgeError::Validation(ValidationError::EmptyId))
        ));
    }

    #[test]
    fn should_reject_registration_when_name_is_empty() {
        let result = AccessoryRegistration::builder().id("a1").build();
        assert!(matches!(
            result,
            Err(BridgeError::Validation(ValidationError::EmptyName))
        ));
    }

    #[test]
    fn should_seed_color_attributes_for_color_lights() {
        let state = DeviceState::initial(DeviceType::ExtendedColorLight);
        assert_eq!(state.xy, Some(DEFAULT_XY));
        assert_eq!(state.ct, Some(DEFAULT_MIREK));
        assert_eq!(state.color_mode, Some(ColorMode::Xy));
    }

    #[test]
    fn should_leave_color_attributes_empty_for_plugs() {
        let state = DeviceState::initial(DeviceType::OnOffPlug);
        assert!(state.xy.is_none());
        assert!(state.hue.is_none());
        assert!(state.ct.is_none());
        assert!(state.color_mode.is_none());
    }

    #[test]
    fn should_apply_only_attributes_present_in_command() {
        let mut state = DeviceState::initial(DeviceType::ExtendedColorLight);
        let mut cmd = NormalizedCommand::new(CommandKind::Color, true, 200);
        cmd.hue = Some(1000);
        cmd.sat = Some(100);
        state.apply(&cmd);
        assert!(state.on);
        assert_eq!(state.bri, 200);
        assert_eq!(state.hue, Some(1000));
        assert_eq!(state.xy, Some(DEFAULT_XY));
        assert_eq!(state.color_mode, Some(ColorMode::Hs));
    }

    #[test]
    fn should_expose_capabilities_per_type() {
        assert!(DeviceType::ColorLight.supports_color());
        assert!(!DeviceType::ColorLight.supports_color_temperature());
        assert!(DeviceType::ColorTemperatureLight.supports_color_temperature());
        assert!(!DeviceType::OnOffPlug.supports_dimming());
        assert!(DeviceType::WindowCovering.supports_dimming());
    }

    #[test]
    fn should_deserialize_device_type_from_snake_case() {
        let ty: DeviceType = serde_json::from_str("\"window_covering\"").unwrap();
        assert_eq!(ty, DeviceType::WindowCovering);
    }
}
