//! Configuration loading — TOML file with environment variable overrides.
//!
//! Looks for `huehub.toml` in the working directory (or the file named by
//! `HUEHUB_CONFIG`). Every field has a default so the file is optional.
//! Environment variables take precedence over file values.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use serde::Deserialize;

use huehub_adapter_ssdp::SsdpConfig;
use huehub_app::hub_scaler::needed_hubs;
use huehub_domain::device::{AccessoryRegistration, DeviceType};
use huehub_domain::error::BridgeError;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Hub pool addressing.
    pub server: ServerConfig,
    /// Identity every hub presents.
    pub bridge: BridgeConfig,
    /// SSDP discovery settings.
    pub discovery: DiscoveryConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
    /// Accessories registered at startup.
    pub devices: Vec<DeviceConfig>,
}

/// Hub pool configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address every hub binds to (e.g. `0.0.0.0`).
    pub host: IpAddr,
    /// Port of hub 0; hub `i` listens on `base_port + i`.
    pub base_port: u16,
    /// Devices served per hub, `0` for a single hub serving everything.
    pub max_items_per_hub: usize,
}

/// Bridge identity configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Seed from which MAC, bridge id and UUID of each hub are derived.
    pub seed: String,
    /// Friendly name.
    pub name: String,
    /// Username handed out to clients that register.
    pub default_username: String,
    /// Time zone reported in the bridge config.
    pub timezone: String,
}

/// Discovery configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Scheme of the advertised `LOCATION`.
    pub protocol: String,
    /// Host advertised to clients. Detected from the network interfaces
    /// when unset.
    pub advertise_host: Option<String>,
    /// Announcer settings.
    #[serde(flatten)]
    pub ssdp: SsdpConfig,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

/// A statically configured accessory.
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceConfig {
    /// Stable id of the accessory.
    pub id: String,
    pub name: String,
    #[serde(rename = "type", default = "default_device_type")]
    pub device_type: DeviceType,
    /// Forward Alexa commands downstream.
    #[serde(default = "default_forward")]
    pub forward_commands: bool,
}

fn default_device_type() -> DeviceType {
    DeviceType::DimmableLight
}

fn default_forward() -> bool {
    true
}

impl DeviceConfig {
    /// Build the registration handed to the bridge.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Validation`] for an empty id or name.
    pub fn registration(&self) -> Result<AccessoryRegistration, BridgeError> {
        AccessoryRegistration::builder()
            .id(&self.id)
            .name(&self.name)
            .device_type(self.device_type)
            .forward_commands(self.forward_commands)
            .build()
    }
}

impl Config {
    /// Load configuration from `huehub.toml` (if present) then apply
    /// environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML file exists but is malformed, or if the
    /// resulting configuration is invalid.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("HUEHUB_CONFIG").unwrap_or_else(|_| "huehub.toml".to_string());
        let mut config = Self::from_file(&path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Parse),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("HUEHUB_BIND") {
            if let Ok(addr) = val.parse::<SocketAddr>() {
                self.server.host = addr.ip();
                self.server.base_port = addr.port();
            } else if let Ok(host) = val.parse() {
                self.server.host = host;
            }
        }
        if let Ok(val) = std::env::var("HUEHUB_PORT")
            && let Ok(port) = val.parse()
        {
            self.server.base_port = port;
        }
        if let Ok(val) = std::env::var("HUEHUB_MAX_ITEMS_PER_HUB")
            && let Ok(max) = val.parse()
        {
            self.server.max_items_per_hub = max;
        }
        if let Ok(val) = std::env::var("HUEHUB_ADVERTISE_HOST") {
            self.discovery.advertise_host = Some(val);
        }
        if let Ok(val) = std::env::var("HUEHUB_LOG") {
            self.logging.filter = val;
        }
        if let Ok(val) = std::env::var("RUST_LOG") {
            self.logging.filter = val;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.server.base_port == 0 {
            return Err(ConfigError::Validation(
                "base port must be non-zero".to_string(),
            ));
        }
        let hubs = needed_hubs(self.devices.len(), self.server.max_items_per_hub);
        let last = usize::from(self.server.base_port) + hubs - 1;
        if last > usize::from(u16::MAX) {
            return Err(ConfigError::Validation(format!(
                "{hubs} hubs starting at port {} exceed the port range",
                self.server.base_port
            )));
        }
        if self.bridge.default_username.trim().is_empty() {
            return Err(ConfigError::Validation(
                "default username must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Host advertised in SSDP and the descriptor.
    ///
    /// Falls back to the first private IPv4 address of the machine, then to
    /// the bind address.
    #[must_use]
    pub fn advertise_host(&self) -> String {
        if let Some(host) = &self.discovery.advertise_host {
            return host.clone();
        }
        if let Some(ip) = detect_lan_address() {
            return ip.to_string();
        }
        self.server.host.to_string()
    }
}

fn detect_lan_address() -> Option<Ipv4Addr> {
    get_if_addrs::get_if_addrs()
        .ok()?
        .into_iter()
        .filter(|iface| !iface.is_loopback())
        .find_map(|iface| match iface.addr {
            get_if_addrs::IfAddr::V4(addr) if addr.ip.is_private() => Some(addr.ip),
            _ => None,
        })
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            base_port: 80,
            max_items_per_hub: 50,
        }
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            seed: "001788c0ffee".to_string(),
            name: "Huehub".to_string(),
            default_username: "huehub".to_string(),
            timezone: "UTC".to_string(),
        }
    }
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            protocol: "http".to_string(),
            advertise_host: None,
            ssdp: SsdpConfig::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "huehubd=info,huehub=info,tower_http=info".to_string(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure.
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    /// File I/O failure.
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    /// Semantic validation failure.
    #[error("invalid configuration: {0}")]
    Validation(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_produce_sensible_defaults() {
        let config = Config::default();
        assert_eq!(config.server.host, IpAddr::V4(Ipv4Addr::UNSPECIFIED));
        assert_eq!(config.server.base_port, 80);
        assert_eq!(config.server.max_items_per_hub, 50);
        assert_eq!(config.bridge.default_username, "huehub");
        assert_eq!(config.discovery.protocol, "http");
        assert!(config.discovery.ssdp.enabled);
        assert!(config.devices.is_empty());
    }

    #[test]
    fn should_parse_minimal_toml() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.server.base_port, 80);
    }

    #[test]
    fn should_parse_full_toml() {
        let toml = "
            [server]
            host = '127.0.0.1'
            base_port = 8080
            max_items_per_hub = 2

            [bridge]
            seed = 'abcdef'
            name = 'Living room'
            default_username = 'alexa'
            timezone = 'Europe/Paris'

            [discovery]
            enabled = false
            protocol = 'https'
            advertise_host = '192.168.1.40'
            notify_interval_secs = 10

            [logging]
            filter = 'debug'

            [[devices]]
            id = 'lamp-1'
            name = 'Lamp'
            type = 'extended_color_light'

            [[devices]]
            id = 'blind-1'
            name = 'Blind'
            type = 'window_covering'
            forward_commands = false
        ";
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.server.host, IpAddr::V4(Ipv4Addr::LOCALHOST));
        assert_eq!(config.server.base_port, 8080);
        assert_eq!(config.server.max_items_per_hub, 2);
        assert_eq!(config.bridge.seed, "abcdef");
        assert_eq!(config.bridge.timezone, "Europe/Paris");
        assert_eq!(config.discovery.protocol, "https");
        assert!(!config.discovery.ssdp.enabled);
        assert_eq!(config.discovery.ssdp.notify_interval_secs, 10);
        assert_eq!(config.advertise_host(), "192.168.1.40");
        assert_eq!(config.logging.filter, "debug");
        assert_eq!(config.devices.len(), 2);
        assert_eq!(config.devices[0].device_type, DeviceType::ExtendedColorLight);
        assert!(config.devices[0].forward_commands);
        assert!(!config.devices[1].forward_commands);
    }

    #[test]
    fn should_default_device_type_to_dimmable_light() {
        let config: Config = toml::from_str(
            "
            [[devices]]
            id = 'lamp'
            name = 'Lamp'
            ",
        )
        .unwrap();
        assert_eq!(config.devices[0].device_type, DeviceType::DimmableLight);
    }

    #[test]
    fn should_build_registration_from_device() {
        let device = DeviceConfig {
            id: "plug.1".to_string(),
            name: "Kettle".to_string(),
            device_type: DeviceType::OnOffPlug,
            forward_commands: false,
        };
        let registration = device.registration().unwrap();
        assert_eq!(registration.id, "plug.1");
        assert_eq!(registration.device_type, DeviceType::OnOffPlug);
        assert!(!registration.forward_commands);
    }

    #[test]
    fn should_reject_device_without_name() {
        let device = DeviceConfig {
            id: "plug".to_string(),
            name: "  ".to_string(),
            device_type: DeviceType::OnOffPlug,
            forward_commands: true,
        };
        assert!(matches!(
            device.registration(),
            Err(BridgeError::Validation(_))
        ));
    }

    #[test]
    fn should_return_default_when_file_not_found() {
        let config = Config::from_file("nonexistent.toml").unwrap();
        assert_eq!(config.server.base_port, 80);
    }

    #[test]
    fn should_reject_zero_port() {
        let mut config = Config::default();
        config.server.base_port = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn should_reject_pool_past_port_range() {
        let mut config = Config::default();
        config.server.base_port = u16::MAX;
        config.server.max_items_per_hub = 1;
        config.devices = vec![
            DeviceConfig {
                id: "a".to_string(),
                name: "A".to_string(),
                device_type: DeviceType::DimmableLight,
                forward_commands: true,
            };
            2
        ];
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn should_accept_defaults() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn should_report_parse_error_for_invalid_toml() {
        let result: Result<Config, _> = toml::from_str("invalid {{{");
        assert!(result.is_err());
    }
}
