//! # huehub-adapter-ssdp
//!
//! SSDP discovery for the hubs of the bridge.
//!
//! Alexa finds Hue bridges by multicasting `M-SEARCH` requests on
//! `239.255.255.250:1900`. Each hub runs its own [`SsdpAnnouncer`] that
//! answers with the `LOCATION` of the hub descriptor, and periodically
//! announces itself with `NOTIFY ssdp:alive`.
//!
//! ## Dependency rule
//!
//! Depends on `huehub-domain` for the hub identity only. The composition
//! root decides when an announcer starts and stops.

mod announcer;
mod config;
mod error;
pub mod message;

pub use announcer::SsdpAnnouncer;
pub use config::SsdpConfig;
pub use error::SsdpError;
pub use message::Advertisement;
