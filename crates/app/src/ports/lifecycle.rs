//! Accessory lifecycle port — how the accessory runtime drives the bridge.

use std::future::Future;

use huehub_domain::command::{NormalizedCommand, RawCommand};
use huehub_domain::device::AccessoryRegistration;
use huehub_domain::error::BridgeError;

/// Callbacks the accessory runtime invokes as devices come, go and change.
pub trait AccessoryLifecycle {
    /// Add (or replace) an accessory and return its registry key.
    fn on_register(
        &self,
        registration: AccessoryRegistration,
    ) -> impl Future<Output = Result<String, BridgeError>> + Send;

    /// Remove an accessory by registry key.
    fn on_deregister(&self, uuid: &str) -> impl Future<Output = Result<(), BridgeError>> + Send;

    /// The accessory changed state on its own (a wall switch, a remote, …).
    fn on_local_input(
        &self,
        uuid: &str,
        raw: RawCommand,
    ) -> impl Future<Output = Result<NormalizedCommand, BridgeError>> + Send;
}
