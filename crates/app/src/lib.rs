//! # huehub-app
//!
//! Application layer — use-cases and **port definitions** (traits).
//!
//! ## Responsibilities
//! - Define **port traits** that adapters implement (driven/outbound ports):
//!   - `HubLauncher` / `HubHandle` — start and tear down one emulated bridge
//!   - `EventPublisher` — forward device events downstream
//! - Define the **driving/inbound port** `AccessoryLifecycle`, through which
//!   the accessory runtime registers, removes and updates devices
//! - Own the **device registry** and its per-hub pagination
//! - Own the **hub scaler**, which grows and shrinks the pool of hubs as the
//!   registry changes size
//! - Provide **in-process infrastructure** (event bus) that doesn't need IO
//!
//! ## Dependency rule
//! Depends on `huehub-domain` only (plus `tokio::sync` for channels and locks).
//! Never imports adapter crates. Adapters depend on *this* crate, not the reverse.

pub mod event_bus;
pub mod hub_scaler;
pub mod ports;
pub mod registry;
pub mod services;
