//! # huehubd — the huehub daemon
//!
//! Composition root that wires the registry, the hub pool and the adapters
//! together and runs the emulated Hue bridge.
//!
//! ## Responsibilities
//! - Load configuration (config file, env vars) and initialise logging
//! - Construct the registry, the event bus and the application services
//! - Start hub 0 through the axum/SSDP [`launcher::AxumHubLauncher`]
//! - Register the statically configured accessories, growing the pool as needed
//! - Handle graceful shutdown (SIGINT), tearing hubs down highest index first
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer — no domain logic belongs here.

mod config;
mod launcher;

use std::sync::Arc;

use anyhow::Context;
use tokio::sync::broadcast;
use tracing_subscriber::EnvFilter;

use huehub_adapter_http_axum::state::BridgeSettings;
use huehub_app::event_bus::InProcessEventBus;
use huehub_app::hub_scaler::{HubScaler, ScalerSettings};
use huehub_app::ports::AccessoryLifecycle;
use huehub_app::registry::DeviceRegistry;
use huehub_app::services::bridge_service::BridgeService;
use huehub_app::services::control_service::ControlService;
use huehub_domain::event::DeviceEvent;

use crate::config::Config;
use crate::launcher::AxumHubLauncher;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load().context("loading configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&config.logging.filter))
        .init();

    let settings = Arc::new(BridgeSettings {
        name: config.bridge.name.clone(),
        default_username: config.bridge.default_username.clone(),
        timezone: config.bridge.timezone.clone(),
        advertise_host: config.advertise_host(),
        protocol: config.discovery.protocol.clone(),
        max_items_per_hub: config.server.max_items_per_hub,
    });

    // Event bus
    let event_bus = Arc::new(InProcessEventBus::new(256));
    tokio::spawn(log_forwarded_commands(event_bus.subscribe()));

    // Services
    let registry = Arc::new(DeviceRegistry::new());
    let control = Arc::new(ControlService::new(registry, Arc::clone(&event_bus)));

    // Hub pool
    let discovery = config
        .discovery
        .ssdp
        .enabled
        .then(|| config.discovery.ssdp.clone());
    let launcher = AxumHubLauncher::new(
        Arc::clone(&control),
        Arc::clone(&settings),
        config.bridge.seed.clone(),
        discovery,
    );
    let scaler = Arc::new(HubScaler::new(
        launcher,
        ScalerSettings {
            bind_address: config.server.host,
            base_port: config.server.base_port,
            max_items_per_hub: config.server.max_items_per_hub,
        },
    ));
    scaler.start().await.context("starting hub 0")?;

    let bridge = BridgeService::new(Arc::clone(&scaler), control);
    for device in &config.devices {
        let registration = device
            .registration()
            .with_context(|| format!("invalid device {:?}", device.id))?;
        let uuid = bridge
            .on_register(registration)
            .await
            .with_context(|| format!("registering device {:?}", device.id))?;
        tracing::info!(id = %device.id, uuid = %uuid, "device registered");
    }

    tracing::info!(
        devices = bridge.registry().len(),
        hubs = scaler.hubs().await.len(),
        advertise_host = %settings.advertise_host,
        "huehubd ready"
    );

    tokio::signal::ctrl_c()
        .await
        .context("waiting for shutdown signal")?;
    tracing::info!("shutting down");
    scaler.shutdown().await;

    Ok(())
}

/// Stand-in for the accessory runtime: log every command forwarded
/// downstream.
async fn log_forwarded_commands(mut events: broadcast::Receiver<DeviceEvent>) {
    loop {
        match events.recv().await {
            Ok(event) => tracing::info!(
                uuid = %event.uuid,
                id = %event.id,
                origin = ?event.origin,
                command = ?event.command.command,
                on = event.command.on,
                bri = event.command.bri,
                "command forwarded"
            ),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "event log lagged behind");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
