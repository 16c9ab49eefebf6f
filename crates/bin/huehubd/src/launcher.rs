//! Hub launcher — one axum listener plus one SSDP announcer per hub.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use huehub_adapter_http_axum::router;
use huehub_adapter_http_axum::state::{AppState, BridgeSettings};
use huehub_adapter_ssdp::{Advertisement, SsdpAnnouncer, SsdpConfig};
use huehub_app::ports::{EventPublisher, HubHandle, HubLauncher, HubRecord};
use huehub_app::services::control_service::ControlService;
use huehub_domain::error::BridgeError;
use huehub_domain::identity::HubIdentity;

/// How long a closing hub waits for open connections (event streams
/// included) before the server task is aborted.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Starts hubs on real sockets.
pub struct AxumHubLauncher<P> {
    control: Arc<ControlService<P>>,
    settings: Arc<BridgeSettings>,
    seed: String,
    /// `None` when discovery is disabled.
    discovery: Option<SsdpConfig>,
}

impl<P> AxumHubLauncher<P> {
    #[must_use]
    pub fn new(
        control: Arc<ControlService<P>>,
        settings: Arc<BridgeSettings>,
        seed: String,
        discovery: Option<SsdpConfig>,
    ) -> Self {
        Self {
            control,
            settings,
            seed,
            discovery,
        }
    }

    fn announce(&self, hub: &HubRecord, identity: &HubIdentity) -> Option<SsdpAnnouncer> {
        let config = self.discovery.as_ref()?;
        let advertisement = Advertisement::new(
            &self.settings.protocol,
            &self.settings.advertise_host,
            hub.port,
            identity,
            config.max_age_secs,
        );
        match SsdpAnnouncer::start(advertisement, config) {
            Ok(announcer) => Some(announcer),
            Err(err) => {
                tracing::warn!(hub = hub.index, error = %err, "hub reachable but not discoverable");
                None
            }
        }
    }
}

impl<P> HubLauncher for AxumHubLauncher<P>
where
    P: EventPublisher + Send + Sync + 'static,
{
    type Handle = AxumHub;

    async fn launch(&self, hub: &HubRecord) -> Result<AxumHub, BridgeError> {
        let listener = TcpListener::bind(hub.socket_addr())
            .await
            .map_err(|err| BridgeError::HubLaunch {
                index: hub.index,
                source: Box::new(err),
            })?;

        let identity = HubIdentity::derive(&self.seed, hub.index);
        let state = AppState::new(
            Arc::clone(&self.control),
            hub.clone(),
            identity.clone(),
            Arc::clone(&self.settings),
        );
        let app = router::build(state);

        let (shutdown, shutdown_rx) = oneshot::channel::<()>();
        let server = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
        });
        tracing::info!(
            hub = hub.index,
            addr = %hub.socket_addr(),
            bridge_id = %identity.bridge_id,
            "hub listening"
        );

        let announcer = self.announce(hub, &identity);

        Ok(AxumHub {
            index: hub.index,
            shutdown: Some(shutdown),
            server,
            announcer,
        })
    }
}

/// A running hub.
pub struct AxumHub {
    index: usize,
    shutdown: Option<oneshot::Sender<()>>,
    server: JoinHandle<io::Result<()>>,
    announcer: Option<SsdpAnnouncer>,
}

impl HubHandle for AxumHub {
    async fn stop_discovery(&mut self) {
        if let Some(mut announcer) = self.announcer.take() {
            announcer.stop().await;
        }
    }

    async fn close(mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        match tokio::time::timeout(DRAIN_TIMEOUT, &mut self.server).await {
            Ok(Ok(Ok(()))) => tracing::info!(hub = self.index, "hub closed"),
            Ok(Ok(Err(err))) => tracing::error!(hub = self.index, error = %err, "hub server failed"),
            Ok(Err(err)) => tracing::error!(hub = self.index, error = %err, "hub server task failed"),
            Err(_) => {
                self.server.abort();
                tracing::warn!(hub = self.index, "hub drain timed out, connections dropped");
            }
        }
    }
}
