//! Per-hub SSDP responder.

use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};

use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::UdpSocket;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::config::SsdpConfig;
use crate::error::SsdpError;
use crate::message::{Advertisement, MULTICAST_ADDR, MULTICAST_DEST, SSDP_PORT, SearchRequest};

/// Background task answering `M-SEARCH` requests for one hub and
/// multicasting its `NOTIFY` announcements.
///
/// Several announcers share port 1900 through address reuse, so every hub
/// of the pool can answer the same search.
pub struct SsdpAnnouncer {
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl SsdpAnnouncer {
    /// Bind the multicast socket and spawn the responder.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`SsdpError`] when the socket cannot be bound or the
    /// multicast group cannot be joined.
    pub fn start(advertisement: Advertisement, config: &SsdpConfig) -> Result<Self, SsdpError> {
        let socket = bind_multicast(config.interface)?;
        let (shutdown, shutdown_rx) = oneshot::channel();
        tracing::info!(location = advertisement.location(), "SSDP announcer started");
        let task = tokio::spawn(run(
            socket,
            advertisement,
            config.clone(),
            shutdown_rx,
        ));
        Ok(Self {
            shutdown: Some(shutdown),
            task: Some(task),
        })
    }

    /// Send `ssdp:byebye`, leave the multicast group and wait for the task
    /// to finish. Calling it again is a no-op.
    pub async fn stop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(task) = self.task.take()
            && let Err(err) = task.await
        {
            tracing::warn!(%err, "SSDP announcer task ended abnormally");
        }
    }
}

impl Drop for SsdpAnnouncer {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

fn bind_multicast(interface: Ipv4Addr) -> Result<UdpSocket, SsdpError> {
    let addr = SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, SSDP_PORT);
    let socket =
        Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP)).map_err(SsdpError::Socket)?;
    socket.set_reuse_address(true).map_err(SsdpError::Socket)?;
    #[cfg(unix)]
    socket.set_reuse_port(true).map_err(SsdpError::Socket)?;
    socket.set_nonblocking(true).map_err(SsdpError::Socket)?;
    socket
        .bind(&addr.into())
        .map_err(|source| SsdpError::Bind { addr, source })?;
    socket
        .join_multicast_v4(&MULTICAST_ADDR, &interface)
        .map_err(|source| SsdpError::Join { interface, source })?;
    socket.set_multicast_loop_v4(true).map_err(SsdpError::Socket)?;

    UdpSocket::from_std(socket.into()).map_err(SsdpError::Socket)
}

async fn run(
    socket: UdpSocket,
    advertisement: Advertisement,
    config: SsdpConfig,
    mut shutdown: oneshot::Receiver<()>,
) {
    let mut ticker = tokio::time::interval(config.notify_interval());
    let mut buffer = [0_u8; 2048];

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            _ = ticker.tick() => {
                for nt in advertisement.notification_types() {
                    send(&socket, &advertisement.notify_alive(&nt), MULTICAST_DEST.into()).await;
                }
            }
            received = socket.recv_from(&mut buffer) => match received {
                Ok((len, peer)) => {
                    let datagram = String::from_utf8_lossy(&buffer[..len]);
                    if let Some(request) = SearchRequest::parse(&datagram) {
                        for st in advertisement.answers(&request.st) {
                            tracing::debug!(%peer, st = %st, "answering M-SEARCH");
                            send(&socket, &advertisement.search_response(&st), peer).await;
                        }
                    }
                }
                Err(err) => tracing::warn!(%err, "SSDP receive failed"),
            },
        }
    }

    for nt in advertisement.notification_types() {
        send(&socket, &advertisement.notify_byebye(&nt), MULTICAST_DEST.into()).await;
    }
    if let Err(err) = socket.leave_multicast_v4(MULTICAST_ADDR, config.interface) {
        tracing::debug!(%err, "failed to leave multicast group");
    }
    tracing::info!(location = advertisement.location(), "SSDP announcer stopped");
}

async fn send(socket: &UdpSocket, message: &str, target: SocketAddr) {
    if let Err(err) = socket.send_to(message.as_bytes(), target).await {
        tracing::warn!(%err, %target, "SSDP send failed");
    }
}
