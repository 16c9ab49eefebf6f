//! SSDP adapter error types.

use std::net::SocketAddrV4;

/// Errors raised while starting an announcer.
#[derive(Debug, thiserror::Error)]
pub enum SsdpError {
    /// The UDP socket could not be created or configured.
    #[error("failed to set up SSDP socket")]
    Socket(#[source] std::io::Error),

    /// Binding the SSDP port failed.
    #[error("failed to bind SSDP socket on {addr}")]
    Bind {
        /// Address the socket tried to bind.
        addr: SocketAddrV4,
        #[source]
        source: std::io::Error,
    },

    /// Joining the multicast group failed.
    #[error("failed to join multicast group on interface {interface}")]
    Join {
        /// Interface used for the membership.
        interface: std::net::Ipv4Addr,
        #[source]
        source: std::io::Error,
    },
}
