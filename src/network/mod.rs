//! Network Module
//!
//! Socket handling for both sides of the protocol.
//!
//! ## Architecture
//! - Server: single-threaded readiness loop (reactor), no worker threads
//! - Client: blocking synchronous round trip per logical operation
//! - All shared state owned by the server's event loop

mod client;
mod server;

pub use client::{Client, ReceivedMessage};
pub use server::{Server, ShutdownHandle};

use std::net::{SocketAddr, ToSocketAddrs};

use crate::error::{MaildropError, Result};

/// Resolve a hostname and port to a socket address
pub(crate) fn resolve_addr(hostname: &str, port: u16) -> Result<SocketAddr> {
    (hostname, port)
        .to_socket_addrs()
        .map_err(|_| {
            MaildropError::Connection(
                "Invalid host name, must be an IP address, domain name, or \"localhost\""
                    .to_string(),
            )
        })?
        .next()
        .ok_or_else(|| {
            MaildropError::Connection("Host name did not resolve to any address".to_string())
        })
}
