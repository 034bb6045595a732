//! Client side of a connection: resolve a localhost port and open a
//! [`LineChannel`] to it.

use std::net::SocketAddr;

use tokio::net::{lookup_host, TcpStream};

use crate::channel::LineChannel;
use crate::config::DEFAULT_HOST;

/// Errors that can arise while dialing.
#[derive(Debug, thiserror::Error)]
pub enum DialError {
    /// The host did not resolve to any IPv4 address.
    #[error("could not resolve {host}:{port}: {reason}")]
    Resolve {
        host: String,
        port: u16,
        reason: String,
    },
    /// Nothing accepted the connection.
    #[error("could not connect to {addr}: {source}")]
    Connect {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
}

/// First IPv4 address for `host:port`.
pub(crate) async fn resolve_ipv4(host: &str, port: u16) -> Result<SocketAddr, DialError> {
    let resolve_err = |reason: String| DialError::Resolve {
        host: host.to_string(),
        port,
        reason,
    };
    lookup_host((host, port))
        .await
        .map_err(|e| resolve_err(e.to_string()))?
        .find(SocketAddr::is_ipv4)
        .ok_or_else(|| resolve_err("no IPv4 address".into()))
}

/// Connect to `port` on localhost.
pub async fn dial(port: u16) -> Result<LineChannel, DialError> {
    dial_host(DEFAULT_HOST, port).await
}

/// Connect to `port` on `host`.
pub async fn dial_host(host: &str, port: u16) -> Result<LineChannel, DialError> {
    let addr = resolve_ipv4(host, port).await?;
    let stream = TcpStream::connect(addr)
        .await
        .map_err(|source| DialError::Connect { addr, source })?;
    log::debug!("[dialer] connected to {addr}");
    Ok(LineChannel::from_tcp(stream))
}
