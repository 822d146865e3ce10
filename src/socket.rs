//! Async UDP socket abstraction.
//!
//! [`Transport`] is the datagram seam the exchange driver talks to; [`Socket`]
//! is the production implementation, a thin wrapper around
//! `tokio::net::UdpSocket`.  All protocol logic lives elsewhere; this module
//! owns only byte I/O and peer address resolution.

use std::future::Future;
use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};

use thiserror::Error;
use tokio::net::{lookup_host, UdpSocket};

/// Datagram send/receive used by [`crate::exchange::Exchange`].
///
/// All methods are `&self` so an implementation can be shared if needed.
pub trait Transport {
    /// Send `buf` as a single datagram to `dest`, returning the bytes sent.
    fn send_to(&self, buf: &[u8], dest: SocketAddr)
        -> impl Future<Output = io::Result<usize>> + Send;

    /// Receive the next datagram into `buf`.
    ///
    /// Returns `(bytes_received, sender_address)`.
    fn recv_from(
        &self,
        buf: &mut [u8],
    ) -> impl Future<Output = io::Result<(usize, SocketAddr)>> + Send;
}

/// Errors that can arise while resolving a peer or opening the socket.
#[derive(Debug, Error)]
pub enum SocketError {
    #[error("cannot resolve {target}: {source}")]
    Resolve {
        target: String,
        #[source]
        source: io::Error,
    },
    #[error("{0} resolved to no addresses")]
    NoAddress(String),
    #[error("socket I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Resolve `host`/`port` once, taking the first address (IPv4 or IPv6).
pub async fn resolve(host: &str, port: u16) -> Result<SocketAddr, SocketError> {
    let target = format!("{host}:{port}");
    let mut addrs = lookup_host((host, port))
        .await
        .map_err(|source| SocketError::Resolve {
            target: target.clone(),
            source,
        })?;
    let addr = addrs.next().ok_or(SocketError::NoAddress(target))?;
    log::debug!("[ctp] resolved {host}:{port} → {addr}");
    Ok(addr)
}

/// A UDP socket speaking raw datagrams.
#[derive(Debug)]
pub struct Socket {
    /// Address this socket is bound to (filled in after OS assigns ephemeral port).
    pub local_addr: SocketAddr,
    inner: UdpSocket,
}

impl Socket {
    /// Bind a new socket to `local_addr`.
    ///
    /// Passing `0.0.0.0:0` lets the OS choose an ephemeral port.
    pub async fn bind(local_addr: SocketAddr) -> Result<Self, SocketError> {
        let inner = UdpSocket::bind(local_addr).await?;
        let local_addr = inner.local_addr()?;
        Ok(Self { local_addr, inner })
    }

    /// Bind an ephemeral port on the unspecified address of `peer`'s family.
    pub async fn bind_for(peer: SocketAddr) -> Result<Self, SocketError> {
        let local = match peer {
            SocketAddr::V4(_) => SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0)),
            SocketAddr::V6(_) => SocketAddr::from((Ipv6Addr::UNSPECIFIED, 0)),
        };
        Self::bind(local).await
    }
}

impl Transport for Socket {
    async fn send_to(&self, buf: &[u8], dest: SocketAddr) -> io::Result<usize> {
        self.inner.send_to(buf, dest).await
    }

    /// Blocks until a datagram arrives; bounding the wait is up to the caller.
    async fn recv_from(&self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)> {
        self.inner.recv_from(buf).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn bind_for_matches_peer_family() {
        let v4 = Socket::bind_for("127.0.0.1:9".parse().unwrap()).await.unwrap();
        assert!(v4.local_addr.is_ipv4());
        assert_ne!(v4.local_addr.port(), 0);
    }

    #[tokio::test]
    async fn resolve_literal_address() {
        let addr = resolve("127.0.0.1", 4242).await.unwrap();
        assert_eq!(addr, "127.0.0.1:4242".parse::<SocketAddr>().unwrap());
    }

    #[tokio::test]
    async fn datagram_round_trip_on_loopback() {
        let a = Socket::bind("127.0.0.1:0".parse().unwrap()).await.unwrap();
        let b = Socket::bind("127.0.0.1:0".parse().unwrap()).await.unwrap();
        assert_eq!(a.send_to(b"ping", b.local_addr).await.unwrap(), 4);
        let mut buf = [0u8; 16];
        let (n, from) = b.recv_from(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"ping");
        assert_eq!(from, a.local_addr);
    }
}
