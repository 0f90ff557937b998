//! UDP transport implementation.

use super::Transport;
use crate::error::{Error, Result};
use bytes::Bytes;
use socket2::{Domain, Protocol, Socket, Type};
use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::time::timeout;

/// Largest UDP payload.
const RECV_BUFFER_SIZE: usize = 65535;

/// UDP transport for a single target.
///
/// Owns an ephemeral UDP socket connected to the target, so datagrams from
/// other sources are dropped by the kernel.
#[derive(Clone)]
pub struct UdpTransport {
    inner: Arc<UdpTransportInner>,
}

struct UdpTransportInner {
    socket: UdpSocket,
    target: SocketAddr,
    local_addr: SocketAddr,
}

/// Bind an ephemeral socket of the target's address family.
///
/// IPv6 sockets are IPv6-only.
fn bind_ephemeral_udp_socket(target: SocketAddr) -> io::Result<UdpSocket> {
    let (domain, bind_addr) = if target.is_ipv6() {
        (Domain::IPV6, SocketAddr::new(IpAddr::V6(Ipv6Addr::UNSPECIFIED), 0))
    } else {
        (Domain::IPV4, SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 0))
    };

    let socket = Socket::new(domain, Type::DGRAM, Some(Protocol::UDP))?;
    if target.is_ipv6() {
        socket.set_only_v6(true)?;
    }
    socket.set_nonblocking(true)?;
    socket.bind(&bind_addr.into())?;

    UdpSocket::from_std(socket.into())
}

impl UdpTransport {
    /// Connect to a target address.
    pub async fn connect(target: SocketAddr) -> Result<Self> {
        tracing::debug!(target: "snmp_messenger::transport", { snmp.target = %target }, "connecting UDP transport");

        let network = |source| Error::Network { target, source }.boxed();

        let socket = bind_ephemeral_udp_socket(target).map_err(network)?;
        socket.connect(target).await.map_err(network)?;
        let local_addr = socket.local_addr().map_err(network)?;

        tracing::debug!(target: "snmp_messenger::transport", { snmp.target = %target, snmp.local_addr = %local_addr }, "UDP transport connected");

        Ok(Self {
            inner: Arc::new(UdpTransportInner {
                socket,
                target,
                local_addr,
            }),
        })
    }
}

impl std::fmt::Debug for UdpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UdpTransport")
            .field("target", &self.inner.target)
            .field("local_addr", &self.inner.local_addr)
            .finish()
    }
}

impl Transport for UdpTransport {
    async fn send(&self, data: &[u8]) -> Result<()> {
        tracing::trace!(target: "snmp_messenger::transport", { snmp.target = %self.inner.target, snmp.bytes = data.len() }, "UDP send");
        self.inner
            .socket
            .send(data)
            .await
            .map_err(|source| {
                Error::Network {
                    target: self.inner.target,
                    source,
                }
                .boxed()
            })?;
        Ok(())
    }

    async fn recv(&self, request_id: i32, recv_timeout: Duration) -> Result<Bytes> {
        tracing::trace!(target: "snmp_messenger::transport", { snmp.target = %self.inner.target, snmp.request_id = request_id, snmp.timeout_ms = recv_timeout.as_millis() as u64 }, "UDP recv waiting");

        let mut buf = vec![0u8; RECV_BUFFER_SIZE];
        match timeout(recv_timeout, self.inner.socket.recv(&mut buf)).await {
            Ok(Ok(len)) => {
                buf.truncate(len);
                tracing::trace!(target: "snmp_messenger::transport", { snmp.target = %self.inner.target, snmp.bytes = len }, "UDP recv complete");
                Ok(Bytes::from(buf))
            }
            Ok(Err(source)) => {
                tracing::trace!(target: "snmp_messenger::transport", { snmp.target = %self.inner.target, error = %source }, "UDP recv error");
                Err(Error::Network {
                    target: self.inner.target,
                    source,
                }
                .boxed())
            }
            Err(_) => {
                tracing::trace!(target: "snmp_messenger::transport", { snmp.target = %self.inner.target, snmp.request_id = request_id }, "UDP recv timeout");
                Err(Error::Timeout {
                    target: self.inner.target,
                    elapsed: recv_timeout,
                    retries: 0,
                }
                .boxed())
            }
        }
    }

    fn peer_addr(&self) -> SocketAddr {
        self.inner.target
    }

    fn local_addr(&self) -> SocketAddr {
        self.inner.local_addr
    }
}
