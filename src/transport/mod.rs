//! Transport layer abstraction.
//!
//! [`Transport`] moves encoded messages to and from one agent.
//! [`UdpTransport`] is the network implementation; [`MockTransport`]
//! (tests and the `testing` feature) replays scripted responses.

mod udp;

#[cfg(any(test, feature = "testing"))]
mod mock;

pub use udp::UdpTransport;

#[cfg(any(test, feature = "testing"))]
pub use mock::{MockResponse, MockTransport, RecordedRequest, ResponseBuilder};

use crate::error::Result;
use bytes::Bytes;
use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;

/// Client-side transport to a single agent.
///
/// Implementations are cheap to clone; clones share the underlying socket.
pub trait Transport: Send + Sync + Clone {
    /// Send one encoded message.
    fn send(&self, data: &[u8]) -> impl Future<Output = Result<()>> + Send;

    /// Wait up to `timeout` for the next datagram.
    ///
    /// Fails with [`Error::Timeout`](crate::Error::Timeout) when nothing
    /// arrives in time. `request_id` is used for diagnostics only; the
    /// messenger checks correlation after decoding.
    fn recv(
        &self,
        request_id: i32,
        timeout: Duration,
    ) -> impl Future<Output = Result<Bytes>> + Send;

    /// The agent address.
    fn peer_addr(&self) -> SocketAddr;

    /// Local bind address.
    fn local_addr(&self) -> SocketAddr;
}
