//! Mock transport for testing.
//!
//! Replays queued responses, or answers each request through a responder
//! closure, and records everything sent.

use super::Transport;
use crate::error::{Error, Result};
use crate::message::{CommunityMessage, Message};
use crate::oid::Oid;
use crate::pdu::{Pdu, PduType};
use crate::value::Value;
use crate::variable::Variable;
use crate::version::Version;
use bytes::Bytes;
use std::collections::VecDeque;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// A scripted reply.
#[derive(Clone, Debug)]
pub enum MockResponse {
    /// Community message whose request ID is patched to match the request.
    Data(Bytes),
    /// Returned exactly as given.
    RawData(Bytes),
    /// Nothing arrives.
    Timeout,
    /// Socket failure.
    IoError(String),
}

/// A message sent through the mock.
#[derive(Clone, Debug)]
pub struct RecordedRequest {
    pub data: Bytes,
    /// Request ID of the PDU, when the message is not encrypted.
    pub request_id: Option<i32>,
}

type Responder = Arc<dyn Fn(&[u8]) -> Option<Bytes> + Send + Sync>;

struct MockTransportInner {
    target: SocketAddr,
    responses: VecDeque<MockResponse>,
    requests: Vec<RecordedRequest>,
    responder: Option<Responder>,
    last_request_id: Option<i32>,
}

/// Programmable transport, available with the `testing` feature.
///
/// ```rust,ignore
/// use snmp_messenger::transport::{MockTransport, ResponseBuilder};
/// use snmp_messenger::{Value, oid};
///
/// let mock = MockTransport::new("127.0.0.1:161".parse().unwrap());
/// mock.queue_response(
///     ResponseBuilder::new(1)
///         .variable(oid!(1, 3, 6, 1, 2, 1, 1, 5, 0), Value::from("router"))
///         .build_v2c(b"public"),
/// );
/// mock.queue_timeout();
/// assert_eq!(mock.queued_response_count(), 2);
/// ```
#[derive(Clone)]
pub struct MockTransport {
    inner: Arc<Mutex<MockTransportInner>>,
}

impl MockTransport {
    pub fn new(target: SocketAddr) -> Self {
        Self {
            inner: Arc::new(Mutex::new(MockTransportInner {
                target,
                responses: VecDeque::new(),
                requests: Vec::new(),
                responder: None,
                last_request_id: None,
            })),
        }
    }

    /// Answer every request by calling `responder` with the request bytes.
    ///
    /// `None` means the agent stays silent. Responder output is returned
    /// without request ID patching, after anything already queued.
    pub fn with_responder<F>(target: SocketAddr, responder: F) -> Self
    where
        F: Fn(&[u8]) -> Option<Bytes> + Send + Sync + 'static,
    {
        let mock = Self::new(target);
        mock.lock().responder = Some(Arc::new(responder));
        mock
    }

    fn lock(&self) -> MutexGuard<'_, MockTransportInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue a community response; its request ID is patched to match.
    pub fn queue_response(&self, data: impl Into<Bytes>) {
        self.lock().responses.push_back(MockResponse::Data(data.into()));
    }

    /// Queue a response returned byte for byte.
    pub fn queue_raw_response(&self, data: impl Into<Bytes>) {
        self.lock().responses.push_back(MockResponse::RawData(data.into()));
    }

    pub fn queue_timeout(&self) {
        self.lock().responses.push_back(MockResponse::Timeout);
    }

    pub fn queue_io_error(&self, msg: impl Into<String>) {
        self.lock().responses.push_back(MockResponse::IoError(msg.into()));
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.lock().requests.clone()
    }

    pub fn clear_requests(&self) {
        self.lock().requests.clear();
    }

    pub fn queued_response_count(&self) -> usize {
        self.lock().responses.len()
    }

    fn extract_request_id(data: &[u8]) -> Option<i32> {
        Message::decode(Bytes::copy_from_slice(data))
            .ok()?
            .pdu()
            .map(|pdu| pdu.request_id)
    }

    /// Rewrite the request ID of a community message.
    fn patch_request_id(data: Bytes, request_id: i32) -> Bytes {
        match Message::decode(data.clone()) {
            Ok(Message::Community(mut msg)) => {
                msg.pdu.request_id = request_id;
                msg.encode()
            }
            _ => data,
        }
    }
}

impl std::fmt::Debug for MockTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.lock();
        f.debug_struct("MockTransport")
            .field("target", &inner.target)
            .field("queued", &inner.responses.len())
            .field("requests", &inner.requests.len())
            .finish_non_exhaustive()
    }
}

impl Transport for MockTransport {
    async fn send(&self, data: &[u8]) -> Result<()> {
        let data = Bytes::copy_from_slice(data);
        let request_id = Self::extract_request_id(&data);

        let responder = {
            let mut inner = self.lock();
            inner.requests.push(RecordedRequest {
                data: data.clone(),
                request_id,
            });
            inner.last_request_id = request_id;
            inner.responder.clone()
        };

        // Called without the lock so responders may inspect the mock.
        if let Some(responder) = responder {
            let reply = match responder(&data[..]) {
                Some(bytes) => MockResponse::RawData(bytes),
                None => MockResponse::Timeout,
            };
            self.lock().responses.push_back(reply);
        }
        Ok(())
    }

    async fn recv(&self, _request_id: i32, timeout: Duration) -> Result<Bytes> {
        let (response, target, last_request_id) = {
            let mut inner = self.lock();
            (inner.responses.pop_front(), inner.target, inner.last_request_id)
        };

        match response {
            Some(MockResponse::Data(data)) => Ok(match last_request_id {
                Some(id) => Self::patch_request_id(data, id),
                None => data,
            }),
            Some(MockResponse::RawData(data)) => Ok(data),
            Some(MockResponse::IoError(msg)) => Err(Error::Network {
                target,
                source: std::io::Error::other(msg),
            }
            .boxed()),
            Some(MockResponse::Timeout) | None => Err(Error::Timeout {
                target,
                elapsed: timeout,
                retries: 0,
            }
            .boxed()),
        }
    }

    fn peer_addr(&self) -> SocketAddr {
        self.lock().target
    }

    fn local_addr(&self) -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 0)
    }
}

/// Builds community Response messages for tests.
#[derive(Debug, Clone)]
pub struct ResponseBuilder {
    request_id: i32,
    variables: Vec<Variable>,
    error_status: i32,
    error_index: i32,
}

impl ResponseBuilder {
    pub fn new(request_id: i32) -> Self {
        Self {
            request_id,
            variables: Vec::new(),
            error_status: 0,
            error_index: 0,
        }
    }

    pub fn variable(mut self, oid: Oid, value: Value) -> Self {
        self.variables.push(Variable::new(oid, value));
        self
    }

    pub fn error_status(mut self, status: i32) -> Self {
        self.error_status = status;
        self
    }

    pub fn error_index(mut self, index: i32) -> Self {
        self.error_index = index;
        self
    }

    /// The Response PDU on its own, for wrapping in a v3 message.
    pub fn build_pdu(self) -> Pdu {
        Pdu {
            pdu_type: PduType::Response,
            request_id: self.request_id,
            error_status: self.error_status,
            error_index: self.error_index,
            variables: self.variables,
        }
    }

    pub fn build_v1(self, community: &[u8]) -> Bytes {
        self.build(Version::V1, community)
    }

    pub fn build_v2c(self, community: &[u8]) -> Bytes {
        self.build(Version::V2c, community)
    }

    fn build(self, version: Version, community: &[u8]) -> Bytes {
        let community = Bytes::copy_from_slice(community);
        let pdu = self.build_pdu();
        let msg = match version {
            Version::V1 => CommunityMessage::v1(community, pdu),
            _ => CommunityMessage::v2c(community, pdu),
        };
        msg.encode()
    }
}
