//! Request/response session with one agent.
//!
//! [`Messenger`] sends GET, GETNEXT, SET and GETBULK requests, correlates the
//! replies, re-sends on timeout according to [`Retry`], and for SNMPv3 runs
//! engine discovery and time synchronization before the first request.

mod retry;
mod v3;
mod walk;

pub use retry::{Backoff, Retry};
pub use walk::WalkMode;

use std::net::SocketAddr;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};

use bytes::Bytes;
use tracing::{Span, instrument};

use crate::error::{DecodeErrorKind, EncodeErrorKind, Error, Result};
use crate::message::{CommunityMessage, MSG_MAX_SIZE};
use crate::oid::Oid;
use crate::pdu::{Pdu, PduType};
use crate::security::{EngineState, UserSecurity};
use crate::transport::{Transport, UdpTransport};
use crate::variable::Variable;
use crate::version::Version;

/// Session settings.
#[derive(Clone, Debug)]
pub struct MessengerConfig {
    /// Protocol version (default: v2c).
    pub version: Version,
    /// Community for v1/v2c (default: `public`).
    pub community: Bytes,
    /// Wait per attempt (default: 5 seconds).
    pub timeout: Duration,
    /// Re-sends on timeout (default: none).
    pub retry: Retry,
    /// GETBULK max-repetitions used by walks (default: 10).
    pub max_repetitions: u32,
    /// Walk termination rule (default: stay within the root subtree).
    pub walk_mode: WalkMode,
    /// msgMaxSize advertised in v3 requests (default: 65507).
    pub max_message_size: i32,
}

impl Default for MessengerConfig {
    fn default() -> Self {
        Self {
            version: Version::V2c,
            community: Bytes::from_static(b"public"),
            timeout: Duration::from_secs(5),
            retry: Retry::none(),
            max_repetitions: 10,
            walk_mode: WalkMode::WithinSubtree,
            max_message_size: MSG_MAX_SIZE,
        }
    }
}

impl MessengerConfig {
    /// SNMPv1 with the given community.
    pub fn v1(community: impl Into<Bytes>) -> Self {
        Self {
            version: Version::V1,
            community: community.into(),
            ..Self::default()
        }
    }

    /// SNMPv2c with the given community.
    pub fn v2c(community: impl Into<Bytes>) -> Self {
        Self {
            version: Version::V2c,
            community: community.into(),
            ..Self::default()
        }
    }

    /// SNMPv3; credentials come from the [`UserSecurity`] given to the messenger.
    pub fn v3() -> Self {
        Self {
            version: Version::V3,
            ..Self::default()
        }
    }
}

/// Next value of a 31-bit identifier counter. Zero is never returned.
fn next_id(counter: &AtomicI32) -> i32 {
    fn step(value: i32) -> i32 {
        match value.wrapping_add(1) & i32::MAX {
            0 => 1,
            next => next,
        }
    }
    match counter.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |v| Some(step(v))) {
        Ok(previous) | Err(previous) => step(previous),
    }
}

fn random_seed() -> i32 {
    let mut seed = [0u8; 4];
    if let Err(e) = getrandom::fill(&mut seed) {
        tracing::warn!(target: "snmp_messenger::messenger", { error = %e }, "identifier seeding failed");
    }
    i32::from_ne_bytes(seed) & i32::MAX
}

/// SNMP session with a single agent.
///
/// Cheap to clone; clones share the transport, identifier counters and
/// discovered engine state. Each call performs one exchange at a time.
///
/// ```rust,no_run
/// use snmp_messenger::{Messenger, MessengerConfig, oid};
///
/// # async fn example() -> snmp_messenger::Result<()> {
/// let messenger = Messenger::connect(
///     "192.168.1.1:161".parse().unwrap(),
///     MessengerConfig::v2c("public"),
/// )
/// .await?;
///
/// for variable in messenger.get(&[oid!(1, 3, 6, 1, 2, 1, 1, 1, 0)]).await? {
///     println!("{}", variable);
/// }
/// # Ok(())
/// # }
/// ```
pub struct Messenger<T: Transport = UdpTransport> {
    inner: Arc<MessengerInner<T>>,
}

struct MessengerInner<T> {
    transport: T,
    config: MessengerConfig,
    security: Option<UserSecurity>,
    engine_state: RwLock<Option<EngineState>>,
    msg_id: AtomicI32,
    request_id: AtomicI32,
}

impl<T: Transport> Clone for Messenger<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Transport> std::fmt::Debug for Messenger<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Messenger")
            .field("target", &self.peer_addr())
            .field("version", &self.inner.config.version)
            .field("security", &self.inner.security)
            .finish_non_exhaustive()
    }
}

impl Messenger<UdpTransport> {
    /// Open a UDP session for v1/v2c.
    pub async fn connect(target: SocketAddr, config: MessengerConfig) -> Result<Self> {
        Ok(Self::new(UdpTransport::connect(target).await?, config))
    }

    /// Open a UDP session for v3.
    pub async fn connect_v3(
        target: SocketAddr,
        config: MessengerConfig,
        security: UserSecurity,
    ) -> Result<Self> {
        Ok(Self::with_security(
            UdpTransport::connect(target).await?,
            config,
            security,
        ))
    }
}

impl<T: Transport> Messenger<T> {
    /// Session without v3 credentials.
    pub fn new(transport: T, config: MessengerConfig) -> Self {
        Self::build(transport, config, None)
    }

    /// Session with v3 credentials.
    pub fn with_security(transport: T, config: MessengerConfig, security: UserSecurity) -> Self {
        Self::build(transport, config, Some(security))
    }

    fn build(transport: T, config: MessengerConfig, security: Option<UserSecurity>) -> Self {
        Self {
            inner: Arc::new(MessengerInner {
                transport,
                config,
                security,
                engine_state: RwLock::new(None),
                msg_id: AtomicI32::new(random_seed()),
                request_id: AtomicI32::new(random_seed()),
            }),
        }
    }

    /// Address of the agent.
    pub fn peer_addr(&self) -> SocketAddr {
        self.inner.transport.peer_addr()
    }

    /// Configuration this messenger was built with.
    pub fn config(&self) -> &MessengerConfig {
        &self.inner.config
    }

    /// Engine parameters learned by discovery, if any.
    pub fn engine_state(&self) -> Option<EngineState> {
        self.inner
            .engine_state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set_engine_state(&self, state: EngineState) {
        *self
            .inner
            .engine_state
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(state);
    }

    fn next_request_id(&self) -> i32 {
        next_id(&self.inner.request_id)
    }

    fn next_msg_id(&self) -> i32 {
        next_id(&self.inner.msg_id)
    }

    /// GET the given OIDs.
    #[instrument(skip(self, oids), err, fields(snmp.target = %self.peer_addr(), snmp.oid_count = oids.len()))]
    pub async fn get(&self, oids: &[Oid]) -> Result<Vec<Variable>> {
        let pdu = Pdu::get_request(self.next_request_id(), oids);
        self.check_status(self.request(pdu).await?)
    }

    /// GETNEXT for each of the given OIDs.
    #[instrument(skip(self, oids), err, fields(snmp.target = %self.peer_addr(), snmp.oid_count = oids.len()))]
    pub async fn get_next(&self, oids: &[Oid]) -> Result<Vec<Variable>> {
        let pdu = Pdu::get_next_request(self.next_request_id(), oids);
        self.check_status(self.request(pdu).await?)
    }

    /// SET the given variables. Returns the agent's view of them.
    #[instrument(skip(self, variables), err, fields(snmp.target = %self.peer_addr(), snmp.oid_count = variables.len()))]
    pub async fn set(&self, variables: &[Variable]) -> Result<Vec<Variable>> {
        let pdu = Pdu::set_request(self.next_request_id(), variables.to_vec());
        self.check_status(self.request(pdu).await?)
    }

    /// GETBULK (v2c and v3 only).
    ///
    /// The first `non_repeaters` OIDs get one successor each, the rest up to
    /// `max_repetitions` successors each.
    #[instrument(skip(self, oids), err, fields(snmp.target = %self.peer_addr(), snmp.oid_count = oids.len()))]
    pub async fn get_bulk(
        &self,
        oids: &[Oid],
        non_repeaters: i32,
        max_repetitions: i32,
    ) -> Result<Vec<Variable>> {
        let pdu = Pdu::get_bulk(self.next_request_id(), non_repeaters, max_repetitions, oids);
        self.check_status(self.request(pdu).await?)
    }

    /// Turn an error-status reply into [`Error::Snmp`].
    fn check_status(&self, response: Pdu) -> Result<Vec<Variable>> {
        if response.is_error() {
            return Err(Error::Snmp {
                target: self.peer_addr(),
                status: response.error_status_enum(),
                index: u32::try_from(response.error_index).unwrap_or(0),
                oid: response.error_oid().cloned(),
                response: Box::new(response),
            }
            .boxed());
        }
        Ok(response.variables)
    }

    /// Send one request PDU and return the reply, error status included.
    async fn request(&self, pdu: Pdu) -> Result<Pdu> {
        let version = self.inner.config.version;
        if pdu.pdu_type == PduType::GetBulkRequest && version == Version::V1 {
            return Err(Error::Config("GETBULK requires SNMPv2c or SNMPv3".into()).boxed());
        }
        pdu.validate_oids()?;

        tracing::debug!(target: "snmp_messenger::messenger", { snmp.pdu_type = %pdu.pdu_type, snmp.request_id = pdu.request_id, snmp.varbind_count = pdu.variables.len() }, "sending {} request", pdu.pdu_type);

        let response = if version == Version::V3 {
            self.request_v3(pdu).await?
        } else {
            self.request_community(pdu).await?
        };

        tracing::debug!(target: "snmp_messenger::messenger", { snmp.request_id = response.request_id, snmp.varbind_count = response.variables.len(), snmp.error_status = response.error_status, snmp.error_index = response.error_index }, "received response");
        Ok(response)
    }

    async fn request_community(&self, pdu: Pdu) -> Result<Pdu> {
        let version = self.inner.config.version;
        let request_id = pdu.request_id;
        let community = self.inner.config.community.clone();
        let data = CommunityMessage::new(version, community, pdu)?.encode();

        self.exchange(request_id, &data, |bytes| {
            let msg = CommunityMessage::decode(bytes)?;
            if msg.version != version {
                return Err(Error::decode(
                    0,
                    DecodeErrorKind::VersionMismatch {
                        expected: version.as_i32(),
                        actual: msg.version.as_i32(),
                    },
                ));
            }
            if msg.pdu.request_id != request_id {
                tracing::warn!(target: "snmp_messenger::messenger", { expected = request_id, actual = msg.pdu.request_id, snmp.target = %self.peer_addr() }, "discarding response with foreign request ID");
                return Ok(None);
            }
            expect_response(&msg.pdu)?;
            Ok(Some(msg.pdu))
        })
        .await
    }

    /// Send `data` and feed incoming datagrams to `accept` until it yields a
    /// value.
    ///
    /// `accept` returns `Ok(None)` for datagrams that belong to another
    /// exchange. Each attempt waits up to the configured timeout; only
    /// timeouts are retried.
    #[instrument(
        level = "debug",
        skip(self, data, accept),
        fields(
            snmp.target = %self.peer_addr(),
            snmp.request_id = request_id,
            snmp.attempt = tracing::field::Empty,
            snmp.elapsed_ms = tracing::field::Empty,
        )
    )]
    async fn exchange<R>(
        &self,
        request_id: i32,
        data: &[u8],
        mut accept: impl FnMut(Bytes) -> Result<Option<R>>,
    ) -> Result<R> {
        let start = Instant::now();
        let retry = &self.inner.config.retry;
        let timeout = self.inner.config.timeout;

        for attempt in 0..=retry.max_attempts {
            Span::current().record("snmp.attempt", attempt);
            if attempt > 0 {
                let delay = retry.compute_delay(attempt - 1);
                if !delay.is_zero() {
                    tracing::debug!(target: "snmp_messenger::messenger", { delay_ms = delay.as_millis() as u64 }, "backing off");
                    tokio::time::sleep(delay).await;
                }
                tracing::debug!(target: "snmp_messenger::messenger", "retrying request");
            }

            tracing::trace!(target: "snmp_messenger::messenger", { snmp.bytes = data.len() }, "sending request");
            self.inner.transport.send(data).await?;

            let deadline = Instant::now() + timeout;
            loop {
                let remaining = deadline.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    break;
                }
                match self.inner.transport.recv(request_id, remaining).await {
                    Ok(bytes) => {
                        tracing::trace!(target: "snmp_messenger::messenger", { snmp.bytes = bytes.len() }, "received datagram");
                        if let Some(reply) = accept(bytes)? {
                            let elapsed_ms = start.elapsed().as_millis() as u64;
                            Span::current().record("snmp.elapsed_ms", elapsed_ms);
                            return Ok(reply);
                        }
                    }
                    Err(e) if matches!(*e, Error::Timeout { .. }) => break,
                    Err(e) => return Err(e),
                }
            }
        }

        let elapsed = start.elapsed();
        Span::current().record("snmp.elapsed_ms", elapsed.as_millis() as u64);
        tracing::debug!(target: "snmp_messenger::messenger", { snmp.request_id = request_id, snmp.target = %self.peer_addr(), ?elapsed, retries = retry.max_attempts }, "request timed out");
        Err(Error::Timeout {
            target: self.peer_addr(),
            elapsed,
            retries: retry.max_attempts,
        }
        .boxed())
    }
}

fn expect_response(pdu: &Pdu) -> Result<()> {
    if pdu.pdu_type != PduType::Response {
        return Err(Error::decode(
            0,
            DecodeErrorKind::UnexpectedPduType {
                expected: PduType::Response.tag(),
                actual: pdu.pdu_type.tag(),
            },
        ));
    }
    Ok(())
}

fn missing_security() -> Box<Error> {
    Error::encode(EncodeErrorKind::NoSecurityConfig)
}
