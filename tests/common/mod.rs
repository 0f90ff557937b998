//! Shared test infrastructure: an in-process scripted agent.
//!
//! The agent answers requests handed to it by `MockTransport::with_responder`
//! from a small MIB, speaking v1/v2c communities or SNMPv3 USM with the
//! library's own providers.

// Not every test file uses every helper.
#![allow(dead_code)]

use bytes::Bytes;
use snmp_messenger::message::{
    CommunityMessage, Message, MsgFlags, MsgGlobalData, ScopedPdu, SecurityLevel, V3Message,
    V3MessageData,
};
use snmp_messenger::security::engine::report_oids;
use snmp_messenger::security::{
    AUTH_PARAMS_LEN, PrivacyProvider, UserSecurity, UsmSecurityParams,
};
use snmp_messenger::transport::MockTransport;
use snmp_messenger::{
    Messenger, MessengerConfig, Oid, Pdu, PduType, Value, Variable, Version, oid,
};
use std::collections::{BTreeMap, VecDeque};
use std::net::SocketAddr;
use std::ops::Bound;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

pub const AUTH_PHRASE: &str = "authpass123";
pub const PRIV_PHRASE: &str = "privpass123";
pub const USER: &str = "admin";
pub const ENGINE_ID: &[u8] = b"\x80\x00\x1f\x88\x04test-agent";

pub fn target() -> SocketAddr {
    "192.0.2.10:161".parse().unwrap()
}

pub fn sys_descr() -> Oid {
    oid!(1, 3, 6, 1, 2, 1, 1, 1, 0)
}

pub fn system_subtree() -> Oid {
    oid!(1, 3, 6, 1, 2, 1, 1)
}

/// system group plus one interfaces entry past the subtree.
pub fn system_mib() -> BTreeMap<Oid, Value> {
    BTreeMap::from([
        (sys_descr(), Value::from("Test SNMP Agent")),
        (oid!(1, 3, 6, 1, 2, 1, 1, 2, 0), Value::from(oid!(1, 3, 6, 1, 4, 1, 99999))),
        (oid!(1, 3, 6, 1, 2, 1, 1, 3, 0), Value::TimeTicks(123_456)),
        (oid!(1, 3, 6, 1, 2, 1, 1, 4, 0), Value::from("admin@example.com")),
        (oid!(1, 3, 6, 1, 2, 1, 1, 5, 0), Value::from("test-agent")),
        (oid!(1, 3, 6, 1, 2, 1, 1, 6, 0), Value::from("Server Room")),
        (oid!(1, 3, 6, 1, 2, 1, 1, 7, 0), Value::Integer(72)),
        (oid!(1, 3, 6, 1, 2, 1, 2, 1, 0), Value::Integer(2)),
    ])
}

fn next_entry(mib: &BTreeMap<Oid, Value>, after: &Oid) -> Option<Variable> {
    mib.range((Bound::Excluded(after), Bound::Unbounded))
        .next()
        .map(|(id, data)| Variable::new(id.clone(), data.clone()))
}

/// Answer a request PDU from `mib` the way an agent of `version` would.
pub fn answer(mib: &BTreeMap<Oid, Value>, version: Version, request: &Pdu) -> Pdu {
    let mut response = Pdu {
        pdu_type: PduType::Response,
        request_id: request.request_id,
        error_status: 0,
        error_index: 0,
        variables: Vec::new(),
    };

    match request.pdu_type {
        PduType::GetRequest | PduType::GetNextRequest => {
            for (i, requested) in request.variables.iter().enumerate() {
                let found = if request.pdu_type == PduType::GetRequest {
                    mib.get(&requested.id)
                        .map(|data| Variable::new(requested.id.clone(), data.clone()))
                } else {
                    next_entry(mib, &requested.id)
                };
                match (found, version) {
                    (Some(variable), _) => response.variables.push(variable),
                    (None, Version::V1) => {
                        response.error_status = 2;
                        response.error_index = i as i32 + 1;
                        response.variables = request.variables.clone();
                        return response;
                    }
                    (None, _) => {
                        let exception = if request.pdu_type == PduType::GetRequest {
                            Value::NoSuchObject
                        } else {
                            Value::EndOfMibView
                        };
                        response
                            .variables
                            .push(Variable::new(requested.id.clone(), exception));
                    }
                }
            }
        }
        PduType::GetBulkRequest => {
            let non_repeaters = request.error_status.max(0) as usize;
            let max_repetitions = request.error_index.max(0) as usize;
            let next_or_end = |id: &Oid| {
                next_entry(mib, id)
                    .unwrap_or_else(|| Variable::new(id.clone(), Value::EndOfMibView))
            };
            for requested in request.variables.iter().take(non_repeaters) {
                response.variables.push(next_or_end(&requested.id));
            }
            let mut cursors: Vec<Oid> = request
                .variables
                .iter()
                .skip(non_repeaters)
                .map(|v| v.id.clone())
                .collect();
            for _ in 0..max_repetitions {
                for cursor in cursors.iter_mut() {
                    let variable = next_or_end(cursor);
                    *cursor = variable.id.clone();
                    response.variables.push(variable);
                }
            }
        }
        PduType::SetRequest => response.variables = request.variables.clone(),
        _ => {
            response.error_status = 5;
        }
    }
    response
}

/// v1/v2c agent over `mib`, checking the community.
pub fn community_transport(mib: BTreeMap<Oid, Value>, community: &'static [u8]) -> MockTransport {
    MockTransport::with_responder(target(), move |req| {
        let msg = CommunityMessage::decode(Bytes::copy_from_slice(req)).ok()?;
        if msg.community.as_ref() != community {
            return None;
        }
        let response = answer(&mib, msg.version, &msg.pdu);
        let reply = match msg.version {
            Version::V1 => CommunityMessage::v1(msg.community, response),
            _ => CommunityMessage::v2c(msg.community, response),
        };
        Some(reply.encode())
    })
}

/// SNMPv3 agent with one user, answering from [`system_mib`].
///
/// The agent's providers are built from the same phrases as the client's
/// but are separate instances, so both sides derive keys independently.
pub struct V3Agent {
    engine_boots: AtomicU32,
    engine_time: AtomicU32,
    user: Bytes,
    privacy: Arc<dyn PrivacyProvider>,
    mib: BTreeMap<Oid, Value>,
    /// Report OID answering discovery requests.
    discovery_report: Mutex<Oid>,
    /// Report OIDs sent in place of the next responses.
    pending_reports: Mutex<VecDeque<Oid>>,
    corrupt_digest: AtomicBool,
}

impl V3Agent {
    pub fn new(security: UserSecurity) -> Arc<Self> {
        Arc::new(Self {
            engine_boots: AtomicU32::new(5),
            engine_time: AtomicU32::new(3600),
            user: security.user,
            privacy: security.privacy,
            mib: system_mib(),
            discovery_report: Mutex::new(report_oids::unknown_engine_ids()),
            pending_reports: Mutex::new(VecDeque::new()),
            corrupt_digest: AtomicBool::new(false),
        })
    }

    /// authPriv agent with SHA and DES.
    pub fn auth_priv() -> Arc<Self> {
        Self::new(auth_priv_user(AUTH_PHRASE, PRIV_PHRASE))
    }

    pub fn set_clock(&self, boots: u32, time: u32) {
        self.engine_boots.store(boots, Ordering::SeqCst);
        self.engine_time.store(time, Ordering::SeqCst);
    }

    pub fn engine_boots(&self) -> u32 {
        self.engine_boots.load(Ordering::SeqCst)
    }

    /// Answer discovery with `oid` instead of unknownEngineIDs.
    pub fn set_discovery_report(&self, oid: Oid) {
        *self.discovery_report.lock().unwrap() = oid;
    }

    pub fn queue_report(&self, oid: Oid) {
        self.pending_reports.lock().unwrap().push_back(oid);
    }

    /// Flip a bit in the HMAC of every following response.
    pub fn corrupt_digests(&self) {
        self.corrupt_digest.store(true, Ordering::SeqCst);
    }

    /// A transport whose every request is answered by this agent.
    pub fn transport(self: &Arc<Self>) -> MockTransport {
        let agent = Arc::clone(self);
        MockTransport::with_responder(target(), move |req| agent.handle(req))
    }

    fn params(&self) -> UsmSecurityParams {
        UsmSecurityParams::new(
            Bytes::from_static(ENGINE_ID),
            self.engine_boots(),
            self.engine_time.load(Ordering::SeqCst),
            self.user.clone(),
        )
    }

    fn report(&self, msg_id: i32, request_id: i32, oid: Oid) -> Bytes {
        let pdu = Pdu {
            pdu_type: PduType::Report,
            request_id,
            error_status: 0,
            error_index: 0,
            variables: vec![Variable::new(oid, Value::Counter32(1))],
        };
        V3Message::new(
            MsgGlobalData::new(msg_id, 65507, MsgFlags::new(SecurityLevel::NoAuthNoPriv, false)),
            self.params().encode(),
            ScopedPdu::new(Bytes::from_static(ENGINE_ID), Bytes::new(), pdu),
        )
        .encode()
    }

    pub fn handle(&self, req: &[u8]) -> Option<Bytes> {
        let msg = V3Message::decode(Bytes::copy_from_slice(req)).ok()?;
        let msg_id = msg.msg_id();
        let params = UsmSecurityParams::decode(msg.security_params.clone()).ok()?;

        if params.engine_id.is_empty() {
            let request_id = msg.pdu().map_or(0, |pdu| pdu.request_id);
            let oid = self.discovery_report.lock().unwrap().clone();
            return Some(self.report(msg_id, request_id, oid));
        }
        if let Some(oid) = self.pending_reports.lock().unwrap().pop_front() {
            return Some(self.report(msg_id, 0, oid));
        }

        let level = msg.security_level();
        if level != self.privacy.security_level() {
            return Some(self.report(msg_id, 0, report_oids::unsupported_sec_levels()));
        }
        if params.username != self.user {
            return Some(self.report(msg_id, 0, report_oids::unknown_user_names()));
        }
        if level.requires_auth() && !self.privacy.auth().verify(req, ENGINE_ID) {
            return Some(self.report(msg_id, 0, report_oids::wrong_digests()));
        }

        let scoped_pdu = match msg.data {
            V3MessageData::Plaintext(scoped_pdu) => scoped_pdu,
            V3MessageData::Encrypted(ciphertext) => {
                let plaintext = self
                    .privacy
                    .decrypt(&ciphertext, ENGINE_ID, &params.priv_params)
                    .ok()
                    .and_then(|plain| ScopedPdu::decode_padded(Bytes::from(plain)).ok());
                match plaintext {
                    Some(scoped_pdu) => scoped_pdu,
                    None => return Some(self.report(msg_id, 0, report_oids::decryption_errors())),
                }
            }
        };

        let response = answer(&self.mib, Version::V3, &scoped_pdu.pdu);
        let scoped_response = ScopedPdu::new(Bytes::from_static(ENGINE_ID), Bytes::new(), response);
        let mut reply_params = self.params();

        let data = if level.requires_priv() {
            let (ciphertext, salt) = self
                .privacy
                .encrypt(
                    &scoped_response.encode_to_bytes(),
                    ENGINE_ID,
                    reply_params.engine_boots,
                    reply_params.engine_time,
                )
                .ok()?;
            reply_params = reply_params.with_priv_params(salt);
            V3MessageData::Encrypted(Bytes::from(ciphertext))
        } else {
            V3MessageData::Plaintext(scoped_response)
        };
        if level.requires_auth() {
            reply_params = reply_params.with_auth_placeholder(AUTH_PARAMS_LEN);
        }

        let reply = V3Message {
            global_data: MsgGlobalData::new(msg_id, 65507, MsgFlags::new(level, false)),
            security_params: reply_params.encode(),
            data,
        };
        let mut encoded = reply.encode().to_vec();
        self.privacy.auth().authenticate(&mut encoded, ENGINE_ID).ok()?;
        if self.corrupt_digest.load(Ordering::SeqCst)
            && let Some((start, _)) = UsmSecurityParams::find_auth_params_offset(&encoded)
        {
            encoded[start] ^= 0x01;
        }
        Some(Bytes::from(encoded))
    }
}

pub fn auth_priv_user(auth_phrase: &str, priv_phrase: &str) -> UserSecurity {
    UserSecurity::from_names(USER, Some(("SHA", auth_phrase)), Some(("DES", priv_phrase))).unwrap()
}

pub fn v3_messenger(transport: MockTransport, security: UserSecurity) -> Messenger<MockTransport> {
    Messenger::with_security(transport, MessengerConfig::v3(), security)
}

/// Decode a recorded request regardless of version.
pub fn decode_request(data: &Bytes) -> Message {
    Message::decode(data.clone()).unwrap()
}
