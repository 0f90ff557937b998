//! SNMPv3 exchanges: discovery, time synchronization, signing and privacy.

use bytes::Bytes;
use tracing::instrument;

use super::{Messenger, expect_response, missing_security};
use crate::error::{AuthErrorKind, CryptoErrorKind, DecodeErrorKind, EncodeErrorKind, Error, Result};
use crate::format::hex;
use crate::message::{MsgFlags, MsgGlobalData, ScopedPdu, V3Message, V3MessageData};
use crate::pdu::{Pdu, PduType};
use crate::security::engine::{is_discovery_report, is_not_in_time_window_report};
use crate::security::{
    AUTH_PARAMS_LEN, EngineState, UserSecurity, UsmSecurityParams, report_message,
};
use crate::transport::Transport;

/// A correlated v3 reply.
enum V3Reply {
    Response(Pdu),
    /// Report PDU and the USM parameters it arrived with.
    Report(Pdu, UsmSecurityParams),
}

impl<T: Transport> Messenger<T> {
    /// Learn the agent's engine ID, boots and time (RFC 3414 Section 4).
    ///
    /// Sends an unauthenticated, reportable GetRequest with no variables.
    /// The agent must answer with a Report that is empty or names
    /// unknownEngineIDs or notInTimeWindows; any other Report fails with
    /// [`Error::Report`] and nothing further is sent.
    #[instrument(level = "debug", skip(self), err, fields(snmp.target = %self.peer_addr()))]
    pub async fn discover(&self) -> Result<EngineState> {
        let msg_id = self.next_msg_id();
        let data = V3Message::discovery_request(msg_id).encode();

        let (report, params) = self
            .exchange(msg_id, &data, |bytes| {
                let msg = V3Message::decode(bytes)?;
                if msg.msg_id() != msg_id {
                    tracing::debug!(target: "snmp_messenger::messenger", { expected = msg_id, actual = msg.msg_id() }, "discarding reply to another message");
                    return Ok(None);
                }
                let params = UsmSecurityParams::decode(msg.security_params.clone())?;
                let pdu = msg
                    .into_pdu()
                    .ok_or_else(|| Error::decode(0, DecodeErrorKind::MissingPdu))?;
                Ok(Some((pdu, params)))
            })
            .await?;

        if report.pdu_type != PduType::Report {
            return Err(Error::decode(
                0,
                DecodeErrorKind::UnexpectedPduType {
                    expected: PduType::Report.tag(),
                    actual: report.pdu_type.tag(),
                },
            ));
        }
        if !is_discovery_report(&report) {
            return Err(self.report_error(&report));
        }

        let state = EngineState::from_security_params(&params);
        tracing::debug!(target: "snmp_messenger::messenger", { snmp.engine_id = %hex::Bytes(&state.engine_id), snmp.engine_boots = state.engine_boots, snmp.engine_time = state.engine_time }, "discovered engine");
        self.set_engine_state(state.clone());
        Ok(state)
    }

    /// Send a PDU with the configured user security.
    ///
    /// Discovers the engine on first use. A notInTimeWindows Report
    /// resynchronizes the engine clock and the request is re-sent once.
    pub(super) async fn request_v3(&self, pdu: Pdu) -> Result<Pdu> {
        let security = self.inner.security.as_ref().ok_or_else(missing_security)?;

        if self.engine_state().is_none() {
            self.discover().await?;
        }

        let mut resynced = false;
        loop {
            let state = self
                .engine_state()
                .ok_or_else(|| Error::encode(EncodeErrorKind::EngineNotDiscovered))?;
            let msg_id = self.next_msg_id();
            let data = self.encode_v3(security, &state, msg_id, &pdu)?;

            tracing::debug!(target: "snmp_messenger::messenger", { snmp.msg_id = msg_id, snmp.security_level = ?security.security_level(), snmp.bytes = data.len() }, "sending v3 message");

            let reply = self
                .exchange(msg_id, &data, |bytes| {
                    self.accept_v3(bytes, security, &state, msg_id, pdu.request_id)
                })
                .await?;

            match reply {
                V3Reply::Response(response) => return Ok(response),
                V3Reply::Report(report, params)
                    if !resynced && is_not_in_time_window_report(&report) =>
                {
                    tracing::debug!(target: "snmp_messenger::messenger", { snmp.engine_boots = params.engine_boots, snmp.engine_time = params.engine_time }, "not in time window, resyncing");
                    let mut state = state;
                    state.resync(&params);
                    self.set_engine_state(state);
                    resynced = true;
                }
                V3Reply::Report(report, _) => return Err(self.report_error(&report)),
            }
        }
    }

    /// Build, encrypt and sign a request.
    fn encode_v3(
        &self,
        security: &UserSecurity,
        state: &EngineState,
        msg_id: i32,
        pdu: &Pdu,
    ) -> Result<Vec<u8>> {
        let level = security.security_level();
        let engine_boots = state.engine_boots;
        let engine_time = state.estimated_time();

        let scoped_pdu = ScopedPdu::new(state.engine_id.clone(), Bytes::new(), pdu.clone());
        let mut params = UsmSecurityParams::new(
            state.engine_id.clone(),
            engine_boots,
            engine_time,
            security.user.clone(),
        );

        let data = if level.requires_priv() {
            let (ciphertext, priv_params) = security
                .privacy
                .encrypt(
                    &scoped_pdu.encode_to_bytes(),
                    &state.engine_id,
                    engine_boots,
                    engine_time,
                )
                .map_err(|e| self.with_target(e))?;
            tracing::trace!(target: "snmp_messenger::security", { ciphertext_len = ciphertext.len() }, "encrypted scoped PDU");
            params = params.with_priv_params(priv_params);
            V3MessageData::Encrypted(Bytes::from(ciphertext))
        } else {
            V3MessageData::Plaintext(scoped_pdu)
        };

        if level.requires_auth() {
            params = params.with_auth_placeholder(AUTH_PARAMS_LEN);
        }

        let msg = V3Message {
            global_data: MsgGlobalData::new(
                msg_id,
                self.inner.config.max_message_size,
                MsgFlags::new(level, true),
            ),
            security_params: params.encode(),
            data,
        };

        let mut encoded = msg.encode().to_vec();
        security.auth().authenticate(&mut encoded, &state.engine_id)?;
        Ok(encoded)
    }

    /// Verify, decrypt and classify one datagram.
    ///
    /// `Ok(None)` for replies to other messages.
    fn accept_v3(
        &self,
        raw: Bytes,
        security: &UserSecurity,
        state: &EngineState,
        msg_id: i32,
        request_id: i32,
    ) -> Result<Option<V3Reply>> {
        let target = self.peer_addr();
        let msg = V3Message::decode(raw.clone())?;
        if msg.msg_id() != msg_id {
            tracing::debug!(target: "snmp_messenger::messenger", { expected = msg_id, actual = msg.msg_id() }, "discarding reply to another message");
            return Ok(None);
        }

        let params = UsmSecurityParams::decode(msg.security_params.clone())?;
        let authenticated = msg.security_level().requires_auth();
        if authenticated && !security.auth().verify(&raw, &state.engine_id) {
            return Err(Error::auth(target, AuthErrorKind::HmacMismatch));
        }

        let (scoped_pdu, encrypted) = match msg.data {
            V3MessageData::Plaintext(scoped_pdu) => (scoped_pdu, false),
            V3MessageData::Encrypted(ciphertext) => {
                let plaintext = security
                    .privacy
                    .decrypt(&ciphertext, &state.engine_id, &params.priv_params)
                    .map_err(|e| self.with_target(e))?;
                (ScopedPdu::decode_padded(Bytes::from(plaintext))?, true)
            }
        };
        let pdu = scoped_pdu.pdu;

        if pdu.pdu_type == PduType::Report {
            return Ok(Some(V3Reply::Report(pdu, params)));
        }

        let level = security.security_level();
        if level.requires_auth() && !authenticated {
            return Err(Error::auth(target, AuthErrorKind::UnauthenticatedResponse));
        }
        if level.requires_priv() && !encrypted {
            return Err(Error::decrypt(target, CryptoErrorKind::UnencryptedResponse));
        }
        expect_response(&pdu)?;
        if pdu.request_id != request_id {
            tracing::warn!(target: "snmp_messenger::messenger", { expected = request_id, actual = pdu.request_id, snmp.target = %target }, "discarding response with foreign request ID");
            return Ok(None);
        }
        Ok(Some(V3Reply::Response(pdu)))
    }

    fn report_error(&self, report: &Pdu) -> Box<Error> {
        let oid = report.variables.first().map(|v| v.id.clone());
        let message = oid.as_ref().map_or("unknown report", report_message);
        tracing::debug!(target: "snmp_messenger::messenger", { snmp.target = %self.peer_addr(), report = message }, "request rejected by report");
        Error::Report {
            target: self.peer_addr(),
            oid,
            message,
        }
        .boxed()
    }

    /// Privacy providers do not know the peer; fill it in.
    fn with_target(&self, err: Box<Error>) -> Box<Error> {
        match *err {
            Error::Decrypt { .. } => Error::Decrypt {
                target: self.peer_addr(),
            }
            .boxed(),
            other => other.boxed(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::SecurityLevel;
    use crate::security::engine::report_oids;
    use crate::transport::MockTransport;
    use crate::variable::Variable;
    use crate::{MessengerConfig, oid};

    fn report_message_bytes(
        msg_id: i32,
        oid: Option<crate::Oid>,
        params: UsmSecurityParams,
    ) -> Bytes {
        let pdu = Pdu {
            pdu_type: PduType::Report,
            request_id: 0,
            error_status: 0,
            error_index: 0,
            variables: oid.into_iter().map(Variable::null).collect(),
        };
        V3Message::new(
            MsgGlobalData::new(msg_id, 65507, MsgFlags::new(SecurityLevel::NoAuthNoPriv, false)),
            params.encode(),
            ScopedPdu::with_empty_context(pdu),
        )
        .encode()
    }

    /// Answers discovery probes with a Report naming `oid`.
    fn discovery_agent(oid: Option<crate::Oid>) -> MockTransport {
        MockTransport::with_responder("192.0.2.1:161".parse().unwrap(), move |req| {
            let msg = V3Message::decode(Bytes::copy_from_slice(req)).ok()?;
            let engine_id = Bytes::from_static(b"\x80\x00\x1f\x88\x04agent");
            let params = UsmSecurityParams::new(engine_id, 3, 1200, Bytes::new());
            Some(report_message_bytes(msg.msg_id(), oid.clone(), params))
        })
    }

    #[tokio::test]
    async fn discovery_learns_engine() {
        let transport = discovery_agent(Some(report_oids::unknown_engine_ids()));
        let messenger = Messenger::with_security(
            transport.clone(),
            MessengerConfig::v3(),
            UserSecurity::no_auth("public"),
        );

        let state = messenger.discover().await.unwrap();
        assert_eq!(&state.engine_id[..], b"\x80\x00\x1f\x88\x04agent");
        assert_eq!(state.engine_boots, 3);
        assert_eq!(messenger.engine_state().unwrap().engine_time, 1200);

        let probe = V3Message::decode(transport.requests()[0].data.clone()).unwrap();
        assert_eq!(probe.global_data.msg_max_size, 65507);
        assert!(probe.global_data.msg_flags.reportable);
        assert_eq!(probe.security_level(), SecurityLevel::NoAuthNoPriv);
        assert!(probe.pdu().unwrap().variables.is_empty());
    }

    #[tokio::test]
    async fn empty_discovery_report_accepted() {
        let messenger = Messenger::with_security(
            discovery_agent(None),
            MessengerConfig::v3(),
            UserSecurity::no_auth("public"),
        );
        assert!(messenger.discover().await.is_ok());
    }

    #[tokio::test]
    async fn other_discovery_report_fails() {
        let transport = discovery_agent(Some(report_oids::unsupported_sec_levels()));
        let messenger = Messenger::with_security(
            transport.clone(),
            MessengerConfig::v3(),
            UserSecurity::no_auth("public"),
        );

        let err = messenger.get(&[oid!(1, 3, 6, 1, 2, 1, 1, 1, 0)]).await.unwrap_err();
        match *err {
            Error::Report { oid, message, .. } => {
                assert_eq!(oid, Some(report_oids::unsupported_sec_levels()));
                assert_eq!(message, "unsupportedSecLevels");
            }
            other => panic!("unexpected error: {}", other),
        }
        assert_eq!(transport.requests().len(), 1);
        assert!(messenger.engine_state().is_none());
    }

    #[tokio::test]
    async fn v3_without_security_is_a_config_error() {
        let messenger = Messenger::new(
            MockTransport::new("192.0.2.1:161".parse().unwrap()),
            MessengerConfig::v3(),
        );
        let err = messenger.get(&[oid!(1, 3, 6, 1)]).await.unwrap_err();
        assert!(matches!(*err, Error::Config(_)));
    }

    #[test]
    fn decrypt_errors_get_the_peer() {
        let messenger = Messenger::new(
            MockTransport::new("192.0.2.1:161".parse().unwrap()),
            MessengerConfig::v3(),
        );
        let err = messenger.with_target(
            Error::Decrypt {
                target: crate::error::UNKNOWN_TARGET,
            }
            .boxed(),
        );
        assert!(matches!(*err, Error::Decrypt { target } if target == messenger.peer_addr()));
    }
}
