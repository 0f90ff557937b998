//! Authoritative engine state and Report PDU classification.

use std::time::Instant;

use bytes::Bytes;

use super::usm::UsmSecurityParams;
use crate::oid::Oid;
use crate::pdu::Pdu;

/// Largest engine time value (RFC 3414 Section 2.2.1).
pub const MAX_ENGINE_TIME: u32 = 2_147_483_647;

/// Statistics OIDs that agents put in Report PDUs.
pub mod report_oids {
    use crate::oid;
    use crate::oid::Oid;

    /// usmStatsUnsupportedSecLevels.0
    pub fn unsupported_sec_levels() -> Oid {
        oid!(1, 3, 6, 1, 6, 3, 15, 1, 1, 1, 0)
    }

    /// usmStatsNotInTimeWindows.0
    pub fn not_in_time_windows() -> Oid {
        oid!(1, 3, 6, 1, 6, 3, 15, 1, 1, 2, 0)
    }

    /// usmStatsUnknownUserNames.0
    pub fn unknown_user_names() -> Oid {
        oid!(1, 3, 6, 1, 6, 3, 15, 1, 1, 3, 0)
    }

    /// usmStatsUnknownEngineIDs.0
    pub fn unknown_engine_ids() -> Oid {
        oid!(1, 3, 6, 1, 6, 3, 15, 1, 1, 4, 0)
    }

    /// usmStatsWrongDigests.0
    pub fn wrong_digests() -> Oid {
        oid!(1, 3, 6, 1, 6, 3, 15, 1, 1, 5, 0)
    }

    /// usmStatsDecryptionErrors.0
    pub fn decryption_errors() -> Oid {
        oid!(1, 3, 6, 1, 6, 3, 15, 1, 1, 6, 0)
    }

    /// snmpUnknownSecurityModels.0
    pub fn unknown_security_models() -> Oid {
        oid!(1, 3, 6, 1, 6, 3, 11, 2, 1, 1, 0)
    }

    /// snmpInvalidMsgs.0
    pub fn invalid_msgs() -> Oid {
        oid!(1, 3, 6, 1, 6, 3, 11, 2, 1, 2, 0)
    }

    /// snmpUnknownPDUHandlers.0
    pub fn unknown_pdu_handlers() -> Oid {
        oid!(1, 3, 6, 1, 6, 3, 11, 2, 1, 3, 0)
    }
}

const USM_STATS: [u32; 9] = [1, 3, 6, 1, 6, 3, 15, 1, 1];
const MPD_STATS: [u32; 9] = [1, 3, 6, 1, 6, 3, 11, 2, 1];

/// Human readable text for a Report OID.
///
/// Anything outside the USM and MPD statistics tables is `"unknown report"`.
pub fn report_message(oid: &Oid) -> &'static str {
    let arcs = oid.arcs();
    if arcs.len() != 11 || arcs[10] != 0 {
        return "unknown report";
    }
    match (&arcs[..9], arcs[9]) {
        (prefix, 1) if prefix == USM_STATS => "unsupportedSecLevels",
        (prefix, 2) if prefix == USM_STATS => "notInTimeWindows",
        (prefix, 3) if prefix == USM_STATS => "unknownUserNames",
        (prefix, 4) if prefix == USM_STATS => "unknownEngineIDs",
        (prefix, 5) if prefix == USM_STATS => "wrongDigests",
        (prefix, 6) if prefix == USM_STATS => "decryptionErrors",
        (prefix, 1) if prefix == MPD_STATS => "unknownSecurityModels",
        (prefix, 2) if prefix == MPD_STATS => "invalidMsgs",
        (prefix, 3) if prefix == MPD_STATS => "unknownPDUHandlers",
        _ => "unknown report",
    }
}

fn first_oid_is(pdu: &Pdu, expected: &Oid) -> bool {
    pdu.variables.first().is_some_and(|v| &v.id == expected)
}

/// Report naming usmStatsUnknownEngineIDs, the normal discovery answer.
pub fn is_unknown_engine_id_report(pdu: &Pdu) -> bool {
    first_oid_is(pdu, &report_oids::unknown_engine_ids())
}

pub fn is_not_in_time_window_report(pdu: &Pdu) -> bool {
    first_oid_is(pdu, &report_oids::not_in_time_windows())
}

/// Whether a discovery Report carries usable engine parameters.
///
/// Empty reports and the unknownEngineIDs / notInTimeWindows counters are
/// accepted. Any other report means the agent refused the exchange.
pub fn is_discovery_report(pdu: &Pdu) -> bool {
    pdu.variables.is_empty()
        || is_unknown_engine_id_report(pdu)
        || is_not_in_time_window_report(pdu)
}

/// Discovered parameters of the authoritative (agent) engine.
#[derive(Debug, Clone)]
pub struct EngineState {
    pub engine_id: Bytes,
    pub engine_boots: u32,
    /// Engine time at `synced_at`.
    pub engine_time: u32,
    /// Local instant the engine time was learned.
    pub synced_at: Instant,
}

impl EngineState {
    pub fn new(engine_id: Bytes, engine_boots: u32, engine_time: u32) -> Self {
        Self {
            engine_id,
            engine_boots,
            engine_time,
            synced_at: Instant::now(),
        }
    }

    /// Build from the USM parameters of a Report or Response.
    pub fn from_security_params(params: &UsmSecurityParams) -> Self {
        Self::new(params.engine_id.clone(), params.engine_boots, params.engine_time)
    }

    /// Engine time now, extrapolated from the local clock and capped at
    /// [`MAX_ENGINE_TIME`].
    pub fn estimated_time(&self) -> u32 {
        let elapsed = u32::try_from(self.synced_at.elapsed().as_secs()).unwrap_or(u32::MAX);
        self.engine_time.saturating_add(elapsed).min(MAX_ENGINE_TIME)
    }

    /// Resynchronize from a notInTimeWindow Report.
    pub fn resync(&mut self, params: &UsmSecurityParams) {
        if !params.engine_id.is_empty() {
            self.engine_id = params.engine_id.clone();
        }
        self.engine_boots = params.engine_boots;
        self.engine_time = params.engine_time;
        self.synced_at = Instant::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oid;
    use crate::pdu::PduType;
    use crate::variable::Variable;

    fn report(oids: &[Oid]) -> Pdu {
        Pdu {
            pdu_type: PduType::Report,
            request_id: 0,
            error_status: 0,
            error_index: 0,
            variables: oids.iter().cloned().map(Variable::null).collect(),
        }
    }

    #[test]
    fn report_table() {
        let cases = [
            (report_oids::unsupported_sec_levels(), "unsupportedSecLevels"),
            (report_oids::not_in_time_windows(), "notInTimeWindows"),
            (report_oids::unknown_user_names(), "unknownUserNames"),
            (report_oids::unknown_engine_ids(), "unknownEngineIDs"),
            (report_oids::wrong_digests(), "wrongDigests"),
            (report_oids::decryption_errors(), "decryptionErrors"),
            (report_oids::unknown_security_models(), "unknownSecurityModels"),
            (report_oids::invalid_msgs(), "invalidMsgs"),
            (report_oids::unknown_pdu_handlers(), "unknownPDUHandlers"),
        ];
        for (oid, message) in cases {
            assert_eq!(report_message(&oid), message, "{}", oid);
        }
    }

    #[test]
    fn unknown_reports() {
        assert_eq!(report_message(&oid!(1, 3, 6, 1, 6, 3, 15, 1, 1, 7, 0)), "unknown report");
        assert_eq!(report_message(&oid!(1, 3, 6, 1, 6, 3, 15, 1, 1, 2)), "unknown report");
        assert_eq!(report_message(&oid!(1, 3, 6, 1, 6, 3, 11, 2, 1, 4, 0)), "unknown report");
        assert_eq!(report_message(&oid!(1, 3, 6, 1, 2, 1, 1, 1, 0)), "unknown report");
    }

    #[test]
    fn discovery_reports() {
        assert!(is_discovery_report(&report(&[])));
        assert!(is_discovery_report(&report(&[report_oids::unknown_engine_ids()])));
        assert!(is_discovery_report(&report(&[report_oids::not_in_time_windows()])));
        assert!(!is_discovery_report(&report(&[report_oids::unknown_user_names()])));
        assert!(is_not_in_time_window_report(&report(&[report_oids::not_in_time_windows()])));
        assert!(!is_not_in_time_window_report(&report(&[])));
    }

    #[test]
    fn state_from_usm_params() {
        let engine_id = Bytes::from_static(b"\x80\x00\x1f\x88\x04");
        let params = UsmSecurityParams::new(engine_id, 7, 1000, Bytes::new());
        let decoded = UsmSecurityParams::decode(params.encode()).unwrap();
        let state = EngineState::from_security_params(&decoded);
        assert_eq!(&state.engine_id[..], b"\x80\x00\x1f\x88\x04");
        assert_eq!(state.engine_boots, 7);
        assert!(state.estimated_time() >= 1000);
    }

    #[test]
    fn estimated_time_is_capped() {
        let state = EngineState::new(Bytes::new(), 1, MAX_ENGINE_TIME);
        assert_eq!(state.estimated_time(), MAX_ENGINE_TIME);
    }

    #[test]
    fn resync_keeps_engine_id_when_report_omits_it() {
        let mut state = EngineState::new(Bytes::from_static(b"engine"), 1, 10);
        state.resync(&UsmSecurityParams::new(Bytes::new(), 2, 500, Bytes::new()));
        assert_eq!(&state.engine_id[..], b"engine");
        assert_eq!(state.engine_boots, 2);
        assert_eq!(state.engine_time, 500);
    }
}
