//! SNMP Protocol Data Units.
//!
//! All PDUs handled here share the RFC 3416 layout:
//! `request-id, error-status, error-index, variable-bindings`. GETBULK reuses
//! the two error slots for non-repeaters and max-repetitions. The SNMPv1
//! Trap PDU has its own layout and is not decoded.

use crate::ber::{Decoder, EncodeBuf, tag};
use crate::error::{DecodeErrorKind, Error, ErrorStatus, Result};
use crate::oid::Oid;
use crate::value::SnmpType;
use crate::variable::{Variable, decode_variable_list, encode_variable_list};

/// PDU type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PduType {
    GetRequest = tag::pdu::GET_REQUEST,
    GetNextRequest = tag::pdu::GET_NEXT_REQUEST,
    Response = tag::pdu::RESPONSE,
    SetRequest = tag::pdu::SET_REQUEST,
    GetBulkRequest = tag::pdu::GET_BULK_REQUEST,
    InformRequest = tag::pdu::INFORM_REQUEST,
    TrapV2 = tag::pdu::TRAP_V2,
    Report = tag::pdu::REPORT,
}

impl PduType {
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            tag::pdu::GET_REQUEST => Some(Self::GetRequest),
            tag::pdu::GET_NEXT_REQUEST => Some(Self::GetNextRequest),
            tag::pdu::RESPONSE => Some(Self::Response),
            tag::pdu::SET_REQUEST => Some(Self::SetRequest),
            tag::pdu::GET_BULK_REQUEST => Some(Self::GetBulkRequest),
            tag::pdu::INFORM_REQUEST => Some(Self::InformRequest),
            tag::pdu::TRAP_V2 => Some(Self::TrapV2),
            tag::pdu::REPORT => Some(Self::Report),
            _ => None,
        }
    }

    pub fn tag(self) -> u8 {
        self as u8
    }

    pub fn snmp_type(self) -> SnmpType {
        match self {
            Self::GetRequest => SnmpType::GetRequestPdu,
            Self::GetNextRequest => SnmpType::GetNextRequestPdu,
            Self::Response => SnmpType::GetResponsePdu,
            Self::SetRequest => SnmpType::SetRequestPdu,
            Self::GetBulkRequest => SnmpType::GetBulkRequestPdu,
            Self::InformRequest => SnmpType::InformRequestPdu,
            Self::TrapV2 => SnmpType::TrapV2Pdu,
            Self::Report => SnmpType::ReportPdu,
        }
    }
}

impl std::fmt::Display for PduType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(self, f)
    }
}

/// A request, response or report PDU.
#[derive(Debug, Clone, PartialEq)]
pub struct Pdu {
    pub pdu_type: PduType,
    /// Correlates a response with its request.
    pub request_id: i32,
    /// Zero in requests. Non-repeaters for GETBULK.
    pub error_status: i32,
    /// 1-based index of the offending variable. Max-repetitions for GETBULK.
    pub error_index: i32,
    pub variables: Vec<Variable>,
}

impl Pdu {
    fn request(pdu_type: PduType, request_id: i32, oids: &[Oid]) -> Self {
        Self {
            pdu_type,
            request_id,
            error_status: 0,
            error_index: 0,
            variables: oids.iter().cloned().map(Variable::null).collect(),
        }
    }

    /// GetRequest with a NULL value for each OID.
    pub fn get_request(request_id: i32, oids: &[Oid]) -> Self {
        Self::request(PduType::GetRequest, request_id, oids)
    }

    pub fn get_next_request(request_id: i32, oids: &[Oid]) -> Self {
        Self::request(PduType::GetNextRequest, request_id, oids)
    }

    /// SetRequest carrying `variables` as given.
    pub fn set_request(request_id: i32, variables: Vec<Variable>) -> Self {
        Self {
            pdu_type: PduType::SetRequest,
            request_id,
            error_status: 0,
            error_index: 0,
            variables,
        }
    }

    pub fn get_bulk(
        request_id: i32,
        non_repeaters: i32,
        max_repetitions: i32,
        oids: &[Oid],
    ) -> Self {
        Self {
            pdu_type: PduType::GetBulkRequest,
            request_id,
            error_status: non_repeaters,
            error_index: max_repetitions,
            variables: oids.iter().cloned().map(Variable::null).collect(),
        }
    }

    pub fn snmp_type(&self) -> SnmpType {
        self.pdu_type.snmp_type()
    }

    /// Check every OID in the variable list before it goes on the wire.
    pub fn validate_oids(&self) -> Result<()> {
        self.variables.iter().try_for_each(Variable::validate_oids)
    }

    pub fn encode(&self, buf: &mut EncodeBuf) {
        buf.push_constructed(self.pdu_type.tag(), |buf| {
            encode_variable_list(buf, &self.variables);
            buf.push_integer(self.error_index);
            buf.push_integer(self.error_status);
            buf.push_integer(self.request_id);
        });
    }

    pub fn decode(decoder: &mut Decoder) -> Result<Self> {
        let at = decoder.offset();
        let tag = decoder.read_tag()?;
        let pdu_type = PduType::from_tag(tag)
            .ok_or_else(|| Error::decode(at, DecodeErrorKind::UnknownPduType(tag)))?;

        let len = decoder.read_length()?;
        let mut pdu = decoder.sub_decoder(len)?;

        let request_id = pdu.read_integer()?;
        let error_status = pdu.read_integer()?;
        let error_index = pdu.read_integer()?;
        let variables = decode_variable_list(&mut pdu)?;
        pdu.finish()?;

        Ok(Pdu {
            pdu_type,
            request_id,
            error_status,
            error_index,
            variables,
        })
    }

    pub fn is_error(&self) -> bool {
        self.error_status != 0
    }

    pub fn error_status_enum(&self) -> ErrorStatus {
        ErrorStatus::from_i32(self.error_status)
    }

    /// OID of the variable `error_index` points at, if it is in range.
    pub fn error_oid(&self) -> Option<&Oid> {
        let index = usize::try_from(self.error_index).ok()?.checked_sub(1)?;
        self.variables.get(index).map(|v| &v.id)
    }
}
