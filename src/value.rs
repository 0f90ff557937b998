//! The BER value model.
//!
//! [`SnmpType`] names every tag the engine understands. [`Value`] is the sum
//! type over the data-carrying ones; PDUs live in [`crate::pdu`].

use crate::ber::{Decoder, EncodeBuf, tag};
use crate::error::{DecodeErrorKind, Error, Result};
use crate::format::hex;
use crate::oid::Oid;
use bytes::Bytes;
use std::fmt;

/// Deepest SEQUENCE nesting accepted by [`Value::decode`].
pub const MAX_NESTING: usize = 16;

/// Wire tag codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SnmpType {
    Integer32,
    OctetString,
    Null,
    ObjectIdentifier,
    Sequence,
    IpAddress,
    Counter32,
    Gauge32,
    TimeTicks,
    Opaque,
    Counter64,
    NoSuchObject,
    NoSuchInstance,
    EndOfMibView,
    GetRequestPdu,
    GetNextRequestPdu,
    GetResponsePdu,
    SetRequestPdu,
    TrapV1Pdu,
    GetBulkRequestPdu,
    InformRequestPdu,
    TrapV2Pdu,
    ReportPdu,
}

impl SnmpType {
    pub const fn tag(self) -> u8 {
        match self {
            Self::Integer32 => tag::universal::INTEGER,
            Self::OctetString => tag::universal::OCTET_STRING,
            Self::Null => tag::universal::NULL,
            Self::ObjectIdentifier => tag::universal::OBJECT_IDENTIFIER,
            Self::Sequence => tag::universal::SEQUENCE,
            Self::IpAddress => tag::application::IP_ADDRESS,
            Self::Counter32 => tag::application::COUNTER32,
            Self::Gauge32 => tag::application::GAUGE32,
            Self::TimeTicks => tag::application::TIMETICKS,
            Self::Opaque => tag::application::OPAQUE,
            Self::Counter64 => tag::application::COUNTER64,
            Self::NoSuchObject => tag::context::NO_SUCH_OBJECT,
            Self::NoSuchInstance => tag::context::NO_SUCH_INSTANCE,
            Self::EndOfMibView => tag::context::END_OF_MIB_VIEW,
            Self::GetRequestPdu => tag::pdu::GET_REQUEST,
            Self::GetNextRequestPdu => tag::pdu::GET_NEXT_REQUEST,
            Self::GetResponsePdu => tag::pdu::RESPONSE,
            Self::SetRequestPdu => tag::pdu::SET_REQUEST,
            Self::TrapV1Pdu => tag::pdu::TRAP_V1,
            Self::GetBulkRequestPdu => tag::pdu::GET_BULK_REQUEST,
            Self::InformRequestPdu => tag::pdu::INFORM_REQUEST,
            Self::TrapV2Pdu => tag::pdu::TRAP_V2,
            Self::ReportPdu => tag::pdu::REPORT,
        }
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        const ALL: [SnmpType; 23] = [
            SnmpType::Integer32,
            SnmpType::OctetString,
            SnmpType::Null,
            SnmpType::ObjectIdentifier,
            SnmpType::Sequence,
            SnmpType::IpAddress,
            SnmpType::Counter32,
            SnmpType::Gauge32,
            SnmpType::TimeTicks,
            SnmpType::Opaque,
            SnmpType::Counter64,
            SnmpType::NoSuchObject,
            SnmpType::NoSuchInstance,
            SnmpType::EndOfMibView,
            SnmpType::GetRequestPdu,
            SnmpType::GetNextRequestPdu,
            SnmpType::GetResponsePdu,
            SnmpType::SetRequestPdu,
            SnmpType::TrapV1Pdu,
            SnmpType::GetBulkRequestPdu,
            SnmpType::InformRequestPdu,
            SnmpType::TrapV2Pdu,
            SnmpType::ReportPdu,
        ];
        ALL.into_iter().find(|t| t.tag() == tag)
    }

    /// Whether this tag opens a PDU.
    pub const fn is_pdu(self) -> bool {
        self.tag() & 0xE0 == 0xA0
    }
}

impl fmt::Display for SnmpType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// An SNMP data value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// INTEGER / Integer32
    Integer(i32),
    OctetString(Bytes),
    Null,
    ObjectIdentifier(Oid),
    /// IpAddress, network byte order
    IpAddress([u8; 4]),
    Counter32(u32),
    /// Gauge32 / Unsigned32
    Gauge32(u32),
    /// Hundredths of a second
    TimeTicks(u32),
    Opaque(Bytes),
    /// SNMPv2c/v3 only
    Counter64(u64),
    NoSuchObject,
    NoSuchInstance,
    EndOfMibView,
    /// SEQUENCE of values, the shape of varbinds and varbind lists.
    Sequence(Vec<Value>),
}

impl Value {
    /// Check every OID this value carries with [`Oid::validate`].
    pub fn validate_oids(&self) -> Result<()> {
        match self {
            Value::ObjectIdentifier(oid) => oid.validate(),
            Value::Sequence(items) => items.iter().try_for_each(Value::validate_oids),
            _ => Ok(()),
        }
    }

    pub fn snmp_type(&self) -> SnmpType {
        match self {
            Value::Integer(_) => SnmpType::Integer32,
            Value::OctetString(_) => SnmpType::OctetString,
            Value::Null => SnmpType::Null,
            Value::ObjectIdentifier(_) => SnmpType::ObjectIdentifier,
            Value::IpAddress(_) => SnmpType::IpAddress,
            Value::Counter32(_) => SnmpType::Counter32,
            Value::Gauge32(_) => SnmpType::Gauge32,
            Value::TimeTicks(_) => SnmpType::TimeTicks,
            Value::Opaque(_) => SnmpType::Opaque,
            Value::Counter64(_) => SnmpType::Counter64,
            Value::NoSuchObject => SnmpType::NoSuchObject,
            Value::NoSuchInstance => SnmpType::NoSuchInstance,
            Value::EndOfMibView => SnmpType::EndOfMibView,
            Value::Sequence(_) => SnmpType::Sequence,
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Value::Integer(v) => Some(*v),
            _ => None,
        }
    }

    /// Any of the unsigned 32-bit types, or a non-negative Integer.
    pub fn as_u32(&self) -> Option<u32> {
        match self {
            Value::Counter32(v) | Value::Gauge32(v) | Value::TimeTicks(v) => Some(*v),
            Value::Integer(v) => u32::try_from(*v).ok(),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::Counter64(v) => Some(*v),
            other => other.as_u32().map(u64::from),
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::OctetString(data) | Value::Opaque(data) => Some(data),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::OctetString(data) => std::str::from_utf8(data).ok(),
            _ => None,
        }
    }

    pub fn as_oid(&self) -> Option<&Oid> {
        match self {
            Value::ObjectIdentifier(oid) => Some(oid),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[Value]> {
        match self {
            Value::Sequence(items) => Some(items),
            _ => None,
        }
    }

    /// noSuchObject, noSuchInstance or endOfMibView.
    pub fn is_exception(&self) -> bool {
        matches!(
            self,
            Value::NoSuchObject | Value::NoSuchInstance | Value::EndOfMibView
        )
    }

    /// Append the BER encoding (tag, length, payload).
    pub fn encode(&self, buf: &mut EncodeBuf) {
        match self {
            Value::Integer(v) => buf.push_integer(*v),
            Value::OctetString(data) => buf.push_octet_string(data),
            Value::Null => buf.push_null(),
            Value::ObjectIdentifier(oid) => buf.push_oid(oid),
            Value::IpAddress(addr) => buf.push_ip_address(*addr),
            Value::Counter32(v) => buf.push_unsigned32(tag::application::COUNTER32, *v),
            Value::Gauge32(v) => buf.push_unsigned32(tag::application::GAUGE32, *v),
            Value::TimeTicks(v) => buf.push_unsigned32(tag::application::TIMETICKS, *v),
            Value::Opaque(data) => buf.push_tagged_bytes(tag::application::OPAQUE, data),
            Value::Counter64(v) => buf.push_counter64(*v),
            Value::NoSuchObject | Value::NoSuchInstance | Value::EndOfMibView => {
                buf.push_tagged_bytes(self.snmp_type().tag(), &[])
            }
            Value::Sequence(items) => buf.push_sequence(|buf| {
                for item in items.iter().rev() {
                    item.encode(buf);
                }
            }),
        }
    }

    /// Decode one TLV.
    ///
    /// SEQUENCEs are decoded recursively. PDU tags and tags outside
    /// [`SnmpType`] are rejected.
    pub fn decode(decoder: &mut Decoder) -> Result<Self> {
        Self::decode_nested(decoder, 0)
    }

    fn decode_nested(decoder: &mut Decoder, depth: usize) -> Result<Self> {
        let at = decoder.offset();
        let raw_tag = decoder.read_tag()?;
        let len = decoder.read_length()?;

        let Some(snmp_type) = SnmpType::from_tag(raw_tag).filter(|t| !t.is_pdu()) else {
            let kind = if raw_tag == tag::universal::OCTET_STRING_CONSTRUCTED {
                DecodeErrorKind::ConstructedOctetString
            } else {
                DecodeErrorKind::UnknownTag(raw_tag)
            };
            return Err(Error::decode(at, kind));
        };

        let value = match snmp_type {
            SnmpType::Integer32 => Value::Integer(decoder.read_integer_value(len)?),
            SnmpType::OctetString => Value::OctetString(decoder.read_bytes(len)?),
            SnmpType::Null => {
                if len != 0 {
                    return Err(Error::decode(at, DecodeErrorKind::InvalidNull));
                }
                Value::Null
            }
            SnmpType::ObjectIdentifier => Value::ObjectIdentifier(decoder.read_oid_value(len)?),
            SnmpType::IpAddress => Value::IpAddress(decoder.read_ip_address_value(len)?),
            SnmpType::Counter32 => Value::Counter32(decoder.read_unsigned32_value(len)?),
            SnmpType::Gauge32 => Value::Gauge32(decoder.read_unsigned32_value(len)?),
            SnmpType::TimeTicks => Value::TimeTicks(decoder.read_unsigned32_value(len)?),
            SnmpType::Opaque => Value::Opaque(decoder.read_bytes(len)?),
            SnmpType::Counter64 => Value::Counter64(decoder.read_counter64_value(len)?),
            SnmpType::NoSuchObject | SnmpType::NoSuchInstance | SnmpType::EndOfMibView => {
                // Some agents put junk in exception values; skip it.
                decoder.read_bytes(len)?;
                match snmp_type {
                    SnmpType::NoSuchObject => Value::NoSuchObject,
                    SnmpType::NoSuchInstance => Value::NoSuchInstance,
                    _ => Value::EndOfMibView,
                }
            }
            SnmpType::Sequence => {
                if depth >= MAX_NESTING {
                    return Err(Error::decode(
                        at,
                        DecodeErrorKind::NestingTooDeep { max: MAX_NESTING },
                    ));
                }
                let mut inner = decoder.sub_decoder(len)?;
                let mut items = Vec::new();
                while !inner.is_empty() {
                    items.push(Self::decode_nested(&mut inner, depth + 1)?);
                }
                Value::Sequence(items)
            }
            _ => return Err(Error::decode(at, DecodeErrorKind::UnknownTag(raw_tag))),
        };
        Ok(value)
    }
}

/// The bytes as text, when they are UTF-8 without control characters other than whitespace.
fn printable(data: &[u8]) -> Option<&str> {
    let s = std::str::from_utf8(data).ok()?;
    s.chars()
        .all(|c| !c.is_control() || c.is_whitespace())
        .then_some(s)
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(v) => write!(f, "{}", v),
            Value::OctetString(data) => match printable(data) {
                Some(s) => f.write_str(s),
                None => write!(f, "0x{}", hex::Bytes(data)),
            },
            Value::Null => f.write_str("Null"),
            Value::ObjectIdentifier(oid) => write!(f, "{}", oid),
            Value::IpAddress([a, b, c, d]) => write!(f, "{}.{}.{}.{}", a, b, c, d),
            Value::Counter32(v) | Value::Gauge32(v) | Value::TimeTicks(v) => write!(f, "{}", v),
            Value::Opaque(data) => write!(f, "Opaque(0x{})", hex::Bytes(data)),
            Value::Counter64(v) => write!(f, "{}", v),
            Value::NoSuchObject => f.write_str("noSuchObject"),
            Value::NoSuchInstance => f.write_str("noSuchInstance"),
            Value::EndOfMibView => f.write_str("endOfMibView"),
            Value::Sequence(items) => {
                f.write_str("SEQUENCE {")?;
                for (i, item) in items.iter().enumerate() {
                    let sep = if i == 0 { " " } else { ", " };
                    write!(f, "{}{}", sep, item)?;
                }
                f.write_str(" }")
            }
        }
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(v)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::OctetString(Bytes::copy_from_slice(s.as_bytes()))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::OctetString(Bytes::from(s))
    }
}

impl From<&[u8]> for Value {
    fn from(data: &[u8]) -> Self {
        Value::OctetString(Bytes::copy_from_slice(data))
    }
}

impl From<Bytes> for Value {
    fn from(data: Bytes) -> Self {
        Value::OctetString(data)
    }
}

impl From<Oid> for Value {
    fn from(oid: Oid) -> Self {
        Value::ObjectIdentifier(oid)
    }
}

impl From<std::net::Ipv4Addr> for Value {
    fn from(addr: std::net::Ipv4Addr) -> Self {
        Value::IpAddress(addr.octets())
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::Counter64(v)
    }
}
