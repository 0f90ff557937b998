//! SNMP message wrappers.
//!
//! - [`CommunityMessage`] - v1/v2c, `SEQUENCE { version, community, PDU }`
//! - [`V3Message`] - v3 with USM security parameters

mod community;
mod v3;

pub use community::CommunityMessage;
pub use v3::{
    MSG_MAX_SIZE, MsgFlags, MsgGlobalData, ScopedPdu, SecurityLevel, SecurityModel, V3Message,
    V3MessageData,
};

use crate::ber::Decoder;
use crate::error::{DecodeErrorKind, Error, Result};
use crate::pdu::Pdu;
use crate::version::Version;
use bytes::Bytes;

/// A decoded message of any version.
#[derive(Debug)]
pub enum Message {
    Community(CommunityMessage),
    V3(V3Message),
}

impl Message {
    /// The PDU, unless this is an encrypted v3 message.
    pub fn pdu(&self) -> Option<&Pdu> {
        match self {
            Message::Community(m) => Some(&m.pdu),
            Message::V3(m) => m.pdu(),
        }
    }

    pub fn into_pdu(self) -> Option<Pdu> {
        match self {
            Message::Community(m) => Some(m.pdu),
            Message::V3(m) => m.into_pdu(),
        }
    }

    pub fn version(&self) -> Version {
        match self {
            Message::Community(m) => m.version,
            Message::V3(_) => Version::V3,
        }
    }

    /// Decode a message, dispatching on its version field.
    pub fn decode(data: Bytes) -> Result<Self> {
        let mut decoder = Decoder::new(data);
        let mut seq = decoder.read_sequence()?;

        let at = seq.offset();
        let version_num = seq.read_integer()?;
        let version = Version::from_i32(version_num)
            .ok_or_else(|| Error::decode(at, DecodeErrorKind::UnknownVersion(version_num)))?;

        let message = match version {
            Version::V1 | Version::V2c => {
                Message::Community(CommunityMessage::decode_from_sequence(&mut seq, version)?)
            }
            Version::V3 => Message::V3(V3Message::decode_from_sequence(&mut seq)?),
        };
        seq.finish()?;
        Ok(message)
    }
}

impl From<CommunityMessage> for Message {
    fn from(msg: CommunityMessage) -> Self {
        Message::Community(msg)
    }
}

impl From<V3Message> for Message {
    fn from(msg: V3Message) -> Self {
        Message::V3(msg)
    }
}
