//! Community-based message format (v1/v2c).
//!
//! `SEQUENCE { version INTEGER, community OCTET STRING, pdu PDU }`; v1 and
//! v2c differ only in the version number.

use crate::ber::{Decoder, EncodeBuf};
use crate::error::{DecodeErrorKind, Error, Result};
use crate::pdu::Pdu;
use crate::version::Version;
use bytes::Bytes;

#[derive(Debug, Clone, PartialEq)]
pub struct CommunityMessage {
    /// V1 or V2c.
    pub version: Version,
    pub community: Bytes,
    pub pdu: Pdu,
}

impl CommunityMessage {
    /// Fails with [`Error::Config`] for [`Version::V3`].
    pub fn new(version: Version, community: impl Into<Bytes>, pdu: Pdu) -> Result<Self> {
        if version == Version::V3 {
            return Err(Error::Config("community messages are v1/v2c only".into()).boxed());
        }
        Ok(Self {
            version,
            community: community.into(),
            pdu,
        })
    }

    pub fn v1(community: impl Into<Bytes>, pdu: Pdu) -> Self {
        Self {
            version: Version::V1,
            community: community.into(),
            pdu,
        }
    }

    pub fn v2c(community: impl Into<Bytes>, pdu: Pdu) -> Self {
        Self {
            version: Version::V2c,
            community: community.into(),
            pdu,
        }
    }

    pub fn encode(&self) -> Bytes {
        let mut buf = EncodeBuf::new();
        buf.push_sequence(|buf| {
            self.pdu.encode(buf);
            buf.push_octet_string(&self.community);
            buf.push_integer(self.version.as_i32());
        });
        buf.finish()
    }

    pub fn decode(data: Bytes) -> Result<Self> {
        let mut decoder = Decoder::new(data);
        let mut seq = decoder.read_sequence()?;

        let at = seq.offset();
        let version_num = seq.read_integer()?;
        let version = match Version::from_i32(version_num) {
            Some(v @ (Version::V1 | Version::V2c)) => v,
            _ => return Err(Error::decode(at, DecodeErrorKind::UnknownVersion(version_num))),
        };

        let msg = Self::decode_from_sequence(&mut seq, version)?;
        seq.finish()?;
        Ok(msg)
    }

    /// Decode the fields after the version number.
    pub(crate) fn decode_from_sequence(seq: &mut Decoder, version: Version) -> Result<Self> {
        let community = seq.read_octet_string()?;
        let pdu = Pdu::decode(seq)?;
        Ok(CommunityMessage {
            version,
            community,
            pdu,
        })
    }

    pub fn into_pdu(self) -> Pdu {
        self.pdu
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oid;

    #[test]
    fn v2c_wire_form() {
        let pdu = Pdu::get_request(1, &[oid!(1, 3, 6, 1, 2, 1, 1, 1, 0)]);
        let encoded = CommunityMessage::v2c(b"public".as_slice(), pdu).encode();
        // SEQUENCE, version 1, "public", then the PDU
        assert_eq!(
            &encoded[..13],
            &[
                0x30, 0x26, 0x02, 0x01, 0x01, 0x04, 0x06, b'p', b'u', b'b', b'l', b'i', b'c'
            ]
        );
        assert_eq!(encoded[13], 0xA0);
    }

    #[test]
    fn version_preserved() {
        for version in [Version::V1, Version::V2c] {
            let pdu = Pdu::get_request(1, &[oid!(1, 3, 6, 1)]);
            let msg = CommunityMessage::new(version, b"test".as_slice(), pdu).unwrap();
            let decoded = CommunityMessage::decode(msg.encode()).unwrap();
            assert_eq!(decoded, msg);
        }
    }

    #[test]
    fn v3_rejected() {
        let pdu = Pdu::get_request(1, &[oid!(1, 3)]);
        assert!(CommunityMessage::new(Version::V3, b"x".as_slice(), pdu).is_err());
    }

    #[test]
    fn trailing_bytes_rejected() {
        let pdu = Pdu::get_request(1, &[oid!(1, 3)]);
        let mut raw = CommunityMessage::v1(b"p".as_slice(), pdu).encode().to_vec();
        // grow the outer SEQUENCE by one junk byte
        raw[1] += 1;
        raw.push(0x00);
        assert!(CommunityMessage::decode(Bytes::from(raw)).is_err());
    }
}
