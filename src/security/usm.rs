//! User-based Security Model parameters (RFC 3414).
//!
//! ```text
//! UsmSecurityParameters ::= SEQUENCE {
//!     msgAuthoritativeEngineID     OCTET STRING,
//!     msgAuthoritativeEngineBoots  INTEGER (0..2147483647),
//!     msgAuthoritativeEngineTime   INTEGER (0..2147483647),
//!     msgUserName                  OCTET STRING (SIZE(0..32)),
//!     msgAuthenticationParameters  OCTET STRING,
//!     msgPrivacyParameters         OCTET STRING
//! }
//! ```

use bytes::Bytes;

use crate::ber::{Decoder, EncodeBuf, tag};
use crate::error::{DecodeErrorKind, Error, Result};

/// USM security parameters.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UsmSecurityParams {
    pub engine_id: Bytes,
    pub engine_boots: u32,
    /// Seconds since the engine last booted.
    pub engine_time: u32,
    pub username: Bytes,
    /// HMAC-96 digest, or empty.
    pub auth_params: Bytes,
    /// Privacy salt, or empty.
    pub priv_params: Bytes,
}

impl UsmSecurityParams {
    /// Parameters with empty authentication and privacy fields.
    pub fn new(
        engine_id: impl Into<Bytes>,
        engine_boots: u32,
        engine_time: u32,
        username: impl Into<Bytes>,
    ) -> Self {
        Self {
            engine_id: engine_id.into(),
            engine_boots,
            engine_time,
            username: username.into(),
            auth_params: Bytes::new(),
            priv_params: Bytes::new(),
        }
    }

    /// All fields empty, as sent in a discovery probe.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Set privParameters (the DES salt).
    pub fn with_priv_params(mut self, priv_params: impl Into<Bytes>) -> Self {
        self.priv_params = priv_params.into();
        self
    }

    /// Zero-filled authParameters of `mac_len` bytes, replaced by the HMAC
    /// after the whole message is encoded.
    pub fn with_auth_placeholder(mut self, mac_len: usize) -> Self {
        self.auth_params = Bytes::from(vec![0u8; mac_len]);
        self
    }

    /// Encode as the USM `SEQUENCE` carried in msgSecurityParameters.
    pub fn encode(&self) -> Bytes {
        let mut buf = EncodeBuf::new();
        buf.push_sequence(|buf| {
            buf.push_octet_string(&self.priv_params);
            buf.push_octet_string(&self.auth_params);
            buf.push_octet_string(&self.username);
            buf.push_unsigned32(tag::universal::INTEGER, self.engine_time);
            buf.push_unsigned32(tag::universal::INTEGER, self.engine_boots);
            buf.push_octet_string(&self.engine_id);
        });
        buf.finish()
    }

    /// Decode the contents of msgSecurityParameters.
    pub fn decode(data: Bytes) -> Result<Self> {
        let mut decoder = Decoder::new(data);
        let mut seq = decoder.read_sequence()?;

        let engine_id = seq.read_octet_string()?;

        let at = seq.offset();
        let boots = seq.read_integer()?;
        let engine_boots = u32::try_from(boots)
            .map_err(|_| Error::decode(at, DecodeErrorKind::InvalidEngineBoots { value: boots }))?;

        let at = seq.offset();
        let time = seq.read_integer()?;
        let engine_time = u32::try_from(time)
            .map_err(|_| Error::decode(at, DecodeErrorKind::InvalidEngineTime { value: time }))?;

        let username = seq.read_octet_string()?;
        let auth_params = seq.read_octet_string()?;
        let priv_params = seq.read_octet_string()?;
        seq.finish()?;

        Ok(Self {
            engine_id,
            engine_boots,
            engine_time,
            username,
            auth_params,
            priv_params,
        })
    }

    /// Locate msgAuthenticationParameters inside an encoded v3 message.
    ///
    /// Returns `(start, len)` of the field's content octets.
    pub fn find_auth_params_offset(encoded_msg: &[u8]) -> Option<(usize, usize)> {
        let mut msg = Decoder::from_slice(encoded_msg);
        let mut outer = msg.read_sequence().ok()?;
        outer.skip_tlv().ok()?; // msgVersion
        outer.skip_tlv().ok()?; // msgGlobalData
        let mut params = outer.read_constructed(tag::universal::OCTET_STRING).ok()?;
        let mut usm = params.read_sequence().ok()?;
        for _ in 0..4 {
            // engineID, boots, time, userName
            usm.skip_tlv().ok()?;
        }
        let len = usm.expect_tag(tag::universal::OCTET_STRING).ok()?;
        let start = usm.offset();
        (start + len <= encoded_msg.len()).then_some((start, len))
    }
}
