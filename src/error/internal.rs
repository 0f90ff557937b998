//! Diagnostic error kinds.
//!
//! [`DecodeErrorKind`] is public because it travels inside
//! [`Error::Decode`](super::Error::Decode). The other kinds are logged at
//! debug level and then collapsed into a coarser public variant.

/// Authentication error kinds (SNMPv3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AuthErrorKind {
    /// HMAC verification failed.
    HmacMismatch,
    /// Could not locate auth params in message.
    AuthParamsNotFound,
    /// Response lacked authentication while the session requires it.
    UnauthenticatedResponse,
}

impl std::fmt::Display for AuthErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::HmacMismatch => write!(f, "HMAC verification failed"),
            Self::AuthParamsNotFound => write!(f, "could not locate auth params in message"),
            Self::UnauthenticatedResponse => write!(f, "response is not authenticated"),
        }
    }
}

/// Privacy error kinds (encryption/decryption).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CryptoErrorKind {
    /// Ciphertext is not a whole number of cipher blocks.
    InvalidCiphertextLength { length: usize },
    /// privParameters has the wrong size for the cipher.
    InvalidPrivParamsLength { expected: usize, actual: usize },
    /// Localized privacy key is shorter than the cipher needs.
    KeyTooShort { length: usize },
    /// Block cipher rejected the input.
    CipherError,
    /// Response carried a plaintext scoped PDU while privacy is required.
    UnencryptedResponse,
}

impl std::fmt::Display for CryptoErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidCiphertextLength { length } => {
                write!(f, "ciphertext length {} is not a multiple of 8", length)
            }
            Self::InvalidPrivParamsLength { expected, actual } => {
                write!(f, "privParameters must be {} bytes, got {}", expected, actual)
            }
            Self::KeyTooShort { length } => write!(f, "privacy key too short: {} bytes", length),
            Self::CipherError => write!(f, "cipher operation failed"),
            Self::UnencryptedResponse => write!(f, "expected encrypted scoped PDU"),
        }
    }
}

/// Which part of a BER structure failed to decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum DecodeErrorKind {
    /// Expected a different tag.
    UnexpectedTag { expected: u8, actual: u8 },
    /// Tag byte does not name any SNMP type.
    UnknownTag(u8),
    /// Data truncated unexpectedly.
    TruncatedData,
    /// Invalid BER length encoding.
    InvalidLength,
    /// Indefinite length not supported.
    IndefiniteLength,
    /// Length field too long.
    LengthTooLong { octets: usize },
    /// Length exceeds maximum.
    LengthExceedsMax { length: usize, max: usize },
    /// TLV extends past the end of its container.
    TlvOverflow,
    /// Zero-length integer.
    ZeroLengthInteger,
    /// Integer has more content octets than its type allows.
    IntegerOverflow,
    /// Integer64 too long.
    Integer64TooLong { length: usize },
    /// NULL with non-zero length.
    InvalidNull,
    /// IP address content is not 4 bytes.
    InvalidIpAddressLength { length: usize },
    /// Constructed OCTET STRING not supported.
    ConstructedOctetString,
    /// OBJECT IDENTIFIER with no content.
    EmptyOid,
    /// A sub-identifier does not fit in 32 bits.
    OidArcOverflow,
    /// OID exceeds maximum arc count.
    OidTooLong { count: usize, max: usize },
    /// Varbind list element is not a SEQUENCE.
    WrongVarbindSectionType { tag: u8 },
    /// Varbind SEQUENCE does not hold exactly two elements.
    WrongVarbindLength { length: usize },
    /// First element of a varbind is not an OBJECT IDENTIFIER.
    WrongVarbindFirstType { tag: u8 },
    /// Unknown SNMP version.
    UnknownVersion(i32),
    /// Response version differs from the request's.
    VersionMismatch { expected: i32, actual: i32 },
    /// Unknown PDU type.
    UnknownPduType(u8),
    /// A PDU of another type was expected here.
    UnexpectedPduType { expected: u8, actual: u8 },
    /// Missing required PDU.
    MissingPdu,
    /// Invalid msgFlags (priv without auth).
    InvalidMsgFlags,
    /// Unknown security model.
    UnknownSecurityModel(i32),
    /// msgMaxSize below RFC 3412 minimum (484 octets).
    MsgMaxSizeTooSmall { value: i32, minimum: i32 },
    /// msgID outside RFC 3412 range.
    InvalidMsgId { value: i32 },
    /// msgAuthoritativeEngineBoots outside RFC 3414 range.
    InvalidEngineBoots { value: i32 },
    /// msgAuthoritativeEngineTime outside RFC 3414 range.
    InvalidEngineTime { value: i32 },
    /// Trailing bytes after a complete message.
    TrailingData { remaining: usize },
    /// SEQUENCE values nested deeper than the decoder allows.
    NestingTooDeep { max: usize },
}

impl std::fmt::Display for DecodeErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnexpectedTag { expected, actual } => {
                write!(f, "expected tag 0x{:02X}, got 0x{:02X}", expected, actual)
            }
            Self::UnknownTag(t) => write!(f, "unknown tag 0x{:02X}", t),
            Self::TruncatedData => write!(f, "unexpected end of data"),
            Self::InvalidLength => write!(f, "invalid length encoding"),
            Self::IndefiniteLength => write!(f, "indefinite length encoding not supported"),
            Self::LengthTooLong { octets } => {
                write!(f, "length encoding too long ({} octets)", octets)
            }
            Self::LengthExceedsMax { length, max } => {
                write!(f, "length {} exceeds maximum {}", length, max)
            }
            Self::TlvOverflow => write!(f, "TLV extends past end of data"),
            Self::ZeroLengthInteger => write!(f, "zero-length integer"),
            Self::IntegerOverflow => write!(f, "integer overflow"),
            Self::Integer64TooLong { length } => {
                write!(f, "integer64 too long: {} bytes", length)
            }
            Self::InvalidNull => write!(f, "NULL with non-zero length"),
            Self::InvalidIpAddressLength { length } => {
                write!(f, "IP address must be 4 bytes, got {}", length)
            }
            Self::ConstructedOctetString => {
                write!(f, "constructed OCTET STRING (0x24) not supported")
            }
            Self::EmptyOid => write!(f, "empty OBJECT IDENTIFIER"),
            Self::OidArcOverflow => write!(f, "OID sub-identifier exceeds 32 bits"),
            Self::OidTooLong { count, max } => {
                write!(f, "OID has {} arcs, exceeds maximum {}", count, max)
            }
            Self::WrongVarbindSectionType { tag } => {
                write!(f, "wrong varbind section data type (tag 0x{:02X})", tag)
            }
            Self::WrongVarbindLength { length } => {
                write!(f, "wrong varbind data length ({} elements)", length)
            }
            Self::WrongVarbindFirstType { tag } => {
                write!(f, "wrong varbind first data type (tag 0x{:02X})", tag)
            }
            Self::UnknownVersion(v) => write!(f, "unknown SNMP version: {}", v),
            Self::VersionMismatch { expected, actual } => {
                write!(f, "expected SNMP version {}, got {}", expected, actual)
            }
            Self::UnknownPduType(t) => write!(f, "unknown PDU type: 0x{:02X}", t),
            Self::UnexpectedPduType { expected, actual } => {
                write!(
                    f,
                    "expected PDU 0x{:02X}, got 0x{:02X}",
                    expected, actual
                )
            }
            Self::MissingPdu => write!(f, "missing PDU in message"),
            Self::InvalidMsgFlags => write!(f, "invalid msgFlags: privacy without authentication"),
            Self::UnknownSecurityModel(m) => write!(f, "unknown security model: {}", m),
            Self::MsgMaxSizeTooSmall { value, minimum } => {
                write!(f, "msgMaxSize {} below RFC 3412 minimum {}", value, minimum)
            }
            Self::InvalidMsgId { value } => {
                write!(f, "msgID {} outside RFC 3412 range 0..2147483647", value)
            }
            Self::InvalidEngineBoots { value } => {
                write!(f, "msgAuthoritativeEngineBoots {} is negative", value)
            }
            Self::InvalidEngineTime { value } => {
                write!(f, "msgAuthoritativeEngineTime {} is negative", value)
            }
            Self::TrailingData { remaining } => {
                write!(f, "{} trailing bytes after message", remaining)
            }
            Self::NestingTooDeep { max } => {
                write!(f, "SEQUENCE nesting exceeds {} levels", max)
            }
        }
    }
}

/// Encode-side error kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EncodeErrorKind {
    /// SNMPv3 requested without user security.
    NoSecurityConfig,
    /// Engine parameters unknown when building an authenticated message.
    EngineNotDiscovered,
    /// Could not locate auth params position in encoded message.
    MissingAuthParams,
}

impl std::fmt::Display for EncodeErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoSecurityConfig => write!(f, "SNMPv3 requires user security"),
            Self::EngineNotDiscovered => write!(f, "engine not discovered"),
            Self::MissingAuthParams => {
                write!(f, "could not find auth params position in encoded message")
            }
        }
    }
}
