//! Error types for snmp-messenger.
//!
//! - [`Error`] - the single public error type
//! - [`ErrorStatus`] - SNMP protocol error codes carried in response PDUs (RFC 3416)
//! - [`DecodeErrorKind`] - which part of a BER structure failed to decode
//!
//! Errors are boxed: `Result<T> = Result<T, Box<Error>>`.
//!
//! ```rust
//! use snmp_messenger::{Error, Result};
//!
//! fn describe(result: Result<()>) {
//!     match result {
//!         Ok(()) => println!("ok"),
//!         Err(e) => match &*e {
//!             Error::Timeout { target, .. } => println!("{} did not answer", target),
//!             Error::Report { message, .. } => println!("handshake failed: {}", message),
//!             _ => println!("error: {}", e),
//!         },
//!     }
//! }
//! ```

pub(crate) mod internal;

pub use internal::DecodeErrorKind;
pub(crate) use internal::{AuthErrorKind, CryptoErrorKind, EncodeErrorKind};

use std::net::SocketAddr;
use std::time::Duration;

use crate::oid::Oid;
use crate::pdu::Pdu;

/// Placeholder target used when the peer is not known at the failure site.
pub(crate) const UNKNOWN_TARGET: SocketAddr =
    SocketAddr::new(std::net::IpAddr::V4(std::net::Ipv4Addr::new(0, 0, 0, 0)), 0);

/// Result type alias using the library's boxed Error type.
pub type Result<T> = std::result::Result<T, Box<Error>>;

/// The error type for all snmp-messenger operations.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Socket failure while talking to the agent.
    #[error("network error communicating with {target}: {source}")]
    Network {
        target: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// No response arrived within the configured timeout.
    #[error("timeout after {elapsed:?} waiting for {target} ({retries} retries)")]
    Timeout {
        target: SocketAddr,
        elapsed: Duration,
        retries: u32,
    },

    /// The agent answered with a non-zero error status.
    ///
    /// `oid` is the variable the error index points at, when the index is
    /// in range. `response` is the full reply.
    #[error("SNMP error from {target}: {status} at index {index}")]
    Snmp {
        target: SocketAddr,
        status: ErrorStatus,
        index: u32,
        oid: Option<Oid>,
        response: Box<Pdu>,
    },

    /// SNMPv3 handshake rejected by a Report PDU.
    ///
    /// `oid` is the first variable of the report; `None` for an empty report.
    #[error("report from {target}: {message}")]
    Report {
        target: SocketAddr,
        oid: Option<Oid>,
        message: &'static str,
    },

    /// Message authentication failed.
    #[error("authentication failed for {target}")]
    Auth { target: SocketAddr },

    /// Encryption or decryption of the scoped PDU failed.
    #[error("privacy processing failed for {target}")]
    Decrypt { target: SocketAddr },

    /// Malformed BER input.
    #[error("decode error at offset {offset}: {kind}")]
    Decode {
        offset: usize,
        kind: DecodeErrorKind,
    },

    /// An argument was rejected before any network activity, such as an
    /// unknown algorithm name.
    #[error("invalid argument '{argument}': {message}")]
    InvalidArgument {
        argument: &'static str,
        message: Box<str>,
    },

    /// Key was already present in a bounded cache.
    #[error("cache already contains this key")]
    CacheConflict,

    /// Invalid OID format.
    #[error("invalid OID: {0}")]
    InvalidOid(Box<str>),

    /// Invalid configuration or unsupported operation for the configured version.
    #[error("configuration error: {0}")]
    Config(Box<str>),
}

impl Error {
    /// Box this error.
    pub fn boxed(self) -> Box<Self> {
        Box::new(self)
    }

    pub(crate) fn decode(offset: usize, kind: DecodeErrorKind) -> Box<Self> {
        tracing::debug!(target: "snmp_messenger::ber", { snmp.offset = offset, kind = %kind }, "decode error");
        Error::Decode { offset, kind }.boxed()
    }

    pub(crate) fn auth(target: SocketAddr, kind: AuthErrorKind) -> Box<Self> {
        tracing::debug!(target: "snmp_messenger::security", { snmp.target = %target, kind = %kind }, "authentication error");
        Error::Auth { target }.boxed()
    }

    pub(crate) fn decrypt(target: SocketAddr, kind: CryptoErrorKind) -> Box<Self> {
        tracing::debug!(target: "snmp_messenger::security", { snmp.target = %target, kind = %kind }, "privacy error");
        Error::Decrypt { target }.boxed()
    }

    pub(crate) fn encode(kind: EncodeErrorKind) -> Box<Self> {
        tracing::debug!(target: "snmp_messenger::messenger", { kind = %kind }, "encode error");
        Error::Config(kind.to_string().into()).boxed()
    }

    pub(crate) fn invalid_argument(
        argument: &'static str,
        message: impl Into<Box<str>>,
    ) -> Box<Self> {
        Error::InvalidArgument {
            argument,
            message: message.into(),
        }
        .boxed()
    }
}

/// SNMP protocol error status codes (RFC 3416).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorStatus {
    NoError,
    TooBig,
    /// SNMPv1 only; v2c and later use exception values instead.
    NoSuchName,
    BadValue,
    ReadOnly,
    GenErr,
    NoAccess,
    WrongType,
    WrongLength,
    WrongEncoding,
    WrongValue,
    NoCreation,
    InconsistentValue,
    ResourceUnavailable,
    CommitFailed,
    UndoFailed,
    AuthorizationError,
    NotWritable,
    InconsistentName,
    Unknown(i32),
}

impl ErrorStatus {
    /// Create from the raw status code.
    pub fn from_i32(value: i32) -> Self {
        match value {
            0 => Self::NoError,
            1 => Self::TooBig,
            2 => Self::NoSuchName,
            3 => Self::BadValue,
            4 => Self::ReadOnly,
            5 => Self::GenErr,
            6 => Self::NoAccess,
            7 => Self::WrongType,
            8 => Self::WrongLength,
            9 => Self::WrongEncoding,
            10 => Self::WrongValue,
            11 => Self::NoCreation,
            12 => Self::InconsistentValue,
            13 => Self::ResourceUnavailable,
            14 => Self::CommitFailed,
            15 => Self::UndoFailed,
            16 => Self::AuthorizationError,
            17 => Self::NotWritable,
            18 => Self::InconsistentName,
            other => {
                tracing::warn!(target: "snmp_messenger::error", { snmp.error_status = other }, "unknown SNMP error status");
                Self::Unknown(other)
            }
        }
    }

    /// The raw status code.
    pub fn as_i32(&self) -> i32 {
        match self {
            Self::NoError => 0,
            Self::TooBig => 1,
            Self::NoSuchName => 2,
            Self::BadValue => 3,
            Self::ReadOnly => 4,
            Self::GenErr => 5,
            Self::NoAccess => 6,
            Self::WrongType => 7,
            Self::WrongLength => 8,
            Self::WrongEncoding => 9,
            Self::WrongValue => 10,
            Self::NoCreation => 11,
            Self::InconsistentValue => 12,
            Self::ResourceUnavailable => 13,
            Self::CommitFailed => 14,
            Self::UndoFailed => 15,
            Self::AuthorizationError => 16,
            Self::NotWritable => 17,
            Self::InconsistentName => 18,
            Self::Unknown(code) => *code,
        }
    }
}

impl std::fmt::Display for ErrorStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::NoError => "noError",
            Self::TooBig => "tooBig",
            Self::NoSuchName => "noSuchName",
            Self::BadValue => "badValue",
            Self::ReadOnly => "readOnly",
            Self::GenErr => "genErr",
            Self::NoAccess => "noAccess",
            Self::WrongType => "wrongType",
            Self::WrongLength => "wrongLength",
            Self::WrongEncoding => "wrongEncoding",
            Self::WrongValue => "wrongValue",
            Self::NoCreation => "noCreation",
            Self::InconsistentValue => "inconsistentValue",
            Self::ResourceUnavailable => "resourceUnavailable",
            Self::CommitFailed => "commitFailed",
            Self::UndoFailed => "undoFailed",
            Self::AuthorizationError => "authorizationError",
            Self::NotWritable => "notWritable",
            Self::InconsistentName => "inconsistentName",
            Self::Unknown(code) => return write!(f, "unknown({})", code),
        };
        f.write_str(name)
    }
}
