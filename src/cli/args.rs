//! Command-line argument structures for the `snmp-*` tools.

use clap::{Parser, ValueEnum};
use std::net::{SocketAddr, ToSocketAddrs};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::message::SecurityLevel;
use crate::messenger::{Messenger, MessengerConfig, WalkMode};
use crate::oid::Oid;
use crate::security::UserSecurity;
use crate::value::Value;
use crate::version::Version;

/// SNMP version for CLI argument parsing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum SnmpVersion {
    /// SNMPv1 (default)
    #[default]
    #[value(name = "1")]
    V1,
    /// SNMPv2c
    #[value(name = "2c", alias = "2")]
    V2c,
    /// SNMPv3
    #[value(name = "3")]
    V3,
}

impl From<SnmpVersion> for Version {
    fn from(v: SnmpVersion) -> Self {
        match v {
            SnmpVersion::V1 => Version::V1,
            SnmpVersion::V2c => Version::V2c,
            SnmpVersion::V3 => Version::V3,
        }
    }
}

/// USM security level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Level {
    #[value(name = "noAuthNoPriv")]
    NoAuthNoPriv,
    #[value(name = "authNoPriv")]
    AuthNoPriv,
    #[value(name = "authPriv")]
    AuthPriv,
}

impl From<Level> for SecurityLevel {
    fn from(level: Level) -> Self {
        match level {
            Level::NoAuthNoPriv => SecurityLevel::NoAuthNoPriv,
            Level::AuthNoPriv => SecurityLevel::AuthNoPriv,
            Level::AuthPriv => SecurityLevel::AuthPriv,
        }
    }
}

/// Arguments shared by every tool.
#[derive(Debug, Parser)]
pub struct CommonArgs {
    /// Agent host name or IP address.
    #[arg(value_name = "HOST")]
    pub host: String,

    /// SNMP version: 1, 2c, or 3.
    #[arg(short = 'v', long = "snmp-version", default_value = "1")]
    pub snmp_version: SnmpVersion,

    /// Community string (v1/v2c).
    #[arg(short = 'c', long = "community", default_value = "public")]
    pub community: String,

    /// Request timeout in milliseconds.
    #[arg(short = 't', long = "timeout")]
    pub timeout: Option<u64>,

    /// Agent UDP port.
    #[arg(short = 'p', long = "port", default_value_t = 161)]
    pub port: u16,
}

impl CommonArgs {
    /// Resolve the host and port.
    pub fn target_addr(&self) -> Result<SocketAddr> {
        (self.host.as_str(), self.port)
            .to_socket_addrs()
            .map_err(|e| {
                Error::Config(format!("invalid host '{}': {}", self.host, e).into()).boxed()
            })?
            .next()
            .ok_or_else(|| {
                Error::Config(format!("could not resolve host '{}'", self.host).into()).boxed()
            })
    }

    /// The `-t` value, or `default_ms` when absent.
    pub fn timeout_or(&self, default_ms: u64) -> Duration {
        Duration::from_millis(self.timeout.unwrap_or(default_ms))
    }

    /// Messenger configuration for these arguments.
    pub fn messenger_config(&self, default_timeout_ms: u64) -> MessengerConfig {
        MessengerConfig {
            version: self.snmp_version.into(),
            community: self.community.clone().into(),
            timeout: self.timeout_or(default_timeout_ms),
            ..MessengerConfig::default()
        }
    }
}

/// SNMPv3 security arguments.
#[derive(Debug, Parser)]
pub struct V3Args {
    /// Security level: noAuthNoPriv, authNoPriv, or authPriv.
    #[arg(short = 'l', long = "level", ignore_case = true)]
    pub level: Option<Level>,

    /// Security name.
    #[arg(short = 'u', long = "user")]
    pub user: Option<String>,

    /// Authentication protocol: MD5 or SHA.
    #[arg(short = 'a', long = "auth-protocol")]
    pub auth_protocol: Option<String>,

    /// Authentication passphrase.
    #[arg(short = 'A', long = "auth-phrase")]
    pub auth_phrase: Option<String>,

    /// Privacy protocol: DES.
    #[arg(short = 'x', long = "priv-protocol")]
    pub priv_protocol: Option<String>,

    /// Privacy passphrase.
    #[arg(short = 'X', long = "priv-phrase")]
    pub priv_phrase: Option<String>,
}

impl V3Args {
    /// The requested level, or the one implied by the protocols given.
    pub fn security_level(&self) -> SecurityLevel {
        match self.level {
            Some(level) => level.into(),
            None if self.priv_protocol.is_some() => SecurityLevel::AuthPriv,
            None if self.auth_protocol.is_some() => SecurityLevel::AuthNoPriv,
            None => SecurityLevel::NoAuthNoPriv,
        }
    }

    /// Build the USM user. Fails when the user name or a protocol/phrase
    /// pair required by the level is missing, or a protocol is unknown.
    pub fn user_security(&self) -> Result<UserSecurity> {
        let user = self
            .user
            .as_deref()
            .filter(|u| !u.is_empty())
            .ok_or_else(|| {
                Error::invalid_argument("user", "user name needs to be specified for v3")
            })?;
        let level = self.security_level();

        let auth = if level.requires_auth() {
            Some(pair("authentication", &self.auth_protocol, &self.auth_phrase)?)
        } else {
            None
        };
        let privacy = if level.requires_priv() {
            Some(pair("privacy", &self.priv_protocol, &self.priv_phrase)?)
        } else {
            None
        };

        UserSecurity::from_names(user.to_owned(), auth, privacy)
    }
}

fn pair<'a>(
    argument: &'static str,
    protocol: &'a Option<String>,
    phrase: &'a Option<String>,
) -> Result<(&'a str, &'a str)> {
    match (protocol.as_deref(), phrase.as_deref()) {
        (Some(protocol), Some(phrase)) => Ok((protocol, phrase)),
        (None, _) => Err(Error::invalid_argument(
            argument,
            "protocol required by security level",
        )),
        (Some(_), None) => Err(Error::invalid_argument(
            argument,
            "phrase required by security level",
        )),
    }
}

/// Logging arguments.
#[derive(Debug, Parser)]
pub struct OutputArgs {
    /// Log requests and replies (snmp_messenger=debug).
    #[arg(long = "verbose")]
    pub verbose: bool,
}

impl OutputArgs {
    /// Install the tracing subscriber. `RUST_LOG` wins over `--verbose`.
    pub fn init_tracing(&self) {
        use tracing_subscriber::EnvFilter;

        let fallback = if self.verbose {
            "snmp_messenger=debug"
        } else {
            "snmp_messenger=warn"
        };
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init();
    }
}

/// Walk stop rule for CLI argument parsing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum WalkModeArg {
    /// Stop when leaving the root's subtree (default).
    #[default]
    WithinSubtree,
    /// Continue until the end of the MIB view.
    Default,
}

impl From<WalkModeArg> for WalkMode {
    fn from(mode: WalkModeArg) -> Self {
        match mode {
            WalkModeArg::WithinSubtree => WalkMode::WithinSubtree,
            WalkModeArg::Default => WalkMode::Default,
        }
    }
}

/// Open a messenger for the parsed arguments. v3 users are built before
/// any socket is opened.
pub async fn connect(
    common: &CommonArgs,
    v3: &V3Args,
    config: MessengerConfig,
) -> Result<Messenger> {
    let security = if config.version == Version::V3 {
        Some(v3.user_security()?)
    } else {
        None
    };
    let target = common.target_addr()?;
    match security {
        Some(security) => Messenger::connect_v3(target, config, security).await,
        None => Messenger::connect(target, config).await,
    }
}

/// Parse OID arguments.
pub fn parse_oids(args: &[String]) -> Result<Vec<Oid>> {
    args.iter().map(|s| Oid::parse(s)).collect()
}

/// SET type specifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ValueType {
    /// INTEGER (i32)
    #[value(name = "i")]
    Integer,
    /// Unsigned32/Gauge32 (u32)
    #[value(name = "u")]
    Unsigned,
    /// STRING (OctetString from UTF-8)
    #[value(name = "s")]
    String,
    /// Hex-STRING (OctetString from hex)
    #[value(name = "x")]
    HexString,
    /// OBJECT IDENTIFIER
    #[value(name = "o")]
    Oid,
    /// IpAddress
    #[value(name = "a")]
    IpAddress,
    /// TimeTicks
    #[value(name = "t")]
    TimeTicks,
    /// Counter32
    #[value(name = "c")]
    Counter32,
    /// Counter64
    #[value(name = "C")]
    Counter64,
}

impl ValueType {
    /// Parse `s` as a value of this type.
    pub fn parse_value(self, s: &str) -> Result<Value> {
        let invalid =
            |what: &str| Error::invalid_argument("value", format!("invalid {}: {}", what, s));

        Ok(match self {
            ValueType::Integer => Value::Integer(s.parse().map_err(|_| invalid("integer"))?),
            ValueType::Unsigned => Value::Gauge32(s.parse().map_err(|_| invalid("unsigned"))?),
            ValueType::String => Value::from(s),
            ValueType::HexString => Value::from(
                crate::format::hex::decode(s)
                    .ok_or_else(|| invalid("hex string"))?
                    .as_slice(),
            ),
            ValueType::Oid => Value::ObjectIdentifier(Oid::parse(s)?),
            ValueType::IpAddress => Value::from(
                s.parse::<std::net::Ipv4Addr>()
                    .map_err(|_| invalid("IP address"))?,
            ),
            ValueType::TimeTicks => Value::TimeTicks(s.parse().map_err(|_| invalid("timeticks"))?),
            ValueType::Counter32 => Value::Counter32(s.parse().map_err(|_| invalid("counter32"))?),
            ValueType::Counter64 => Value::Counter64(s.parse().map_err(|_| invalid("counter64"))?),
        })
    }
}
