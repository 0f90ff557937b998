//! # snmp-messenger
//!
//! Async SNMP engine: BER value model, SNMPv1/v2c/v3 messaging, USM
//! authentication and privacy with a localized-key cache, and subtree walks.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use snmp_messenger::{Messenger, MessengerConfig, oid};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> snmp_messenger::Result<()> {
//!     let config = MessengerConfig {
//!         timeout: Duration::from_secs(2),
//!         ..MessengerConfig::v2c("public")
//!     };
//!     let messenger = Messenger::connect("192.168.1.1:161".parse().unwrap(), config).await?;
//!
//!     for variable in messenger.get(&[oid!(1, 3, 6, 1, 2, 1, 1, 1, 0)]).await? {
//!         println!("{}", variable);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## SNMPv3 Example
//!
//! ```rust,no_run
//! use snmp_messenger::{Messenger, MessengerConfig, UserSecurity, oid};
//!
//! #[tokio::main]
//! async fn main() -> snmp_messenger::Result<()> {
//!     let security = UserSecurity::from_names(
//!         "admin",
//!         Some(("SHA", "authpass123")),
//!         Some(("DES", "privpass123")),
//!     )?;
//!     let messenger = Messenger::connect_v3(
//!         "192.168.1.1:161".parse().unwrap(),
//!         MessengerConfig::v3(),
//!         security,
//!     )
//!     .await?;
//!
//!     for variable in messenger.walk(&oid!(1, 3, 6, 1, 2, 1, 1)).await? {
//!         println!("{}", variable);
//!     }
//!     Ok(())
//! }
//! ```

pub mod ber;
pub mod error;
pub mod format;
pub mod message;
pub mod messenger;
pub mod oid;
pub mod pdu;
pub mod security;
pub mod transport;
pub mod value;
pub mod variable;
pub mod version;

#[cfg(feature = "cli")]
pub mod cli;

pub use error::{DecodeErrorKind, Error, ErrorStatus, Result};
pub use messenger::{Backoff, Messenger, MessengerConfig, Retry, WalkMode};
pub use oid::Oid;
pub use pdu::{Pdu, PduType};
pub use security::{CryptoKeyCache, UserSecurity};
pub use transport::{Transport, UdpTransport};
pub use value::{SnmpType, Value};
pub use variable::Variable;
pub use version::Version;
