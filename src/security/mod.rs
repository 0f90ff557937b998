//! SNMPv3 User-based Security Model.
//!
//! - [`BoundedCache`] and [`CryptoKeyCache`] memoize localized keys
//! - [`AuthenticationProvider`] signs and verifies messages (HMAC-MD5-96, HMAC-SHA-96)
//! - [`PrivacyProvider`] encrypts scoped PDUs (CBC-DES) and owns the user's
//!   authentication provider
//! - [`UsmSecurityParams`] is the msgSecurityParameters wire form
//! - [`EngineState`] and the report helpers drive discovery and time sync

pub mod auth;
mod cache;
pub mod engine;
mod key_cache;
pub mod privacy;
mod usm;

use std::sync::Arc;

use bytes::Bytes;

pub use auth::{
    AUTH_PARAMS_LEN, AuthProtocol, AuthenticationProvider, DefaultAuthenticationProvider,
    Md5AuthenticationProvider, Sha1AuthenticationProvider, authentication_provider,
};
pub use cache::BoundedCache;
pub use engine::{EngineState, report_message};
pub use key_cache::{CryptoKeyCache, DEFAULT_CAPACITY, canonical_key};
pub use privacy::{
    DefaultPrivacyProvider, DesPrivacyProvider, PrivProtocol, PrivacyProvider, privacy_provider,
};
pub use usm::UsmSecurityParams;

use crate::error::Result;
use crate::message::SecurityLevel;

/// SNMPv3 credentials of one user.
///
/// The privacy provider owns the authentication provider, so this pair is
/// the whole security configuration of a session.
#[derive(Debug, Clone)]
pub struct UserSecurity {
    pub user: Bytes,
    pub privacy: Arc<dyn PrivacyProvider>,
}

impl UserSecurity {
    pub fn new(user: impl Into<Bytes>, privacy: Arc<dyn PrivacyProvider>) -> Self {
        Self {
            user: user.into(),
            privacy,
        }
    }

    /// noAuthNoPriv user.
    pub fn no_auth(user: impl Into<Bytes>) -> Self {
        let auth: Arc<dyn AuthenticationProvider> = Arc::new(DefaultAuthenticationProvider);
        Self::new(user, Arc::new(DefaultPrivacyProvider::new(auth)))
    }

    /// Build from algorithm names and phrases.
    ///
    /// `auth` and `privacy` are `(algorithm, phrase)` pairs. Names are
    /// parsed before anything else happens, so an unknown algorithm fails
    /// with [`Error::InvalidArgument`](crate::Error::InvalidArgument).
    ///
    /// ```
    /// use snmp_messenger::security::UserSecurity;
    /// use snmp_messenger::message::SecurityLevel;
    ///
    /// let user = UserSecurity::from_names(
    ///     "admin",
    ///     Some(("SHA", "authpass123")),
    ///     Some(("DES", "privpass123")),
    /// )
    /// .unwrap();
    /// assert_eq!(user.security_level(), SecurityLevel::AuthPriv);
    /// ```
    pub fn from_names(
        user: impl Into<Bytes>,
        auth: Option<(&str, &str)>,
        privacy: Option<(&str, &str)>,
    ) -> Result<Self> {
        let auth_provider: Arc<dyn AuthenticationProvider> = match auth {
            Some((name, phrase)) => authentication_provider(name, phrase)?,
            None => Arc::new(DefaultAuthenticationProvider),
        };
        let privacy_provider: Arc<dyn PrivacyProvider> = match privacy {
            Some((name, phrase)) => privacy_provider(name, phrase, auth_provider)?,
            None => Arc::new(DefaultPrivacyProvider::new(auth_provider)),
        };
        Ok(Self::new(user, privacy_provider))
    }

    pub fn auth(&self) -> &Arc<dyn AuthenticationProvider> {
        self.privacy.auth()
    }

    pub fn security_level(&self) -> SecurityLevel {
        self.privacy.security_level()
    }
}
