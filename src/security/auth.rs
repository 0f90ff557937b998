//! Authentication providers (RFC 3414 Sections 6 and 7).
//!
//! A provider owns the user's authentication phrase. It derives keys
//! localized to an engine ID, memoizing them in a [`CryptoKeyCache`], and
//! computes or checks the HMAC-96 carried in msgAuthenticationParameters.

use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex, PoisonError};

use digest::{Digest, KeyInit, Mac};
use hmac::Hmac;
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use super::key_cache::CryptoKeyCache;
use super::usm::UsmSecurityParams;
use crate::error::{EncodeErrorKind, Error, Result};

/// Length of msgAuthenticationParameters for HMAC-MD5-96 and HMAC-SHA-96.
pub const AUTH_PARAMS_LEN: usize = 12;

/// Size of the password expansion in RFC 3414 A.2.
const EXPANSION_SIZE: usize = 1_048_576;

/// Authentication algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthProtocol {
    /// HMAC-MD5-96
    Md5,
    /// HMAC-SHA-96
    Sha1,
}

impl AuthProtocol {
    /// Digest size, which is also the localized key size.
    pub fn key_len(self) -> usize {
        match self {
            Self::Md5 => 16,
            Self::Sha1 => 20,
        }
    }
}

impl fmt::Display for AuthProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Md5 => f.write_str("MD5"),
            Self::Sha1 => f.write_str("SHA"),
        }
    }
}

impl FromStr for AuthProtocol {
    type Err = Box<Error>;

    /// `MD5`, `SHA` or `SHA1`, ignoring case.
    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "MD5" => Ok(Self::Md5),
            "SHA" | "SHA1" => Ok(Self::Sha1),
            _ => Err(Error::invalid_argument(
                "authentication",
                format!("unknown name '{}'", s),
            )),
        }
    }
}

/// Key derivation and message authentication for one user.
pub trait AuthenticationProvider: fmt::Debug + Send + Sync {
    /// `None` for the no-op provider.
    fn protocol(&self) -> Option<AuthProtocol>;

    /// RFC 3414 A.2: expand `secret` to 1 MiB, hash it, then localize to
    /// `engine_id` as `H(Ku || engine_id || Ku)`.
    fn password_to_key(&self, secret: &[u8], engine_id: &[u8]) -> Vec<u8>;

    /// HMAC over `message` with this user's key for `engine_id`, truncated
    /// to [`AUTH_PARAMS_LEN`] bytes.
    fn compute_hash(&self, message: &[u8], engine_id: &[u8]) -> Vec<u8>;

    /// Sign an encoded message in place.
    ///
    /// The authParameters field is zeroed, the HMAC computed over the whole
    /// message, and the result written into the field.
    fn authenticate(&self, message: &mut [u8], engine_id: &[u8]) -> Result<()> {
        if self.protocol().is_none() {
            return Ok(());
        }
        let (start, len) = UsmSecurityParams::find_auth_params_offset(message)
            .filter(|&(_, len)| len == AUTH_PARAMS_LEN)
            .ok_or_else(|| Error::encode(EncodeErrorKind::MissingAuthParams))?;
        let field = start..start + len;
        message[field.clone()].fill(0);
        let mac = self.compute_hash(message, engine_id);
        message[field].copy_from_slice(&mac);
        Ok(())
    }

    /// Check the HMAC of a received message.
    ///
    /// False when the field is missing, has the wrong size, or does not match.
    fn verify(&self, message: &[u8], engine_id: &[u8]) -> bool {
        if self.protocol().is_none() {
            return true;
        }
        let Some((start, len)) = UsmSecurityParams::find_auth_params_offset(message) else {
            return false;
        };
        if len != AUTH_PARAMS_LEN {
            return false;
        }
        let received = &message[start..start + len];
        let mut zeroed = message.to_vec();
        zeroed[start..start + len].fill(0);
        let computed = self.compute_hash(&zeroed, engine_id);
        computed.ct_eq(received).into()
    }
}

/// No authentication.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultAuthenticationProvider;

impl AuthenticationProvider for DefaultAuthenticationProvider {
    fn protocol(&self) -> Option<AuthProtocol> {
        None
    }

    fn password_to_key(&self, _secret: &[u8], _engine_id: &[u8]) -> Vec<u8> {
        Vec::new()
    }

    fn compute_hash(&self, _message: &[u8], _engine_id: &[u8]) -> Vec<u8> {
        Vec::new()
    }
}

/// The user's phrase and the keys derived from it.
struct KeyMaterial {
    phrase: Zeroizing<Vec<u8>>,
    cache: Mutex<CryptoKeyCache>,
}

impl KeyMaterial {
    fn new(phrase: &[u8]) -> Self {
        Self {
            phrase: Zeroizing::new(phrase.to_vec()),
            cache: Mutex::new(CryptoKeyCache::default()),
        }
    }

    fn localized_key<D: Digest>(&self, secret: &[u8], engine_id: &[u8]) -> Vec<u8> {
        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(key) = cache.try_get_cached_value(secret, engine_id) {
            return key.to_vec();
        }
        let key = localize::<D>(&master_key::<D>(secret), engine_id);
        // The lock is held since the miss, so the pair is still absent.
        if let Err(e) = cache.add_value_to_cache(secret, engine_id, &key) {
            tracing::debug!(target: "snmp_messenger::security", { error = %e }, "key cache insert failed");
        }
        key
    }
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("phrase", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

/// HMAC-MD5-96 (RFC 3414 Section 6).
#[derive(Debug)]
pub struct Md5AuthenticationProvider {
    keys: KeyMaterial,
}

impl Md5AuthenticationProvider {
    pub fn new(phrase: impl AsRef<[u8]>) -> Self {
        Self {
            keys: KeyMaterial::new(phrase.as_ref()),
        }
    }
}

impl AuthenticationProvider for Md5AuthenticationProvider {
    fn protocol(&self) -> Option<AuthProtocol> {
        Some(AuthProtocol::Md5)
    }

    fn password_to_key(&self, secret: &[u8], engine_id: &[u8]) -> Vec<u8> {
        self.keys.localized_key::<md5::Md5>(secret, engine_id)
    }

    fn compute_hash(&self, message: &[u8], engine_id: &[u8]) -> Vec<u8> {
        let key = Zeroizing::new(self.password_to_key(&self.keys.phrase, engine_id));
        hmac96::<Hmac<md5::Md5>>(&key, message)
    }
}

/// HMAC-SHA-96 (RFC 3414 Section 7).
#[derive(Debug)]
pub struct Sha1AuthenticationProvider {
    keys: KeyMaterial,
}

impl Sha1AuthenticationProvider {
    pub fn new(phrase: impl AsRef<[u8]>) -> Self {
        Self {
            keys: KeyMaterial::new(phrase.as_ref()),
        }
    }
}

impl AuthenticationProvider for Sha1AuthenticationProvider {
    fn protocol(&self) -> Option<AuthProtocol> {
        Some(AuthProtocol::Sha1)
    }

    fn password_to_key(&self, secret: &[u8], engine_id: &[u8]) -> Vec<u8> {
        self.keys.localized_key::<sha1::Sha1>(secret, engine_id)
    }

    fn compute_hash(&self, message: &[u8], engine_id: &[u8]) -> Vec<u8> {
        let key = Zeroizing::new(self.password_to_key(&self.keys.phrase, engine_id));
        hmac96::<Hmac<sha1::Sha1>>(&key, message)
    }
}

/// Build a provider by algorithm name (`MD5`, `SHA`, `SHA1`).
///
/// ```
/// use snmp_messenger::security::authentication_provider;
///
/// let auth = authentication_provider("sha", "maplesyrup").unwrap();
/// assert!(auth.protocol().is_some());
/// assert!(authentication_provider("SHA512", "maplesyrup").is_err());
/// ```
pub fn authentication_provider(
    name: &str,
    phrase: impl AsRef<[u8]>,
) -> Result<Arc<dyn AuthenticationProvider>> {
    Ok(match name.parse::<AuthProtocol>()? {
        AuthProtocol::Md5 => Arc::new(Md5AuthenticationProvider::new(phrase)),
        AuthProtocol::Sha1 => Arc::new(Sha1AuthenticationProvider::new(phrase)),
    })
}

/// Ku: hash of the password repeated to 1 MiB, fed in 64-byte chunks.
///
/// An empty password gives an all-zero key.
fn master_key<D: Digest>(password: &[u8]) -> Vec<u8> {
    if password.is_empty() {
        return vec![0u8; <D as Digest>::output_size()];
    }
    let mut hasher = D::new();
    let mut chunk = [0u8; 64];
    let mut index = 0;
    for _ in 0..EXPANSION_SIZE / chunk.len() {
        for byte in &mut chunk {
            *byte = password[index];
            index = (index + 1) % password.len();
        }
        hasher.update(chunk);
    }
    hasher.finalize().to_vec()
}

/// Kul = H(Ku || engine_id || Ku).
fn localize<D: Digest>(master: &[u8], engine_id: &[u8]) -> Vec<u8> {
    let mut hasher = D::new();
    hasher.update(master);
    hasher.update(engine_id);
    hasher.update(master);
    hasher.finalize().to_vec()
}

fn hmac96<M: Mac + KeyInit>(key: &[u8], data: &[u8]) -> Vec<u8> {
    // HMAC accepts keys of any length.
    let Ok(mut mac) = <M as KeyInit>::new_from_slice(key) else {
        return Vec::new();
    };
    mac.update(data);
    mac.finalize().into_bytes()[..AUTH_PARAMS_LEN].to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::hex;

    const ENGINE_ID: [u8; 12] = [0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 2];

    #[test]
    fn rfc3414_md5_key() {
        assert_eq!(
            hex::encode(&master_key::<md5::Md5>(b"maplesyrup")),
            "9faf3283884e92834ebc9847d8edd963"
        );
        let provider = Md5AuthenticationProvider::new("maplesyrup");
        assert_eq!(
            hex::encode(&provider.password_to_key(b"maplesyrup", &ENGINE_ID)),
            "526f5eed9fcce26f8964c2930787d82b"
        );
    }

    #[test]
    fn rfc3414_sha1_key() {
        assert_eq!(
            hex::encode(&master_key::<sha1::Sha1>(b"maplesyrup")),
            "9fb5cc0381497b3793528939ff788d5d79145211"
        );
        let provider = Sha1AuthenticationProvider::new("maplesyrup");
        assert_eq!(
            hex::encode(&provider.password_to_key(b"maplesyrup", &ENGINE_ID)),
            "6695febc9288e36282235fc7151f128497b38f3f"
        );
    }

    #[test]
    fn derived_keys_are_cached() {
        let provider = Sha1AuthenticationProvider::new("maplesyrup");
        let first = provider.password_to_key(b"maplesyrup", &ENGINE_ID);
        let cache = provider.keys.cache.lock().unwrap();
        assert_eq!(
            cache.try_get_cached_value(b"maplesyrup", &ENGINE_ID),
            Some(first.as_slice())
        );
    }

    #[test]
    fn concurrent_derivations_share_one_entry() {
        let provider = Md5AuthenticationProvider::new("maplesyrup");
        let keys: Vec<Vec<u8>> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..4)
                .map(|_| scope.spawn(|| provider.password_to_key(b"maplesyrup", &ENGINE_ID)))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        assert!(keys.windows(2).all(|pair| pair[0] == pair[1]));

        let cache = provider.keys.cache.lock().unwrap();
        assert_eq!(cache.len(), 1);
        assert_eq!(
            cache.try_get_cached_value(b"maplesyrup", &ENGINE_ID),
            Some(keys[0].as_slice())
        );
    }

    #[test]
    fn hash_is_twelve_bytes_and_engine_bound() {
        let provider = Md5AuthenticationProvider::new("authpass123");
        let a = provider.compute_hash(b"message", b"engine-a");
        let b = provider.compute_hash(b"message", b"engine-b");
        assert_eq!(a.len(), AUTH_PARAMS_LEN);
        assert_ne!(a, b);
        assert_eq!(a, provider.compute_hash(b"message", b"engine-a"));
    }

    #[test]
    fn names_parse_case_insensitively() {
        assert_eq!("md5".parse::<AuthProtocol>().unwrap(), AuthProtocol::Md5);
        assert_eq!("Sha".parse::<AuthProtocol>().unwrap(), AuthProtocol::Sha1);
        assert_eq!("SHA1".parse::<AuthProtocol>().unwrap(), AuthProtocol::Sha1);
        let err = "SHA256".parse::<AuthProtocol>().unwrap_err();
        assert!(matches!(
            *err,
            Error::InvalidArgument {
                argument: "authentication",
                ..
            }
        ));
    }

    #[test]
    fn default_provider_is_inert() {
        let provider = DefaultAuthenticationProvider;
        assert_eq!(provider.protocol(), None);
        assert!(provider.compute_hash(b"x", b"e").is_empty());
        let mut msg = vec![1, 2, 3];
        provider.authenticate(&mut msg, b"e").unwrap();
        assert_eq!(msg, [1, 2, 3]);
        assert!(provider.verify(&msg, b"e"));
    }

    #[test]
    fn phrase_not_in_debug_output() {
        let provider = Md5AuthenticationProvider::new("supersecret");
        assert!(!format!("{:?}", provider).contains("supersecret"));
    }
}
