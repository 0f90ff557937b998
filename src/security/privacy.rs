//! Privacy providers (RFC 3414 Section 8).
//!
//! DES-CBC uses the first 8 bytes of the localized privacy key as the DES
//! key and the next 8 as the pre-IV. The salt sent as privParameters is
//! engineBoots followed by a per-provider counter; the IV is pre-IV XOR salt.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use cbc::cipher::block_padding::NoPadding;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use zeroize::Zeroizing;

use super::auth::AuthenticationProvider;
use crate::error::{CryptoErrorKind, Error, Result, UNKNOWN_TARGET};
use crate::message::SecurityLevel;

const DES_BLOCK: usize = 8;

/// Privacy algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrivProtocol {
    /// CBC-DES (RFC 3414 Section 8)
    Des,
}

impl fmt::Display for PrivProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Des => f.write_str("DES"),
        }
    }
}

impl FromStr for PrivProtocol {
    type Err = Box<Error>;

    fn from_str(s: &str) -> Result<Self> {
        if s.eq_ignore_ascii_case("DES") {
            Ok(Self::Des)
        } else {
            Err(Error::invalid_argument(
                "privacy",
                format!("unknown name '{}'", s),
            ))
        }
    }
}

/// Scoped PDU encryption for one user.
///
/// A privacy provider wraps the user's authentication provider, so one
/// `Arc<dyn PrivacyProvider>` carries the whole security configuration.
pub trait PrivacyProvider: fmt::Debug + Send + Sync {
    /// `None` when scoped PDUs travel in clear text.
    fn protocol(&self) -> Option<PrivProtocol>;

    fn auth(&self) -> &Arc<dyn AuthenticationProvider>;

    /// Encrypt an encoded scoped PDU. Returns the ciphertext and the
    /// privParameters to send with it.
    fn encrypt(
        &self,
        scoped_pdu: &[u8],
        engine_id: &[u8],
        engine_boots: u32,
        engine_time: u32,
    ) -> Result<(Vec<u8>, Vec<u8>)>;

    /// Inverse of [`encrypt`](Self::encrypt). The plaintext may carry
    /// trailing padding.
    fn decrypt(&self, ciphertext: &[u8], engine_id: &[u8], priv_params: &[u8]) -> Result<Vec<u8>>;

    /// Level implied by the configured algorithms.
    fn security_level(&self) -> SecurityLevel {
        match (self.auth().protocol(), self.protocol()) {
            (None, _) => SecurityLevel::NoAuthNoPriv,
            (Some(_), None) => SecurityLevel::AuthNoPriv,
            (Some(_), Some(_)) => SecurityLevel::AuthPriv,
        }
    }
}

/// No privacy: data passes through unchanged.
#[derive(Debug, Clone)]
pub struct DefaultPrivacyProvider {
    auth: Arc<dyn AuthenticationProvider>,
}

impl DefaultPrivacyProvider {
    pub fn new(auth: Arc<dyn AuthenticationProvider>) -> Self {
        Self { auth }
    }
}

impl PrivacyProvider for DefaultPrivacyProvider {
    fn protocol(&self) -> Option<PrivProtocol> {
        None
    }

    fn auth(&self) -> &Arc<dyn AuthenticationProvider> {
        &self.auth
    }

    fn encrypt(
        &self,
        scoped_pdu: &[u8],
        _engine_id: &[u8],
        _engine_boots: u32,
        _engine_time: u32,
    ) -> Result<(Vec<u8>, Vec<u8>)> {
        Ok((scoped_pdu.to_vec(), Vec::new()))
    }

    fn decrypt(
        &self,
        ciphertext: &[u8],
        _engine_id: &[u8],
        _priv_params: &[u8],
    ) -> Result<Vec<u8>> {
        Ok(ciphertext.to_vec())
    }
}

/// CBC-DES symmetric encryption (RFC 3414 Section 8).
pub struct DesPrivacyProvider {
    phrase: Zeroizing<Vec<u8>>,
    auth: Arc<dyn AuthenticationProvider>,
    salt: AtomicU32,
}

impl DesPrivacyProvider {
    /// Fails with [`Error::InvalidArgument`] when `auth` performs no
    /// authentication: privacy keys are derived with the auth hash.
    pub fn new(phrase: impl AsRef<[u8]>, auth: Arc<dyn AuthenticationProvider>) -> Result<Self> {
        if auth.protocol().is_none() {
            return Err(Error::invalid_argument(
                "authentication",
                "DES privacy requires an authentication algorithm",
            ));
        }
        let mut seed = [0u8; 4];
        // Salts stay unique per provider whatever the seed.
        if let Err(e) = getrandom::fill(&mut seed) {
            tracing::warn!(target: "snmp_messenger::security", { error = %e }, "salt seeding failed");
        }
        Ok(Self {
            phrase: Zeroizing::new(phrase.as_ref().to_vec()),
            auth,
            salt: AtomicU32::new(u32::from_ne_bytes(seed)),
        })
    }

    fn key(&self, engine_id: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
        let key = Zeroizing::new(self.auth.password_to_key(&self.phrase, engine_id));
        if key.len() < 2 * DES_BLOCK {
            return Err(Error::decrypt(
                UNKNOWN_TARGET,
                CryptoErrorKind::KeyTooShort { length: key.len() },
            ));
        }
        Ok(key)
    }

    fn next_salt(&self, engine_boots: u32) -> [u8; DES_BLOCK] {
        let counter = self.salt.fetch_add(1, Ordering::Relaxed);
        let mut salt = [0u8; DES_BLOCK];
        salt[..4].copy_from_slice(&engine_boots.to_be_bytes());
        salt[4..].copy_from_slice(&counter.to_be_bytes());
        salt
    }
}

fn iv(key: &[u8], salt: &[u8]) -> [u8; DES_BLOCK] {
    let mut iv = [0u8; DES_BLOCK];
    for (i, byte) in iv.iter_mut().enumerate() {
        *byte = key[DES_BLOCK + i] ^ salt[i];
    }
    iv
}

impl fmt::Debug for DesPrivacyProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DesPrivacyProvider")
            .field("phrase", &"[REDACTED]")
            .field("auth", &self.auth)
            .finish_non_exhaustive()
    }
}

impl PrivacyProvider for DesPrivacyProvider {
    fn protocol(&self) -> Option<PrivProtocol> {
        Some(PrivProtocol::Des)
    }

    fn auth(&self) -> &Arc<dyn AuthenticationProvider> {
        &self.auth
    }

    fn encrypt(
        &self,
        scoped_pdu: &[u8],
        engine_id: &[u8],
        engine_boots: u32,
        _engine_time: u32,
    ) -> Result<(Vec<u8>, Vec<u8>)> {
        type DesCbc = cbc::Encryptor<des::Des>;

        let key = self.key(engine_id)?;
        let salt = self.next_salt(engine_boots);

        let padded_len = scoped_pdu.len().div_ceil(DES_BLOCK) * DES_BLOCK;
        let mut buffer = vec![0u8; padded_len];
        buffer[..scoped_pdu.len()].copy_from_slice(scoped_pdu);

        let cipher = DesCbc::new_from_slices(&key[..DES_BLOCK], &iv(&key, &salt))
            .map_err(|_| Error::decrypt(UNKNOWN_TARGET, CryptoErrorKind::CipherError))?;
        cipher
            .encrypt_padded_mut::<NoPadding>(&mut buffer, padded_len)
            .map_err(|_| Error::decrypt(UNKNOWN_TARGET, CryptoErrorKind::CipherError))?;

        Ok((buffer, salt.to_vec()))
    }

    fn decrypt(&self, ciphertext: &[u8], engine_id: &[u8], priv_params: &[u8]) -> Result<Vec<u8>> {
        type DesCbc = cbc::Decryptor<des::Des>;

        if priv_params.len() != DES_BLOCK {
            return Err(Error::decrypt(
                UNKNOWN_TARGET,
                CryptoErrorKind::InvalidPrivParamsLength {
                    expected: DES_BLOCK,
                    actual: priv_params.len(),
                },
            ));
        }
        if ciphertext.is_empty() || !ciphertext.len().is_multiple_of(DES_BLOCK) {
            return Err(Error::decrypt(
                UNKNOWN_TARGET,
                CryptoErrorKind::InvalidCiphertextLength {
                    length: ciphertext.len(),
                },
            ));
        }

        let key = self.key(engine_id)?;
        let cipher = DesCbc::new_from_slices(&key[..DES_BLOCK], &iv(&key, priv_params))
            .map_err(|_| Error::decrypt(UNKNOWN_TARGET, CryptoErrorKind::CipherError))?;
        let mut buffer = ciphertext.to_vec();
        let len = cipher
            .decrypt_padded_mut::<NoPadding>(&mut buffer)
            .map_err(|_| Error::decrypt(UNKNOWN_TARGET, CryptoErrorKind::CipherError))?
            .len();
        buffer.truncate(len);
        Ok(buffer)
    }
}

/// Build a privacy provider by algorithm name (`DES`).
pub fn privacy_provider(
    name: &str,
    phrase: impl AsRef<[u8]>,
    auth: Arc<dyn AuthenticationProvider>,
) -> Result<Arc<dyn PrivacyProvider>> {
    match name.parse::<PrivProtocol>()? {
        PrivProtocol::Des => Ok(Arc::new(DesPrivacyProvider::new(phrase, auth)?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::security::auth::{
        DefaultAuthenticationProvider, Md5AuthenticationProvider, Sha1AuthenticationProvider,
    };

    fn des() -> DesPrivacyProvider {
        DesPrivacyProvider::new(
            "privpass123",
            Arc::new(Md5AuthenticationProvider::new("authpass123")),
        )
        .unwrap()
    }

    #[test]
    fn round_trip_pads_to_block() {
        let provider = des();
        let plaintext = b"scoped pdu bytes, 27 long!!";
        let (ciphertext, salt) = provider.encrypt(plaintext, b"engine", 5, 100).unwrap();
        assert_eq!(ciphertext.len(), 32);
        assert_eq!(salt.len(), 8);
        assert_eq!(&salt[..4], &5u32.to_be_bytes());
        assert_ne!(&ciphertext[..plaintext.len()], plaintext.as_slice());

        let decrypted = provider.decrypt(&ciphertext, b"engine", &salt).unwrap();
        assert_eq!(&decrypted[..plaintext.len()], plaintext.as_slice());
        assert!(decrypted[plaintext.len()..].iter().all(|&b| b == 0));
    }

    #[test]
    fn salt_changes_per_message() {
        let provider = des();
        let (c1, s1) = provider.encrypt(b"same input", b"engine", 1, 0).unwrap();
        let (c2, s2) = provider.encrypt(b"same input", b"engine", 1, 0).unwrap();
        assert_ne!(s1, s2);
        assert_ne!(c1, c2);
    }

    #[test]
    fn wrong_engine_does_not_decrypt() {
        let provider = des();
        let (ciphertext, salt) = provider.encrypt(b"12345678", b"engine-a", 1, 0).unwrap();
        let other = provider.decrypt(&ciphertext, b"engine-b", &salt).unwrap();
        assert_ne!(other, b"12345678");
    }

    #[test]
    fn malformed_inputs_rejected() {
        let provider = des();
        let err = provider.decrypt(&[0; 12], b"engine", &[0; 8]).unwrap_err();
        assert!(matches!(*err, Error::Decrypt { .. }));
        let err = provider.decrypt(&[0; 16], b"engine", &[0; 4]).unwrap_err();
        assert!(matches!(*err, Error::Decrypt { .. }));
    }

    #[test]
    fn requires_authentication() {
        let err = DesPrivacyProvider::new("privpass", Arc::new(DefaultAuthenticationProvider))
            .unwrap_err();
        assert!(matches!(*err, Error::InvalidArgument { .. }));
    }

    #[test]
    fn security_levels() {
        let none = DefaultPrivacyProvider::new(Arc::new(DefaultAuthenticationProvider));
        assert_eq!(none.security_level(), SecurityLevel::NoAuthNoPriv);
        let auth = DefaultPrivacyProvider::new(Arc::new(Sha1AuthenticationProvider::new("x")));
        assert_eq!(auth.security_level(), SecurityLevel::AuthNoPriv);
        assert_eq!(des().security_level(), SecurityLevel::AuthPriv);
    }

    #[test]
    fn default_passes_through() {
        let provider = DefaultPrivacyProvider::new(Arc::new(DefaultAuthenticationProvider));
        let (out, params) = provider.encrypt(b"abc", b"e", 0, 0).unwrap();
        assert_eq!(out, b"abc");
        assert!(params.is_empty());
        assert_eq!(provider.decrypt(b"abc", b"e", b"").unwrap(), b"abc");
    }

    #[test]
    fn names() {
        assert_eq!("des".parse::<PrivProtocol>().unwrap(), PrivProtocol::Des);
        assert!("AES".parse::<PrivProtocol>().is_err());
        let auth: Arc<dyn AuthenticationProvider> = Arc::new(Md5AuthenticationProvider::new("a"));
        assert!(privacy_provider("DES", "p", auth).is_ok());
    }
}
