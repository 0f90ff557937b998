//! Memoization of localized keys by (password, engine ID).

use std::fmt::Write as _;

use super::cache::BoundedCache;
use crate::error::Result;

/// Default number of passwords, and of engine IDs per password, kept.
pub const DEFAULT_CAPACITY: usize = 100;

/// Two-level cache: password to engine ID to derived key.
///
/// Both levels evict in insertion order. Evicting a password drops every
/// key derived from it. Not synchronized; providers keep it behind a mutex.
#[derive(Debug, Clone)]
pub struct CryptoKeyCache {
    capacity: usize,
    passwords: BoundedCache<Vec<u8>, BoundedCache<Vec<u8>, Vec<u8>>>,
}

impl CryptoKeyCache {
    /// `capacity` bounds the number of passwords and the number of engine
    /// IDs remembered for each one.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            passwords: BoundedCache::new(capacity),
        }
    }

    pub fn try_get_cached_value(&self, password: &[u8], engine_id: &[u8]) -> Option<&[u8]> {
        self.passwords
            .try_get(password)?
            .try_get(engine_id)
            .map(Vec::as_slice)
    }

    /// Remember `key` for the pair.
    ///
    /// Fails with [`Error::CacheConflict`](crate::Error::CacheConflict) if
    /// the pair is already cached.
    pub fn add_value_to_cache(
        &mut self,
        password: &[u8],
        engine_id: &[u8],
        key: &[u8],
    ) -> Result<()> {
        if !self.passwords.contains(password) {
            self.passwords
                .add(password.to_vec(), BoundedCache::new(self.capacity))?;
        }
        match self.passwords.try_get_mut(password) {
            Some(engines) => engines.add(engine_id.to_vec(), key.to_vec()),
            // capacity is at least 1, so the entry just added survives
            None => Ok(()),
        }
    }

    /// Number of passwords with at least one cached key.
    pub fn len(&self) -> usize {
        self.passwords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.passwords.is_empty()
    }
}

impl Default for CryptoKeyCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

/// Decimal digits of every byte, concatenated.
///
/// Not injective: `[1, 11]` and `[11, 1]` give the same string.
pub fn canonical_key(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 3);
    for b in bytes {
        let _ = write!(out, "{}", b);
    }
    out
}
