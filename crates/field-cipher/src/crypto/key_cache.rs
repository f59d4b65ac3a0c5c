//! Optional in-memory cache of derived keys.
//!
//! PBKDF2 is deliberately slow and every field operation would otherwise pay for
//! it. Entries are keyed by a SHA-256 fingerprint of the KDF inputs, never by the
//! passphrase itself. The cache uses `arc-swap` for lock-free reads.

use std::{collections::HashMap, sync::Arc};

use arc_swap::ArcSwap;
use sha2::{Digest, Sha256};

use super::kdf::{DerivedKey, KdfParams};
use crate::passphrase::Passphrase;

/// SHA-256 over (salt, iterations, passphrase).
pub type Fingerprint = [u8; 32];

/// Compute the cache key for `passphrase` under `params`.
pub fn fingerprint(params: &KdfParams, passphrase: &Passphrase) -> Fingerprint {
    let mut hasher = Sha256::new();
    hasher.update((params.salt.len() as u64).to_be_bytes());
    hasher.update(&params.salt);
    hasher.update(params.iterations.to_be_bytes());
    hasher.update(passphrase.expose().as_bytes());
    hasher.finalize().into()
}

/// Shared, bounded cache of derived keys.
///
/// When an insert would exceed capacity the whole map is dropped and started
/// afresh; with one default passphrase per process that almost never happens.
#[derive(Clone)]
pub struct KeyCache {
    inner: Arc<ArcSwap<HashMap<Fingerprint, Arc<DerivedKey>>>>,
    capacity: usize,
}

impl KeyCache {
    /// Create an empty cache holding at most `capacity` keys (minimum 1).
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(ArcSwap::new(Arc::new(HashMap::new()))),
            capacity: capacity.max(1),
        }
    }

    /// Number of keys currently cached.
    pub fn len(&self) -> usize {
        self.inner.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.load().is_empty()
    }

    /// Look up a key by fingerprint.
    pub fn get(&self, fingerprint: &Fingerprint) -> Option<Arc<DerivedKey>> {
        self.inner.load().get(fingerprint).cloned()
    }

    /// Insert a key, resetting the cache first if it is full.
    pub fn insert(&self, fingerprint: Fingerprint, key: Arc<DerivedKey>) {
        let capacity = self.capacity;
        self.inner.rcu(|current| {
            let mut next = if current.len() >= capacity && !current.contains_key(&fingerprint) {
                HashMap::new()
            } else {
                HashMap::clone(current)
            };
            next.insert(fingerprint, key.clone());
            next
        });
    }

    /// Drop every cached key, e.g. after rotating the default passphrase.
    pub fn clear(&self) {
        self.inner.store(Arc::new(HashMap::new()));
    }
}

impl std::fmt::Debug for KeyCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyCache")
            .field("len", &self.len())
            .field("capacity", &self.capacity)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::kdf::derive_key;

    fn params() -> KdfParams {
        KdfParams::new("salt", 1)
    }

    fn key(pw: &str) -> Arc<DerivedKey> {
        Arc::new(derive_key(pw, &params()).unwrap())
    }

    #[test]
    fn fingerprint_depends_on_every_input() {
        let pw = Passphrase::from("pw");
        let base = fingerprint(&params(), &pw);
        assert_eq!(base, fingerprint(&params(), &Passphrase::from("pw")));
        assert_ne!(base, fingerprint(&params(), &Passphrase::from("pw2")));
        assert_ne!(base, fingerprint(&KdfParams::new("salt2", 1), &pw));
        assert_ne!(base, fingerprint(&KdfParams::new("salt", 2), &pw));
    }

    #[test]
    fn insert_and_get() {
        let cache = KeyCache::new(4);
        assert!(cache.is_empty());
        let fp = fingerprint(&params(), &Passphrase::from("a"));
        cache.insert(fp, key("a"));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&fp).unwrap().as_bytes(), key("a").as_bytes());
    }

    #[test]
    fn full_cache_resets() {
        let cache = KeyCache::new(2);
        for pw in ["a", "b", "c"] {
            cache.insert(fingerprint(&params(), &Passphrase::from(pw)), key(pw));
        }
        assert_eq!(cache.len(), 1);
        assert!(cache
            .get(&fingerprint(&params(), &Passphrase::from("c")))
            .is_some());
    }

    #[test]
    fn reinserting_existing_key_does_not_reset() {
        let cache = KeyCache::new(2);
        let fa = fingerprint(&params(), &Passphrase::from("a"));
        let fb = fingerprint(&params(), &Passphrase::from("b"));
        cache.insert(fa, key("a"));
        cache.insert(fb, key("b"));
        cache.insert(fa, key("a"));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn clear_empties() {
        let cache = KeyCache::new(2);
        cache.insert(fingerprint(&params(), &Passphrase::from("a")), key("a"));
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn debug_hides_fingerprints() {
        let cache = KeyCache::new(2);
        assert_eq!(format!("{cache:?}"), "KeyCache { len: 0, capacity: 2 }");
    }
}
