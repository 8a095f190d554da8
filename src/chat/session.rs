//! Session key management.
//!
//! Each peer pair shares one 256-bit session key, minted lazily the first
//! time a peer is addressed and reused for the rest of the process
//! lifetime. Minting requires the peer's public key, which comes from a
//! [`KeyDirectory`]; the minted key is sealed under that public key so it
//! can be delivered to the peer.

use async_trait::async_trait;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;
use x25519_dalek::PublicKey;

use crate::chat::error::ChatError;
use crate::crypto::{seal, SealedKey, SessionKey};

/// Errors a key directory lookup can produce.
#[derive(Error, Debug)]
pub enum KeyLookupError {
    /// No public key is registered for this username.
    #[error("no public key registered for {0}")]
    NotFound(String),

    /// The directory backend could not be consulted.
    #[error("key directory unavailable: {0}")]
    Unavailable(String),
}

/// Source of peer public keys.
#[async_trait]
pub trait KeyDirectory: Send + Sync {
    /// Returns the public key to seal session keys for `username` under.
    async fn lookup_public_key(&self, username: &str) -> Result<PublicKey, KeyLookupError>;
}

/// Key directory that answers every lookup with one fixed public key,
/// normally the local identity's own.
///
/// This reproduces the simplified single-machine model: keys sealed this
/// way can only be opened locally, so there is no confidentiality across
/// peers. Useful for demos and tests; real deployments use the contacts
/// registry instead.
pub struct LoopbackKeyDirectory {
    public: PublicKey,
}

impl LoopbackKeyDirectory {
    /// Creates a directory that always answers with `public`.
    pub fn new(public: PublicKey) -> Self {
        Self { public }
    }
}

#[async_trait]
impl KeyDirectory for LoopbackKeyDirectory {
    async fn lookup_public_key(&self, _username: &str) -> Result<PublicKey, KeyLookupError> {
        Ok(self.public)
    }
}

/// Result of [`SessionKeyStore::get_or_establish`].
#[derive(Debug)]
pub struct Establishment {
    /// The usable session key.
    pub key: SessionKey,
    /// Sealed copy for delivery to the peer. `Some` only when this call
    /// minted the key; cache hits carry `None`.
    pub offer: Option<SealedKey>,
}

/// Per-peer session key cache with lazy establishment.
pub struct SessionKeyStore {
    key_directory: Arc<dyn KeyDirectory>,
    keys: RwLock<HashMap<String, SessionKey>>,
    // One guard per username, so concurrent first sends to the same peer
    // share a single establishment.
    establish_guards: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl SessionKeyStore {
    /// Creates an empty store backed by the given key directory.
    pub fn new(key_directory: Arc<dyn KeyDirectory>) -> Self {
        Self {
            key_directory,
            keys: RwLock::new(HashMap::new()),
            establish_guards: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the session key for `username`, establishing one on first
    /// use.
    ///
    /// A cache hit does no directory lookup and no asymmetric work. On a
    /// miss the store looks up the peer's public key, mints a fresh random
    /// key, seals it for the peer, and caches it.
    pub async fn get_or_establish(&self, username: &str) -> Result<Establishment, ChatError> {
        if let Some(key) = self.keys.read().await.get(username) {
            return Ok(Establishment {
                key: key.clone(),
                offer: None,
            });
        }

        let guard = self.guard_for(username).await;
        let _held = guard.lock().await;

        // Check again under the guard: another task may have finished
        // establishing while we waited.
        if let Some(key) = self.keys.read().await.get(username) {
            return Ok(Establishment {
                key: key.clone(),
                offer: None,
            });
        }

        let public = self
            .key_directory
            .lookup_public_key(username)
            .await
            .map_err(|e| ChatError::EstablishFailed(e.to_string()))?;

        let key = SessionKey::generate();
        let sealed = seal(&key, &public).map_err(|e| ChatError::EstablishFailed(e.to_string()))?;

        self.keys
            .write()
            .await
            .insert(username.to_string(), key.clone());
        debug!(peer = %username, "session key established");

        Ok(Establishment {
            key,
            offer: Some(sealed),
        })
    }

    /// Stores a key a peer offered us, unless one is already present for
    /// that peer (first writer wins). Returns whether the key was stored.
    pub async fn insert_offered(&self, username: &str, key: SessionKey) -> bool {
        let mut keys = self.keys.write().await;
        match keys.entry(username.to_string()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(key);
                true
            }
        }
    }

    /// Returns the cached key for a username, if any.
    pub async fn get(&self, username: &str) -> Option<SessionKey> {
        self.keys.read().await.get(username).cloned()
    }

    async fn guard_for(&self, username: &str) -> Arc<Mutex<()>> {
        let mut guards = self.establish_guards.lock().await;
        guards.entry(username.to_string()).or_default().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{open, KeyPair};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Directory double that counts lookups.
    struct CountingDirectory {
        public: PublicKey,
        lookups: AtomicUsize,
    }

    impl CountingDirectory {
        fn new(public: PublicKey) -> Self {
            Self {
                public,
                lookups: AtomicUsize::new(0),
            }
        }

        fn lookup_count(&self) -> usize {
            self.lookups.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl KeyDirectory for CountingDirectory {
        async fn lookup_public_key(&self, _username: &str) -> Result<PublicKey, KeyLookupError> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            Ok(self.public)
        }
    }

    /// Directory double that never knows anyone.
    struct EmptyDirectory;

    #[async_trait]
    impl KeyDirectory for EmptyDirectory {
        async fn lookup_public_key(&self, username: &str) -> Result<PublicKey, KeyLookupError> {
            Err(KeyLookupError::NotFound(username.to_string()))
        }
    }

    #[tokio::test]
    async fn test_establish_then_cache_hit() {
        let peer = KeyPair::generate();
        let directory = Arc::new(CountingDirectory::new(*peer.public_key()));
        let store = SessionKeyStore::new(directory.clone());

        let first = store.get_or_establish("carol").await.unwrap();
        let second = store.get_or_establish("carol").await.unwrap();

        assert_eq!(first.key.as_bytes(), second.key.as_bytes());
        assert!(first.offer.is_some());
        assert!(second.offer.is_none());
        assert_eq!(directory.lookup_count(), 1);
    }

    #[tokio::test]
    async fn test_offer_opens_to_the_established_key() {
        let peer = KeyPair::generate();
        let directory = Arc::new(CountingDirectory::new(*peer.public_key()));
        let store = SessionKeyStore::new(directory);

        let established = store.get_or_establish("carol").await.unwrap();
        let opened = open(&established.offer.unwrap(), peer.secret_key()).unwrap();

        assert_eq!(established.key.as_bytes(), opened.as_bytes());
    }

    #[tokio::test]
    async fn test_concurrent_first_sends_share_one_establishment() {
        let peer = KeyPair::generate();
        let directory = Arc::new(CountingDirectory::new(*peer.public_key()));
        let store = Arc::new(SessionKeyStore::new(directory.clone()));

        let mut tasks = Vec::new();
        for _ in 0..8 {
            let store = store.clone();
            tasks.push(tokio::spawn(async move {
                store.get_or_establish("carol").await.unwrap()
            }));
        }

        let mut results = Vec::new();
        for task in tasks {
            results.push(task.await.unwrap());
        }

        let reference = results[0].key.as_bytes().to_vec();
        for result in &results {
            assert_eq!(result.key.as_bytes().as_slice(), reference.as_slice());
        }

        let offers = results.iter().filter(|r| r.offer.is_some()).count();
        assert_eq!(offers, 1);
        assert_eq!(directory.lookup_count(), 1);
    }

    #[tokio::test]
    async fn test_unknown_peer_fails_establishment() {
        let store = SessionKeyStore::new(Arc::new(EmptyDirectory));

        let err = store.get_or_establish("nobody").await.unwrap_err();

        match err {
            ChatError::EstablishFailed(reason) => {
                assert!(reason.contains("no public key registered"))
            }
            other => panic!("expected EstablishFailed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_insert_offered_first_writer_wins() {
        let store = SessionKeyStore::new(Arc::new(EmptyDirectory));
        let first = SessionKey::generate();
        let second = SessionKey::generate();
        let expected = *first.as_bytes();

        assert!(store.insert_offered("bob", first).await);
        assert!(!store.insert_offered("bob", second).await);

        assert_eq!(store.get("bob").await.unwrap().as_bytes(), &expected);
    }

    #[tokio::test]
    async fn test_offered_key_satisfies_establish_without_lookup() {
        let peer = KeyPair::generate();
        let directory = Arc::new(CountingDirectory::new(*peer.public_key()));
        let store = SessionKeyStore::new(directory.clone());

        let offered = SessionKey::generate();
        let expected = *offered.as_bytes();
        store.insert_offered("bob", offered).await;

        let establishment = store.get_or_establish("bob").await.unwrap();

        assert_eq!(establishment.key.as_bytes(), &expected);
        assert!(establishment.offer.is_none());
        assert_eq!(directory.lookup_count(), 0);
    }

    #[tokio::test]
    async fn test_loopback_directory_supports_self_open() {
        let me = KeyPair::generate();
        let directory = Arc::new(LoopbackKeyDirectory::new(*me.public_key()));
        let store = SessionKeyStore::new(directory);

        let established = store.get_or_establish("anyone").await.unwrap();
        let opened = open(&established.offer.unwrap(), me.secret_key()).unwrap();

        assert_eq!(established.key.as_bytes(), opened.as_bytes());
    }
}
