//! Local identity.

use x25519_dalek::{PublicKey, StaticSecret};

use crate::chat::error::ChatError;
use crate::crypto::KeyPair;

/// The local participant: a display name plus the asymmetric keypair
/// peers seal session keys to.
///
/// Created once at startup and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct Identity {
    username: String,
    keys: KeyPair,
}

impl Identity {
    /// Creates an identity with a freshly generated keypair.
    ///
    /// The username must be non-empty; no further validation is applied.
    pub fn create(username: impl Into<String>) -> Result<Self, ChatError> {
        Self::with_keys(username, KeyPair::generate())
    }

    /// Creates an identity around an existing keypair, e.g. one loaded
    /// from the files `keygen` wrote.
    pub fn with_keys(username: impl Into<String>, keys: KeyPair) -> Result<Self, ChatError> {
        let username = username.into();
        if username.is_empty() {
            return Err(ChatError::InvalidUsername(
                "username must not be empty".to_string(),
            ));
        }
        Ok(Self { username, keys })
    }

    /// Display name announced to the network.
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Public half of the identity keypair.
    pub fn public_key(&self) -> &PublicKey {
        self.keys.public_key()
    }

    /// Private half of the identity keypair.
    pub fn secret_key(&self) -> &StaticSecret {
        self.keys.secret_key()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_identity() {
        let identity = Identity::create("alice").unwrap();
        assert_eq!(identity.username(), "alice");
    }

    #[test]
    fn test_empty_username_rejected() {
        assert!(matches!(
            Identity::create(""),
            Err(ChatError::InvalidUsername(_))
        ));
    }

    #[test]
    fn test_keys_are_a_matching_pair() {
        let identity = Identity::create("alice").unwrap();
        let derived = PublicKey::from(identity.secret_key());

        assert_eq!(identity.public_key().as_bytes(), derived.as_bytes());
    }

    #[test]
    fn test_with_keys_preserves_keypair() {
        let keys = KeyPair::generate();
        let expected = *keys.public_key().as_bytes();

        let identity = Identity::with_keys("bob", keys).unwrap();

        assert_eq!(identity.public_key().as_bytes(), &expected);
    }
}
