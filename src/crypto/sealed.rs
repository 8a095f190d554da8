//! Sealed-box encryption of session keys using X25519 and ChaCha20Poly1305.
//!
//! When a session key is minted for a peer, it is sealed under that peer's
//! public key so only the peer can recover it:
//! 1. Generate ephemeral X25519 key pair
//! 2. Perform ECDH with the recipient's public key
//! 3. Derive a wrapping key using HKDF
//! 4. Encrypt the session key with ChaCha20Poly1305

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Nonce,
};
use hkdf::Hkdf;
use rand::rngs::OsRng;
use sha2::Sha256;
use thiserror::Error;
use x25519_dalek::{EphemeralSecret, PublicKey, StaticSecret};

use crate::crypto::cipher::SessionKey;

/// HKDF info string for wrapping-key derivation.
const HKDF_INFO: &[u8] = b"LANFARE-V1-SESSION-KEY";

/// Nonce size for ChaCha20Poly1305.
const NONCE_SIZE: usize = 12;

/// Errors that can occur during sealed-box operations.
#[derive(Error, Debug)]
pub enum SealError {
    #[error("Sealing failed: {0}")]
    SealFailed(String),

    #[error("Opening failed: {0}")]
    OpenFailed(String),

    #[error("Invalid sealed key: too short")]
    SealedKeyTooShort,

    #[error("Sealed payload is not a session key: expected {expected} bytes, got {got}")]
    InvalidKeyLength { expected: usize, got: usize },

    #[error("Base64 decode error: {0}")]
    Base64Error(#[from] base64::DecodeError),

    #[error("Key derivation failed")]
    KeyDerivationFailed,
}

/// A session key sealed for one recipient.
#[derive(Clone, Debug)]
pub struct SealedKey {
    /// Ephemeral public key (32 bytes)
    pub ephemeral_public: [u8; 32],
    /// Nonce (12 bytes)
    pub nonce: [u8; NONCE_SIZE],
    /// Encrypted session key (includes auth tag)
    pub ciphertext: Vec<u8>,
}

impl SealedKey {
    /// Serializes the sealed key to bytes.
    ///
    /// Format: ephemeral_public (32) || nonce (12) || ciphertext (variable)
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut result = Vec::with_capacity(32 + NONCE_SIZE + self.ciphertext.len());
        result.extend_from_slice(&self.ephemeral_public);
        result.extend_from_slice(&self.nonce);
        result.extend_from_slice(&self.ciphertext);
        result
    }

    /// Deserializes a sealed key from bytes.
    pub fn from_bytes(data: &[u8]) -> Result<Self, SealError> {
        // Minimum: 32 (public key) + 12 (nonce) + 16 (auth tag) = 60 bytes
        if data.len() < 60 {
            return Err(SealError::SealedKeyTooShort);
        }

        let mut ephemeral_public = [0u8; 32];
        ephemeral_public.copy_from_slice(&data[..32]);

        let mut nonce = [0u8; NONCE_SIZE];
        nonce.copy_from_slice(&data[32..32 + NONCE_SIZE]);

        let ciphertext = data[32 + NONCE_SIZE..].to_vec();

        Ok(Self {
            ephemeral_public,
            nonce,
            ciphertext,
        })
    }

    /// Encodes the sealed key as base64 for the wire.
    pub fn to_base64(&self) -> String {
        BASE64.encode(self.to_bytes())
    }

    /// Decodes a sealed key from its base64 wire form.
    pub fn from_base64(encoded: &str) -> Result<Self, SealError> {
        let bytes = BASE64.decode(encoded)?;
        Self::from_bytes(&bytes)
    }
}

/// Seals a session key for a recipient using their public key.
///
/// Uses X25519 ECDH to establish a shared secret, then encrypts with
/// ChaCha20Poly1305.
pub fn seal(key: &SessionKey, recipient_public: &PublicKey) -> Result<SealedKey, SealError> {
    // Generate ephemeral key pair
    let ephemeral_secret = EphemeralSecret::random_from_rng(OsRng);
    let ephemeral_public = PublicKey::from(&ephemeral_secret);

    // Perform ECDH
    let shared_secret = ephemeral_secret.diffie_hellman(recipient_public);

    let wrapping_key = derive_wrapping_key(shared_secret.as_bytes())?;

    // Generate random nonce
    let mut nonce_bytes = [0u8; NONCE_SIZE];
    rand::RngCore::fill_bytes(&mut OsRng, &mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let cipher = ChaCha20Poly1305::new_from_slice(&wrapping_key)
        .map_err(|e| SealError::SealFailed(e.to_string()))?;

    let ciphertext = cipher
        .encrypt(nonce, key.as_bytes().as_slice())
        .map_err(|e| SealError::SealFailed(e.to_string()))?;

    Ok(SealedKey {
        ephemeral_public: *ephemeral_public.as_bytes(),
        nonce: nonce_bytes,
        ciphertext,
    })
}

/// Opens a sealed session key using the recipient's secret key.
pub fn open(sealed: &SealedKey, secret_key: &StaticSecret) -> Result<SessionKey, SealError> {
    // Reconstruct ephemeral public key
    let ephemeral_public = PublicKey::from(sealed.ephemeral_public);

    // Perform ECDH
    let shared_secret = secret_key.diffie_hellman(&ephemeral_public);

    let wrapping_key = derive_wrapping_key(shared_secret.as_bytes())?;

    let cipher = ChaCha20Poly1305::new_from_slice(&wrapping_key)
        .map_err(|e| SealError::OpenFailed(e.to_string()))?;

    let nonce = Nonce::from_slice(&sealed.nonce);

    let plaintext = cipher
        .decrypt(nonce, sealed.ciphertext.as_ref())
        .map_err(|e| SealError::OpenFailed(e.to_string()))?;

    if plaintext.len() != 32 {
        return Err(SealError::InvalidKeyLength {
            expected: 32,
            got: plaintext.len(),
        });
    }

    let mut key_bytes = [0u8; 32];
    key_bytes.copy_from_slice(&plaintext);
    Ok(SessionKey::from_bytes(key_bytes))
}

fn derive_wrapping_key(shared_secret: &[u8]) -> Result<[u8; 32], SealError> {
    let hk = Hkdf::<Sha256>::new(None, shared_secret);
    let mut wrapping_key = [0u8; 32];
    hk.expand(HKDF_INFO, &mut wrapping_key)
        .map_err(|_| SealError::KeyDerivationFailed)?;
    Ok(wrapping_key)
}
