//! Per-peer message encryption.
//!
//! Chat payloads are encrypted under a 256-bit session key with
//! ChaCha20-Poly1305 and carried on the wire as `base64(nonce || ciphertext)`.
//! A fresh nonce is drawn for every message; the auth tag turns a wrong or
//! missing key into a detected failure instead of garbage plaintext.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Nonce,
};
use rand::rngs::OsRng;
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Nonce size for ChaCha20Poly1305.
const NONCE_SIZE: usize = 12;

/// Errors that can occur while encoding or decoding a message payload.
#[derive(Error, Debug)]
pub enum CipherError {
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Decryption failed: wrong key or tampered ciphertext")]
    DecryptionFailed,

    #[error("Invalid payload: too short")]
    PayloadTooShort,

    #[error("Base64 decode error: {0}")]
    Base64Error(#[from] base64::DecodeError),

    #[error("Decrypted payload is not valid UTF-8")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),
}

/// A 256-bit symmetric session key shared with one peer.
///
/// Key material is wiped from memory on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SessionKey([u8; 32]);

impl std::fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("SessionKey").field(&"[REDACTED]").finish()
    }
}

impl SessionKey {
    /// Generates a fresh random session key.
    pub fn generate() -> Self {
        let mut bytes = [0u8; 32];
        rand::RngCore::fill_bytes(&mut OsRng, &mut bytes);
        Self(bytes)
    }

    /// Wraps existing key bytes (e.g. recovered from a sealed key).
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Returns the raw key bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

/// Encrypts a chat message under a session key.
///
/// Returns `base64(nonce (12 bytes) || ciphertext)`, ready to be placed in
/// an envelope's `message` field. Every call draws a fresh nonce, so two
/// encryptions of the same plaintext never produce the same payload.
pub fn encrypt_message(key: &SessionKey, plaintext: &str) -> Result<String, CipherError> {
    let mut nonce_bytes = [0u8; NONCE_SIZE];
    rand::RngCore::fill_bytes(&mut OsRng, &mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let cipher = ChaCha20Poly1305::new_from_slice(key.as_bytes())
        .map_err(|e| CipherError::EncryptionFailed(e.to_string()))?;

    let ciphertext = cipher
        .encrypt(nonce, plaintext.as_bytes())
        .map_err(|e| CipherError::EncryptionFailed(e.to_string()))?;

    let mut payload = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
    payload.extend_from_slice(&nonce_bytes);
    payload.extend_from_slice(&ciphertext);

    Ok(BASE64.encode(payload))
}

/// Decrypts a chat message payload under a session key.
///
/// Expects `base64(nonce (12 bytes) || ciphertext)`.
pub fn decrypt_message(key: &SessionKey, encoded: &str) -> Result<String, CipherError> {
    let data = BASE64.decode(encoded)?;

    // Minimum: 12 (nonce) + 16 (auth tag) = 28 bytes
    if data.len() < 28 {
        return Err(CipherError::PayloadTooShort);
    }

    let nonce = Nonce::from_slice(&data[..NONCE_SIZE]);
    let ciphertext = &data[NONCE_SIZE..];

    let cipher = ChaCha20Poly1305::new_from_slice(key.as_bytes())
        .map_err(|_| CipherError::DecryptionFailed)?;

    let plaintext = cipher
        .decrypt(nonce, ciphertext)
        .map_err(|_| CipherError::DecryptionFailed)?;

    Ok(String::from_utf8(plaintext)?)
}
