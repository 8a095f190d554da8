//! Cryptographic operations for lanfare.
//!
//! This module provides:
//! - Identity key generation and management (X25519)
//! - Sealed-box wrapping of session keys (X25519 + HKDF + ChaCha20Poly1305)
//! - Per-peer message encryption (ChaCha20Poly1305)
//!
//! The hybrid flow lives in the chat layer: a random session key is minted
//! per peer, sealed under the peer's public key for delivery, and then used
//! symmetrically for every message to that peer.

pub mod cipher;
pub mod keys;
pub mod sealed;

pub use cipher::{decrypt_message, encrypt_message, CipherError, SessionKey};
pub use keys::{
    decode_public_key_pem, decode_secret_key_pem, encode_public_key_pem, encode_secret_key_pem,
    load_public_key, KeyError, KeyPair,
};
pub use sealed::{open, seal, SealError, SealedKey};
