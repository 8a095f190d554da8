//! # Lanfare - encrypted chat for the local network
//!
//! Lanfare is a peer-to-peer chat tool for trusted local networks. Peers
//! announce themselves over UDP broadcast and exchange end-to-end encrypted
//! messages as single datagrams. There is no server and no pairing step:
//! run a node, see who is around, start talking.
//!
//! ## Overview
//!
//! - Presence broadcasts every few seconds carry just a username
//! - A peer directory maps each username to the address it last announced from
//! - Message payloads are encrypted with a per-peer session key
//! - Session keys are minted lazily on first contact and delivered sealed to
//!   the recipient's X25519 public key
//!
//! ## Security Model
//!
//! - **Confidentiality**: message text never crosses the wire in the clear
//! - **Lazy trust**: key material exists only for peers you actually message
//! - **Presence is unauthenticated**: anyone on the LAN can claim any
//!   username, so verify key fingerprints out of band
//!
//! ## Example
//!
//! ```rust
//! use lanfare::crypto::{decrypt_message, encrypt_message, SessionKey};
//!
//! let key = SessionKey::generate();
//! let envelope = encrypt_message(&key, "see you at the lab").unwrap();
//!
//! // Only the envelope is transmitted
//! let text = decrypt_message(&key, &envelope).unwrap();
//! assert_eq!(text, "see you at the lab");
//! ```
//!
//! ## Modules
//!
//! - [`chat`]: peer discovery, session keys, and the chat node itself
//! - [`contacts`]: the username to public key registry
//! - [`crypto`]: key files, sealed key delivery, message encryption

pub mod chat;
pub mod contacts;
pub mod crypto;

// Re-export commonly used types at the crate root
pub use chat::{
    bind_shared_socket, ChatError, ChatEvent, ChatNode, Identity, KeyDirectory,
    LoopbackKeyDirectory, NetConfig, Peer, PeerDirectory,
};
pub use contacts::{Contact, ContactsConfig, ContactsError, ContactsKeyDirectory};
pub use crypto::KeyPair;
