//! # Lanfare Chat Module
//!
//! Peer-to-peer encrypted chat over UDP on the local network.
//!
//! Peers find each other through periodic presence broadcasts and exchange
//! messages as single encrypted datagrams, all over one shared socket.
//!
//! ## Security Model
//!
//! - **Per-peer session keys** minted lazily on first contact
//! - **Sealed key delivery**: session keys travel wrapped for the
//!   recipient's X25519 key, never in the clear
//! - **Authenticated encryption** for every message payload
//! - **Sender names are advisory**: datagrams carry no signatures, so the
//!   `from` field is only as trustworthy as the local network

mod config;
mod directory;
pub mod discovery;
mod error;
mod identity;
mod node;
mod session;
pub mod transport;
pub mod wire;

pub use config::{
    ConfigError, NetConfig, DEFAULT_BROADCAST_ADDR, DEFAULT_BUFFER_SIZE,
    DEFAULT_INTERVAL_SECONDS, DEFAULT_PORT,
};
pub use directory::{Peer, PeerDirectory};
pub use error::ChatError;
pub use identity::Identity;
pub use node::{ChatEvent, ChatNode};
pub use session::{
    Establishment, KeyDirectory, KeyLookupError, LoopbackKeyDirectory, SessionKeyStore,
};
pub use transport::{bind_shared_socket, Datagram};
