//! Chat error types.

use thiserror::Error;

/// Errors that can occur during chat operations.
///
/// The first three variants are the caller-visible send failures; their
/// display strings are what a front end shows the user.
#[derive(Error, Debug)]
pub enum ChatError {
    /// Recipient has never announced itself on this network.
    #[error("peer unknown: {0}")]
    PeerUnknown(String),

    /// Session-key establishment failed (no public key, or sealing error).
    #[error("failed to establish secure channel: {0}")]
    EstablishFailed(String),

    /// The outbound datagram could not be handed to the network stack.
    #[error("send failed: {0}")]
    SendFailed(String),

    /// The discovery socket could not be bound.
    #[error("Failed to bind discovery port {port}: {reason}")]
    BindFailed {
        /// Port the bind was attempted on.
        port: u16,
        /// Underlying socket error.
        reason: String,
    },

    /// Username is empty or otherwise unusable.
    #[error("Invalid username: {0}")]
    InvalidUsername(String),

    /// Message payload encryption failed.
    #[error("Cipher error: {0}")]
    CipherError(#[from] crate::crypto::CipherError),

    /// Wire serialization failed.
    #[error("Serialization failed: {0}")]
    SerializationFailed(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}
