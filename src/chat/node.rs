//! The chat node: wiring and the send path.
//!
//! A [`ChatNode`] owns the shared socket and the background tasks
//! (announcer, listener, inbound processor, optional eviction sweep).
//! Sending runs on the caller's task and never blocks on the loops:
//! resolve the peer, obtain a session key, encrypt, transmit one
//! datagram. Decrypted inbound messages are delivered to the caller as an
//! event stream.

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::chat::config::NetConfig;
use crate::chat::directory::{Peer, PeerDirectory};
use crate::chat::discovery::{
    spawn_announcer_loop, spawn_eviction_loop, spawn_listener_loop, InboundDatagram,
};
use crate::chat::error::ChatError;
use crate::chat::identity::Identity;
use crate::chat::session::{KeyDirectory, SessionKeyStore};
use crate::chat::transport::Datagram;
use crate::chat::wire::{ChatEnvelope, InboundFrame, KeyOffer};
use crate::crypto::{decrypt_message, encrypt_message, open, SealedKey};

/// A decrypted inbound message, as handed to the front end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatEvent {
    /// Username the envelope claimed as sender.
    pub sender: String,
    /// Decrypted message text.
    pub text: String,
}

/// A running node: discovery plus encrypted messaging over one socket.
pub struct ChatNode {
    identity: Arc<Identity>,
    config: NetConfig,
    socket: Arc<dyn Datagram>,
    directory: PeerDirectory,
    sessions: Arc<SessionKeyStore>,
    shutdown_tx: watch::Sender<bool>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl ChatNode {
    /// Starts a node on an already-bound socket.
    ///
    /// Spawns the announcer, the listener, the inbound processor and,
    /// when a peer TTL is configured, the eviction sweep. Returns the
    /// node and the stream of decrypted inbound messages.
    pub fn start(
        identity: Identity,
        config: NetConfig,
        socket: Arc<dyn Datagram>,
        key_directory: Arc<dyn KeyDirectory>,
    ) -> (Self, mpsc::UnboundedReceiver<ChatEvent>) {
        let identity = Arc::new(identity);
        let directory = PeerDirectory::new();
        let sessions = Arc::new(SessionKeyStore::new(key_directory));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (forward_tx, forward_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let broadcast_target = SocketAddr::from((config.broadcast_addr, config.port));
        let mut tasks = vec![
            spawn_announcer_loop(
                socket.clone(),
                identity.username().to_string(),
                broadcast_target,
                config.announce_interval(),
                shutdown_rx.clone(),
            ),
            spawn_listener_loop(
                socket.clone(),
                identity.username().to_string(),
                directory.clone(),
                forward_tx,
                config.buffer_size,
                shutdown_rx.clone(),
            ),
            tokio::spawn(run_inbound(
                forward_rx,
                sessions.clone(),
                identity.clone(),
                events_tx,
            )),
        ];

        if let Some(ttl) = config.peer_ttl() {
            tasks.push(spawn_eviction_loop(directory.clone(), ttl, shutdown_rx));
        }

        info!(username = %identity.username(), port = config.port, "node started");

        let node = Self {
            identity,
            config,
            socket,
            directory,
            sessions,
            shutdown_tx,
            tasks: Mutex::new(tasks),
        };
        (node, events_rx)
    }

    /// Local display name.
    pub fn username(&self) -> &str {
        self.identity.username()
    }

    /// Network settings this node runs with.
    pub fn config(&self) -> &NetConfig {
        &self.config
    }

    /// Current view of announced peers.
    pub async fn peers(&self) -> Vec<Peer> {
        self.directory.snapshot().await
    }

    /// Sends one encrypted message to a known peer.
    ///
    /// Fails without any network traffic when the recipient has never
    /// announced itself. The first message to a peer additionally carries
    /// a one-time key offer so the peer can decrypt what follows.
    pub async fn send(&self, recipient: &str, text: &str) -> Result<(), ChatError> {
        let ip = self
            .directory
            .resolve(recipient)
            .await
            .ok_or_else(|| ChatError::PeerUnknown(recipient.to_string()))?;
        let target = SocketAddr::new(ip, self.config.port);
        debug!(peer = %recipient, %target, "peer resolved");

        let establishment = self.sessions.get_or_establish(recipient).await?;

        if let Some(sealed) = &establishment.offer {
            let offer = KeyOffer::new(self.identity.username(), sealed.to_base64());
            let bytes = offer
                .to_bytes()
                .map_err(|e| ChatError::SerializationFailed(e.to_string()))?;
            self.socket
                .send_to(&bytes, target)
                .await
                .map_err(|e| ChatError::SendFailed(e.to_string()))?;
            debug!(peer = %recipient, "session key offer delivered");
        }

        let payload = encrypt_message(&establishment.key, text)?;
        let envelope = ChatEnvelope::new(self.identity.username(), payload);
        let bytes = envelope
            .to_bytes()
            .map_err(|e| ChatError::SerializationFailed(e.to_string()))?;
        self.socket
            .send_to(&bytes, target)
            .await
            .map_err(|e| ChatError::SendFailed(e.to_string()))?;

        debug!(peer = %recipient, "message sent");
        Ok(())
    }

    /// Stops the background tasks and waits for them to finish.
    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
        let mut tasks = self.tasks.lock().await;
        for task in tasks.drain(..) {
            if let Err(err) = task.await {
                warn!(error = %err, "background task ended abnormally");
            }
        }
        info!("node stopped");
    }
}

/// Consumes forwarded datagrams: opens key offers, decrypts envelopes,
/// emits events. Ends when the listener hangs up.
async fn run_inbound(
    mut forward_rx: mpsc::UnboundedReceiver<InboundDatagram>,
    sessions: Arc<SessionKeyStore>,
    identity: Arc<Identity>,
    events_tx: mpsc::UnboundedSender<ChatEvent>,
) {
    while let Some(datagram) = forward_rx.recv().await {
        match datagram.frame {
            InboundFrame::Chat(envelope) => match sessions.get(&envelope.from).await {
                Some(key) => match decrypt_message(&key, &envelope.message) {
                    Ok(text) => {
                        debug!(peer = %envelope.from, "message received");
                        let _ = events_tx.send(ChatEvent {
                            sender: envelope.from,
                            text,
                        });
                    }
                    Err(err) => {
                        warn!(peer = %envelope.from, error = %err, "could not decrypt message")
                    }
                },
                None => {
                    warn!(peer = %envelope.from, "message from peer without a session key")
                }
            },
            InboundFrame::KeyOffer(offer) => match SealedKey::from_base64(&offer.key) {
                Ok(sealed) => match open(&sealed, identity.secret_key()) {
                    Ok(key) => {
                        if sessions.insert_offered(&offer.from, key).await {
                            info!(peer = %offer.from, "session key accepted");
                        } else {
                            debug!(peer = %offer.from, "key offer ignored, key already present");
                        }
                    }
                    Err(err) => {
                        warn!(peer = %offer.from, error = %err, "could not open key offer")
                    }
                },
                Err(err) => warn!(peer = %offer.from, error = %err, "malformed key offer"),
            },
            // Presence never reaches here; the listener consumes it.
            InboundFrame::Presence(_) => {}
        }
    }
}
