//! Presence discovery.
//!
//! Two long-running tasks share the node's socket: the announcer
//! broadcasts this node's username at a fixed cadence, and the listener
//! receives every datagram on the port, keeping the peer directory
//! current and forwarding chat traffic to the node. A third, optional
//! task evicts directory entries that have gone stale.
//!
//! None of these tasks ever aborts on a bad packet or a failed send; they
//! log and carry on. They stop only when the shutdown signal flips or its
//! sender is dropped.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::chat::directory::PeerDirectory;
use crate::chat::transport::Datagram;
use crate::chat::wire::{decode_frame, InboundFrame, PresenceMessage};

/// A non-presence datagram handed off to the node for handling.
#[derive(Debug)]
pub struct InboundDatagram {
    /// The decoded frame (chat envelope or key offer).
    pub frame: InboundFrame,
    /// Where the datagram came from.
    pub source: SocketAddr,
}

/// Spawns the presence announcer.
///
/// Broadcasts `{"username": ...}` to `target` immediately and then every
/// `interval`, fire-and-forget. An individual failed send is logged and
/// the cadence continues.
pub fn spawn_announcer_loop(
    socket: Arc<dyn Datagram>,
    username: String,
    target: SocketAddr,
    interval: Duration,
    mut shutdown_rx: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let payload = match PresenceMessage::new(&username).to_bytes() {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!(error = %err, "could not encode presence message, announcer not running");
                return;
            }
        };

        info!(
            interval_secs = interval.as_secs(),
            %target,
            "announcer started"
        );

        let mut ticker = tokio::time::interval(interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(err) = socket.send_to(&payload, target).await {
                        warn!(error = %err, "presence announcement failed");
                    }
                }
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        info!("announcer stopped");
                        return;
                    }
                }
            }
        }
    })
}

/// Spawns the discovery listener.
///
/// Receives datagrams into a `buffer_size` buffer and dispatches by
/// shape: presence announcements update the directory (ignoring our own
/// username and empty names), chat envelopes and key offers are forwarded
/// through `forward_tx`, and anything malformed is logged and dropped.
pub fn spawn_listener_loop(
    socket: Arc<dyn Datagram>,
    local_username: String,
    directory: PeerDirectory,
    forward_tx: mpsc::UnboundedSender<InboundDatagram>,
    buffer_size: usize,
    mut shutdown_rx: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(buffer_size, "listener started");
        let mut buf = vec![0u8; buffer_size];

        loop {
            tokio::select! {
                received = socket.recv_from(&mut buf) => {
                    match received {
                        Ok((len, source)) => {
                            handle_datagram(
                                &buf[..len],
                                source,
                                &local_username,
                                &directory,
                                &forward_tx,
                            )
                            .await;
                        }
                        Err(err) => {
                            warn!(error = %err, "receive failed");
                        }
                    }
                }
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        info!("listener stopped");
                        return;
                    }
                }
            }
        }
    })
}

async fn handle_datagram(
    data: &[u8],
    source: SocketAddr,
    local_username: &str,
    directory: &PeerDirectory,
    forward_tx: &mpsc::UnboundedSender<InboundDatagram>,
) {
    match decode_frame(data) {
        Ok(InboundFrame::Presence(presence)) => {
            if presence.username.is_empty() || presence.username == local_username {
                debug!("ignoring own or empty announcement");
                return;
            }
            debug!(peer = %presence.username, addr = %source.ip(), "peer announced");
            directory.upsert(&presence.username, source.ip()).await;
        }
        Ok(frame) => {
            // Chat envelope or key offer; the node decides what to do.
            let _ = forward_tx.send(InboundDatagram { frame, source });
        }
        Err(err) => {
            warn!(error = %err, %source, "discarding malformed datagram");
        }
    }
}

/// Spawns the staleness sweep for the peer directory.
///
/// Runs at half the TTL and removes entries whose last announcement is
/// older than `ttl`.
pub fn spawn_eviction_loop(
    directory: PeerDirectory,
    ttl: Duration,
    mut shutdown_rx: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(ttl_secs = ttl.as_secs(), "peer eviction started");
        let period = (ttl / 2).max(Duration::from_millis(50));
        let mut ticker = tokio::time::interval(period);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let evicted = directory.evict_stale(ttl).await;
                    if !evicted.is_empty() {
                        info!(peers = ?evicted, "evicted stale peers");
                    }
                }
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        info!("peer eviction stopped");
                        return;
                    }
                }
            }
        }
    })
}
