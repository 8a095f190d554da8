//! Peer directory.
//!
//! Live map of announced peers: username to IP address, written by the
//! discovery listener and read by the send path. Usernames are unique and
//! case-sensitive; a repeated announcement overwrites the stored address
//! (last write wins).

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// A peer as currently known to the directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Peer {
    /// Announced username.
    pub username: String,
    /// Address of the peer's most recent announcement.
    pub addr: IpAddr,
}

#[derive(Debug, Clone)]
struct PeerEntry {
    addr: IpAddr,
    last_seen: Instant,
}

/// Concurrent username-to-address map.
///
/// Cloning is cheap and shares the underlying map, so the listener task
/// and any number of readers can hold their own handle.
#[derive(Clone, Default)]
pub struct PeerDirectory {
    inner: Arc<RwLock<HashMap<String, PeerEntry>>>,
}

impl PeerDirectory {
    /// Creates an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an announcement: inserts the peer or refreshes its address
    /// and last-seen time.
    pub async fn upsert(&self, username: &str, addr: IpAddr) {
        let mut map = self.inner.write().await;
        map.insert(
            username.to_string(),
            PeerEntry {
                addr,
                last_seen: Instant::now(),
            },
        );
    }

    /// Looks up the address a username last announced from.
    pub async fn resolve(&self, username: &str) -> Option<IpAddr> {
        self.inner.read().await.get(username).map(|e| e.addr)
    }

    /// Returns all known peers, sorted by username for stable display.
    pub async fn snapshot(&self) -> Vec<Peer> {
        let map = self.inner.read().await;
        let mut peers: Vec<Peer> = map
            .iter()
            .map(|(username, entry)| Peer {
                username: username.clone(),
                addr: entry.addr,
            })
            .collect();
        peers.sort_by(|a, b| a.username.cmp(&b.username));
        peers
    }

    /// Removes peers whose last announcement is older than `ttl`.
    ///
    /// Returns the usernames that were evicted.
    pub async fn evict_stale(&self, ttl: Duration) -> Vec<String> {
        let mut map = self.inner.write().await;
        let now = Instant::now();
        let stale: Vec<String> = map
            .iter()
            .filter(|(_, entry)| now.duration_since(entry.last_seen) > ttl)
            .map(|(username, _)| username.clone())
            .collect();
        for username in &stale {
            map.remove(username);
        }
        stale
    }

    /// Number of known peers.
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    /// True if no peer has been recorded.
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    #[tokio::test]
    async fn test_upsert_and_resolve() {
        let dir = PeerDirectory::new();
        dir.upsert("bob", ip("10.0.0.5")).await;

        assert_eq!(dir.resolve("bob").await, Some(ip("10.0.0.5")));
        assert_eq!(dir.resolve("carol").await, None);
    }

    #[tokio::test]
    async fn test_last_write_wins() {
        let dir = PeerDirectory::new();
        dir.upsert("bob", ip("10.0.0.5")).await;
        dir.upsert("bob", ip("10.0.0.9")).await;

        assert_eq!(dir.resolve("bob").await, Some(ip("10.0.0.9")));
        assert_eq!(dir.len().await, 1);
    }

    #[tokio::test]
    async fn test_snapshot_sorted() {
        let dir = PeerDirectory::new();
        dir.upsert("carol", ip("10.0.0.7")).await;
        dir.upsert("alice", ip("10.0.0.2")).await;
        dir.upsert("bob", ip("10.0.0.5")).await;

        let names: Vec<String> = dir
            .snapshot()
            .await
            .into_iter()
            .map(|p| p.username)
            .collect();

        assert_eq!(names, vec!["alice", "bob", "carol"]);
    }

    #[tokio::test]
    async fn test_evict_stale_removes_only_old_entries() {
        let dir = PeerDirectory::new();
        dir.upsert("old", ip("10.0.0.1")).await;

        tokio::time::sleep(Duration::from_millis(50)).await;
        dir.upsert("fresh", ip("10.0.0.2")).await;

        let evicted = dir.evict_stale(Duration::from_millis(25)).await;

        assert_eq!(evicted, vec!["old".to_string()]);
        assert_eq!(dir.resolve("old").await, None);
        assert_eq!(dir.resolve("fresh").await, Some(ip("10.0.0.2")));
    }

    #[tokio::test]
    async fn test_evict_with_long_ttl_keeps_everything() {
        let dir = PeerDirectory::new();
        dir.upsert("bob", ip("10.0.0.5")).await;

        let evicted = dir.evict_stale(Duration::from_secs(3600)).await;

        assert!(evicted.is_empty());
        assert_eq!(dir.len().await, 1);
    }

    #[tokio::test]
    async fn test_refresh_resets_staleness() {
        let dir = PeerDirectory::new();
        dir.upsert("bob", ip("10.0.0.5")).await;

        tokio::time::sleep(Duration::from_millis(50)).await;
        dir.upsert("bob", ip("10.0.0.5")).await;

        let evicted = dir.evict_stale(Duration::from_millis(40)).await;
        assert!(evicted.is_empty());
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let dir = PeerDirectory::new();
        let handle = dir.clone();

        dir.upsert("bob", ip("10.0.0.5")).await;

        assert_eq!(handle.resolve("bob").await, Some(ip("10.0.0.5")));
    }
}
