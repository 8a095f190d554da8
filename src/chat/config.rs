//! Network configuration.

use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Default UDP port for discovery broadcasts and chat datagrams.
pub const DEFAULT_PORT: u16 = 5555;

/// Default presence announcement interval in seconds.
pub const DEFAULT_INTERVAL_SECONDS: u64 = 5;

/// Default receive buffer size in bytes.
pub const DEFAULT_BUFFER_SIZE: usize = 1024;

/// Default broadcast destination for presence announcements.
pub const DEFAULT_BROADCAST_ADDR: Ipv4Addr = Ipv4Addr::BROADCAST;

/// Errors that can occur while loading or saving configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Could not determine the platform config directory")]
    NoConfigDir,

    #[error("Invalid config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Could not serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Network settings for a node.
///
/// All fields are optional in the TOML file; missing ones fall back to the
/// defaults above. `peer_ttl_seconds` is off by default: directory entries
/// then persist until overwritten by a newer announcement.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct NetConfig {
    /// UDP port used for both discovery and chat traffic.
    pub port: u16,

    /// Seconds between presence announcements.
    pub interval_seconds: u64,

    /// Receive buffer size in bytes; datagrams beyond this are truncated.
    pub buffer_size: usize,

    /// Destination address for presence broadcasts.
    pub broadcast_addr: Ipv4Addr,

    /// Evict directory entries not refreshed within this many seconds.
    pub peer_ttl_seconds: Option<u64>,
}

impl Default for NetConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            interval_seconds: DEFAULT_INTERVAL_SECONDS,
            buffer_size: DEFAULT_BUFFER_SIZE,
            broadcast_addr: DEFAULT_BROADCAST_ADDR,
            peer_ttl_seconds: None,
        }
    }
}

impl NetConfig {
    /// Interval between presence announcements.
    pub fn announce_interval(&self) -> Duration {
        Duration::from_secs(self.interval_seconds)
    }

    /// Directory staleness bound, if eviction is enabled.
    pub fn peer_ttl(&self) -> Option<Duration> {
        self.peer_ttl_seconds.map(Duration::from_secs)
    }

    /// Default config file location: `<config dir>/lanfare/config.toml`.
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        let dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(dir.join("lanfare").join("config.toml"))
    }

    /// Loads config from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Loads config, falling back to defaults.
    ///
    /// An explicitly given path must exist and parse. With no path, the
    /// default location is tried and a missing file yields `Self::default()`.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(p) => Self::load(p),
            None => {
                let default = Self::default_path()?;
                if default.exists() {
                    Self::load(&default)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Saves config as TOML, creating parent directories as needed.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }
}
