//! Contact management for Lanfare.
//!
//! A contact maps a username seen on the network to that user's public key
//! file. The registry lives in `<config dir>/lanfare/contacts.toml` and
//! backs the key lookups the chat layer performs when it establishes a
//! session with a peer.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use x25519_dalek::PublicKey;

use crate::chat::{KeyDirectory, KeyLookupError};
use crate::crypto::load_public_key;

/// Errors that can occur when managing contacts.
#[derive(Error, Debug)]
pub enum ContactsError {
    #[error("contact not found: {0}")]
    NotFound(String),

    #[error("contact already exists: {0}")]
    AlreadyExists(String),

    #[error("config directory not found, unable to determine home directory")]
    NoConfigDir,

    #[error("invalid key file: {0}")]
    InvalidKeyFile(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParseError(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerializeError(#[from] toml::ser::Error),
}

/// A contact's key material on disk.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Contact {
    /// Path to the contact's public key (.pub)
    pub public_key: PathBuf,
}

impl Contact {
    pub fn new(public_key: PathBuf) -> Self {
        Self { public_key }
    }
}

/// The contact registry stored in TOML format.
#[derive(Serialize, Deserialize, Debug, Default)]
pub struct ContactsConfig {
    /// Map of usernames to their key material.
    #[serde(default)]
    pub contacts: HashMap<String, Contact>,
}

impl ContactsConfig {
    /// Default registry location: `<config dir>/lanfare/contacts.toml`.
    pub fn default_path() -> Result<PathBuf, ContactsError> {
        let dir = dirs::config_dir().ok_or(ContactsError::NoConfigDir)?;
        Ok(dir.join("lanfare").join("contacts.toml"))
    }

    /// Loads the registry from the default location.
    ///
    /// A missing file is an empty registry, not an error.
    pub fn load() -> Result<Self, ContactsError> {
        let path = Self::default_path()?;
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    /// Loads the registry from an explicit path.
    pub fn load_from(path: &Path) -> Result<Self, ContactsError> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Saves the registry to the default location.
    pub fn save(&self) -> Result<(), ContactsError> {
        self.save_to(&Self::default_path()?)
    }

    /// Saves the registry to an explicit path, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<(), ContactsError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = fs::metadata(path)?.permissions();
            perms.set_mode(0o600);
            fs::set_permissions(path, perms)?;
        }

        Ok(())
    }

    /// Adds a new contact. Fails if the username is already registered.
    pub fn add(&mut self, username: &str, contact: Contact) -> Result<(), ContactsError> {
        if self.contacts.contains_key(username) {
            return Err(ContactsError::AlreadyExists(username.to_string()));
        }
        self.contacts.insert(username.to_string(), contact);
        Ok(())
    }

    /// Removes a contact by username.
    pub fn remove(&mut self, username: &str) -> Result<Contact, ContactsError> {
        self.contacts
            .remove(username)
            .ok_or_else(|| ContactsError::NotFound(username.to_string()))
    }

    /// Gets a contact by username.
    pub fn get(&self, username: &str) -> Option<&Contact> {
        self.contacts.get(username)
    }

    /// Lists all contacts sorted by username.
    pub fn list(&self) -> Vec<(&str, &Contact)> {
        let mut contacts: Vec<_> = self.contacts.iter().map(|(k, v)| (k.as_str(), v)).collect();
        contacts.sort_by(|a, b| a.0.cmp(b.0));
        contacts
    }

    pub fn contains(&self, username: &str) -> bool {
        self.contacts.contains_key(username)
    }

    pub fn len(&self) -> usize {
        self.contacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contacts.is_empty()
    }
}

/// Key lookups backed by the contact registry.
///
/// Key files are read at lookup time, so a re-imported key takes effect
/// without restarting the node.
pub struct ContactsKeyDirectory {
    contacts: HashMap<String, PathBuf>,
}

impl ContactsKeyDirectory {
    pub fn new(config: &ContactsConfig) -> Self {
        let contacts = config
            .contacts
            .iter()
            .map(|(name, contact)| (name.clone(), contact.public_key.clone()))
            .collect();
        Self { contacts }
    }
}

#[async_trait]
impl KeyDirectory for ContactsKeyDirectory {
    async fn lookup_public_key(&self, username: &str) -> Result<PublicKey, KeyLookupError> {
        let path = self
            .contacts
            .get(username)
            .ok_or_else(|| KeyLookupError::NotFound(username.to_string()))?;
        load_public_key(path)
            .map_err(|err| KeyLookupError::Unavailable(format!("{}: {}", path.display(), err)))
    }
}

/// Short fingerprint of a public key for display.
///
/// First eight bytes of the key's SHA-256, as grouped uppercase hex.
/// Compare it out of band before trusting an imported key.
pub fn key_fingerprint(public: &PublicKey) -> String {
    let digest = Sha256::digest(public.as_bytes());
    let hex = hex::encode_upper(&digest[..8]);
    hex.as_bytes()
        .chunks(4)
        .map(|chunk| std::str::from_utf8(chunk).unwrap_or(""))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{encode_public_key_pem, KeyPair};
    use tempfile::TempDir;

    fn write_public_key(dir: &TempDir, name: &str) -> (PathBuf, PublicKey) {
        let keys = KeyPair::generate();
        let path = dir.path().join(format!("{name}.pub"));
        fs::write(&path, encode_public_key_pem(keys.public_key())).unwrap();
        (path, *keys.public_key())
    }

    #[test]
    fn test_contacts_config_crud() {
        let mut config = ContactsConfig::default();

        config
            .add("alice", Contact::new(PathBuf::from("/keys/alice.pub")))
            .unwrap();
        assert!(config.contains("alice"));
        assert_eq!(config.len(), 1);

        let result = config.add("alice", Contact::new(PathBuf::from("/other.pub")));
        assert!(matches!(result, Err(ContactsError::AlreadyExists(_))));

        config
            .add("bob", Contact::new(PathBuf::from("/keys/bob.pub")))
            .unwrap();
        let list = config.list();
        assert_eq!(list[0].0, "alice");
        assert_eq!(list[1].0, "bob");

        let removed = config.remove("alice").unwrap();
        assert_eq!(removed.public_key, PathBuf::from("/keys/alice.pub"));
        assert!(!config.contains("alice"));

        assert!(matches!(
            config.remove("charlie"),
            Err(ContactsError::NotFound(_))
        ));
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("registry").join("contacts.toml");

        let mut config = ContactsConfig::default();
        config
            .add("alice", Contact::new(PathBuf::from("/keys/alice.pub")))
            .unwrap();
        config.save_to(&path).unwrap();

        let loaded = ContactsConfig::load_from(&path).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(
            loaded.get("alice").unwrap().public_key,
            PathBuf::from("/keys/alice.pub")
        );
    }

    #[test]
    fn test_load_from_missing_file_fails() {
        let dir = TempDir::new().unwrap();
        let result = ContactsConfig::load_from(&dir.path().join("nope.toml"));
        assert!(matches!(result, Err(ContactsError::IoError(_))));
    }

    #[test]
    fn test_toml_shape() {
        let mut config = ContactsConfig::default();
        config
            .add("alice", Contact::new(PathBuf::from("/keys/alice.pub")))
            .unwrap();

        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[contacts.alice]"));
        assert!(toml_str.contains("public_key"));

        let loaded: ContactsConfig = toml::from_str(&toml_str).unwrap();
        assert!(loaded.contains("alice"));
    }

    #[tokio::test]
    async fn test_key_directory_returns_registered_key() {
        let dir = TempDir::new().unwrap();
        let (path, expected) = write_public_key(&dir, "bob");

        let mut config = ContactsConfig::default();
        config.add("bob", Contact::new(path)).unwrap();

        let directory = ContactsKeyDirectory::new(&config);
        let found = directory.lookup_public_key("bob").await.unwrap();
        assert_eq!(found.as_bytes(), expected.as_bytes());
    }

    #[tokio::test]
    async fn test_key_directory_unknown_user_is_not_found() {
        let directory = ContactsKeyDirectory::new(&ContactsConfig::default());
        let err = directory.lookup_public_key("ghost").await.unwrap_err();
        assert!(matches!(err, KeyLookupError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_key_directory_unreadable_file_is_unavailable() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.pub");
        fs::write(&path, "not a pem").unwrap();

        let mut config = ContactsConfig::default();
        config.add("mallory", Contact::new(path)).unwrap();

        let directory = ContactsKeyDirectory::new(&config);
        let err = directory.lookup_public_key("mallory").await.unwrap_err();
        assert!(matches!(err, KeyLookupError::Unavailable(_)));
    }

    #[test]
    fn test_fingerprint_format_is_stable() {
        let keys = KeyPair::generate();
        let fp = key_fingerprint(keys.public_key());

        assert_eq!(fp.len(), 19);
        assert_eq!(fp.matches(' ').count(), 3);
        assert_eq!(fp, key_fingerprint(keys.public_key()));
        assert!(fp
            .chars()
            .all(|c| c.is_ascii_hexdigit() && !c.is_ascii_lowercase() || c == ' '));
    }
}
