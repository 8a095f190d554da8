//! Contacts command - manage the username to public key registry.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};

use lanfare::contacts::{key_fingerprint, Contact, ContactsConfig};
use lanfare::crypto::load_public_key;

use super::CommandExecutor;

/// Manage contacts and their public keys.
///
/// A contact links a username announced on the network to a public key
/// file, which is what allows sending that user encrypted messages.
#[derive(Args, Debug)]
pub struct ContactsCommand {
    #[command(subcommand)]
    pub action: ContactsAction,
}

#[derive(Subcommand, Debug)]
pub enum ContactsAction {
    /// List all contacts
    List,

    /// Add a new contact
    Add(ContactsAddArgs),

    /// Remove a contact
    Remove(ContactsRemoveArgs),

    /// Show contact details with key fingerprint
    Show(ContactsShowArgs),
}

#[derive(Args, Debug)]
pub struct ContactsAddArgs {
    /// Username the contact announces on the network
    pub username: String,

    /// Path to the contact's public key (.pub)
    pub key_path: PathBuf,
}

#[derive(Args, Debug)]
pub struct ContactsRemoveArgs {
    /// Username to remove
    pub username: String,
}

#[derive(Args, Debug)]
pub struct ContactsShowArgs {
    /// Username to show details for
    pub username: String,
}

impl CommandExecutor for ContactsCommand {
    fn execute(&self) -> Result<()> {
        match &self.action {
            ContactsAction::List => list_contacts(),
            ContactsAction::Add(args) => add_contact(args),
            ContactsAction::Remove(args) => remove_contact(args),
            ContactsAction::Show(args) => show_contact(args),
        }
    }
}

/// List all contacts.
fn list_contacts() -> Result<()> {
    let config = ContactsConfig::load().context("Failed to load contacts")?;

    if config.is_empty() {
        println!("No contacts configured.");
        println!();
        println!("Add a contact with:");
        println!("  lanfare contacts add <username> <key-path>");
        return Ok(());
    }

    println!("Contacts ({}):", config.len());
    println!();

    for (username, contact) in config.list() {
        println!("  {}", username);
        println!("    Public key: {}", contact.public_key.display());
        println!();
    }

    Ok(())
}

/// Add a new contact.
fn add_contact(args: &ContactsAddArgs) -> Result<()> {
    // The key must load now, not when the first message is sent.
    let public_key = load_public_key(&args.key_path)
        .with_context(|| format!("Failed to load public key from {}", args.key_path.display()))?;

    let mut config = ContactsConfig::load().context("Failed to load contacts")?;
    config
        .add(&args.username, Contact::new(args.key_path.clone()))
        .with_context(|| format!("Failed to add contact '{}'", args.username))?;
    config.save().context("Failed to save contacts")?;

    println!("Contact '{}' added.", args.username);
    println!("  Fingerprint: {}", key_fingerprint(&public_key));
    println!();
    println!("Verify the fingerprint with them over a trusted channel.");
    println!("You can now send with: lanfare send {} \"hello\" --username <you>", args.username);

    Ok(())
}

/// Remove a contact.
fn remove_contact(args: &ContactsRemoveArgs) -> Result<()> {
    let mut config = ContactsConfig::load().context("Failed to load contacts")?;

    config
        .remove(&args.username)
        .with_context(|| format!("Contact '{}' not found", args.username))?;
    config.save().context("Failed to save contacts")?;

    println!("Contact '{}' removed.", args.username);

    Ok(())
}

/// Show contact details with the key fingerprint.
fn show_contact(args: &ContactsShowArgs) -> Result<()> {
    let config = ContactsConfig::load().context("Failed to load contacts")?;

    let contact = config
        .get(&args.username)
        .with_context(|| format!("Contact '{}' not found", args.username))?;

    println!("Contact: {}", args.username);
    println!();
    println!("Public Key:");
    println!("  Path: {}", contact.public_key.display());

    match load_public_key(&contact.public_key) {
        Ok(public_key) => println!("  Fingerprint: {}", key_fingerprint(&public_key)),
        Err(err) => println!("  (unable to load key: {})", err),
    }

    Ok(())
}
