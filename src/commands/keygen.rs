//! Key generation command.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;

use lanfare::contacts::key_fingerprint;
use lanfare::crypto::KeyPair;

use super::CommandExecutor;

/// Generate a new X25519 key pair.
#[derive(Args, Debug)]
pub struct KeygenCommand {
    /// Output path for keys (creates .pub and .key files)
    #[arg(short, long, default_value = "lanfare")]
    pub output: PathBuf,

    /// Overwrite existing key files
    #[arg(long)]
    pub force: bool,
}

impl CommandExecutor for KeygenCommand {
    fn execute(&self) -> Result<()> {
        let pub_path = self.output.with_extension("pub");
        let key_path = self.output.with_extension("key");

        if !self.force && (pub_path.exists() || key_path.exists()) {
            bail!(
                "Key files already exist at {} / {}. Use --force to overwrite.",
                pub_path.display(),
                key_path.display()
            );
        }

        let keypair = KeyPair::generate();
        keypair
            .save_to_files(&self.output)
            .context("Failed to save key pair")?;

        println!("Key pair generated successfully:");
        println!();
        println!("  Public key:  {}", pub_path.display());
        println!("  Private key: {}", key_path.display());
        println!("  Fingerprint: {}", key_fingerprint(keypair.public_key()));
        println!();
        println!("Share your public key (.pub) with people who want to message you.");
        println!("They register it with: lanfare contacts add <your-name> {}", pub_path.display());
        println!();
        println!("Keep your private key (.key) secret and secure.");

        Ok(())
    }
}
