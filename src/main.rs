//! Lanfare - encrypted peer-to-peer chat for the local network.
//!
//! Peers discover each other through UDP presence broadcasts and exchange
//! end-to-end encrypted messages, no server involved.

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

use commands::{CommandExecutor, ContactsCommand, KeygenCommand, RunCommand, SendCommand};

/// Lanfare - encrypted chat for the local network
///
/// Announce yourself with a username, see who else is around, and message
/// them directly. Message payloads are encrypted per peer; only public keys
/// are ever shared ahead of time.
#[derive(Parser)]
#[command(name = "lanfare")]
#[command(version)]
#[command(about = "Encrypted peer-to-peer chat over UDP on your local network")]
struct Cli {
    /// Verbose logging (debug level, overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a new key pair
    Keygen(KeygenCommand),

    /// Manage contacts and their public keys
    Contacts(ContactsCommand),

    /// Run the chat node interactively
    Run(RunCommand),

    /// Send a single message and exit
    Send(SendCommand),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so they never mix with chat output.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if cli.verbose { "debug" } else { "info" }));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Keygen(cmd) => cmd.execute(),
        Commands::Contacts(cmd) => cmd.execute(),
        Commands::Run(cmd) => cmd.execute(),
        Commands::Send(cmd) => cmd.execute(),
    }
}
