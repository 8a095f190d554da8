//! Run command - the interactive chat node.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::warn;

use lanfare::chat::{
    bind_shared_socket, ChatNode, Identity, KeyDirectory, LoopbackKeyDirectory, NetConfig,
};
use lanfare::contacts::{ContactsConfig, ContactsKeyDirectory};
use lanfare::crypto::KeyPair;

use super::CommandExecutor;

/// Run the chat node: announce presence, receive messages, send from stdin.
///
/// Type `@<peer> <message>` to send, `/peers` to list who is around,
/// `/quit` (or Ctrl+C) to leave.
#[derive(Args, Debug)]
pub struct RunCommand {
    /// Username announced to the network
    #[arg(short, long)]
    pub username: String,

    /// Base path of your key pair (reads <path>.pub and <path>.key)
    #[arg(short, long, default_value = "lanfare")]
    pub keys: PathBuf,

    /// Config file (defaults to <config dir>/lanfare/config.toml)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// UDP port override
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Assume every peer holds your own key pair instead of consulting
    /// the contact registry. Only useful for trying the tool out.
    #[arg(long)]
    pub loopback_keys: bool,
}

impl CommandExecutor for RunCommand {
    fn execute(&self) -> Result<()> {
        let rt = tokio::runtime::Runtime::new().context("Failed to create tokio runtime")?;
        rt.block_on(self.run())
    }
}

impl RunCommand {
    async fn run(&self) -> Result<()> {
        let mut config = NetConfig::load_or_default(self.config.as_deref())?;
        if let Some(port) = self.port {
            config.port = port;
        }

        let identity = load_identity(&self.username, &self.keys)?;
        let key_directory = build_key_directory(&identity, self.loopback_keys)?;
        let socket = bind_shared_socket(config.port).await?;
        let port = config.port;
        let (node, mut events) = ChatNode::start(identity, config, Arc::new(socket), key_directory);

        println!("lanfare running as '{}' on port {}", node.username(), port);
        println!("Type @<peer> <message> to send, /peers to list peers, /quit to exit.");

        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        loop {
            tokio::select! {
                event = events.recv() => {
                    match event {
                        Some(event) => println!("[{}] {}", event.sender, event.text),
                        None => break,
                    }
                }
                line = lines.next_line() => {
                    match line.context("Failed to read from stdin")? {
                        Some(line) => {
                            if !handle_line(&node, &line).await {
                                break;
                            }
                        }
                        // stdin closed
                        None => break,
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    println!();
                    break;
                }
            }
        }

        node.shutdown().await;
        Ok(())
    }
}

/// Loads the identity key pair, or generates one for this session when no
/// key files exist at the given base path.
pub(super) fn load_identity(username: &str, keys: &Path) -> Result<Identity> {
    let keypair = if keys.with_extension("key").exists() {
        KeyPair::load_from_files(keys)
            .with_context(|| format!("Failed to load key pair from {}", keys.display()))?
    } else {
        warn!(
            path = %keys.display(),
            "no key files found, generating a keypair for this session only"
        );
        KeyPair::generate()
    };
    Ok(Identity::with_keys(username, keypair)?)
}

/// Picks the key lookup backend for the node.
pub(super) fn build_key_directory(
    identity: &Identity,
    loopback: bool,
) -> Result<Arc<dyn KeyDirectory>> {
    if loopback {
        warn!("loopback key mode: every peer is assumed to hold your own key pair");
        return Ok(Arc::new(LoopbackKeyDirectory::new(*identity.public_key())));
    }
    let contacts = ContactsConfig::load().context("Failed to load contacts")?;
    Ok(Arc::new(ContactsKeyDirectory::new(&contacts)))
}

/// What a line of input asks for.
#[derive(Debug, PartialEq, Eq)]
enum LineAction<'a> {
    Nothing,
    Quit,
    ListPeers,
    Send { peer: &'a str, text: &'a str },
    Help,
}

fn parse_line(line: &str) -> LineAction<'_> {
    let line = line.trim();
    if line.is_empty() {
        return LineAction::Nothing;
    }
    match line {
        "/quit" | "/q" => return LineAction::Quit,
        "/peers" => return LineAction::ListPeers,
        _ => {}
    }
    if let Some(rest) = line.strip_prefix('@') {
        if let Some((peer, text)) = rest.split_once(char::is_whitespace) {
            let text = text.trim();
            if !peer.is_empty() && !text.is_empty() {
                return LineAction::Send { peer, text };
            }
        }
    }
    LineAction::Help
}

/// Handles one line of user input. Returns `false` to leave the loop.
async fn handle_line(node: &ChatNode, line: &str) -> bool {
    match parse_line(line) {
        LineAction::Nothing => {}
        LineAction::Quit => return false,
        LineAction::ListPeers => {
            let peers = node.peers().await;
            if peers.is_empty() {
                println!("No peers discovered yet.");
            }
            for peer in peers {
                println!("  {} ({})", peer.username, peer.addr);
            }
        }
        LineAction::Send { peer, text } => {
            if let Err(err) = node.send(peer, text).await {
                eprintln!("error: {}", err);
            }
        }
        LineAction::Help => {
            eprintln!("Unrecognized input. Use @<peer> <message>, /peers or /quit.");
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_send_line() {
        assert_eq!(
            parse_line("@bob see you at 5"),
            LineAction::Send {
                peer: "bob",
                text: "see you at 5"
            }
        );
        assert_eq!(
            parse_line("  @bob   padded  "),
            LineAction::Send {
                peer: "bob",
                text: "padded"
            }
        );
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(parse_line("/quit"), LineAction::Quit);
        assert_eq!(parse_line("/q"), LineAction::Quit);
        assert_eq!(parse_line("/peers"), LineAction::ListPeers);
        assert_eq!(parse_line(""), LineAction::Nothing);
        assert_eq!(parse_line("   "), LineAction::Nothing);
    }

    #[test]
    fn test_malformed_lines_ask_for_help() {
        assert_eq!(parse_line("hello"), LineAction::Help);
        assert_eq!(parse_line("@bob"), LineAction::Help);
        assert_eq!(parse_line("@bob   "), LineAction::Help);
        assert_eq!(parse_line("@ hi"), LineAction::Help);
    }
}
