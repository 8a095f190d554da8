//! Send command - deliver a single message and exit.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use tokio::time::Instant;

use lanfare::chat::{bind_shared_socket, ChatError, ChatNode, NetConfig};

use super::run::{build_key_directory, load_identity};
use super::CommandExecutor;

/// How often to retry while waiting for the recipient to announce.
const RESOLVE_RETRY: Duration = Duration::from_millis(250);

/// Send one encrypted message to a peer, waiting for it to appear if needed.
#[derive(Args, Debug)]
pub struct SendCommand {
    /// Recipient username
    pub to: String,

    /// Message text
    pub message: String,

    /// Username announced to the network while sending
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

    /// Seconds to wait for the recipient's presence announcement
    #[arg(long, default_value = "10")]
    pub wait: u64,

    /// Assume every peer holds your own key pair instead of consulting
    /// the contact registry. Only useful for trying the tool out.
    #[arg(long)]
    pub loopback_keys: bool,
}

impl CommandExecutor for SendCommand {
    fn execute(&self) -> Result<()> {
        let rt = tokio::runtime::Runtime::new().context("Failed to create tokio runtime")?;
        rt.block_on(self.run())
    }
}

impl SendCommand {
    async fn run(&self) -> Result<()> {
        let mut config = NetConfig::load_or_default(self.config.as_deref())?;
        if let Some(port) = self.port {
            config.port = port;
        }

        let identity = load_identity(&self.username, &self.keys)?;
        let key_directory = build_key_directory(&identity, self.loopback_keys)?;
        let socket = bind_shared_socket(config.port).await?;
        let (node, _events) = ChatNode::start(identity, config, Arc::new(socket), key_directory);

        let outcome = self.send_with_wait(&node).await;
        node.shutdown().await;

        outcome?;
        println!("Message sent to {}.", self.to);
        Ok(())
    }

    /// Retries on "peer unknown" until the wait deadline passes. Any other
    /// failure is final.
    async fn send_with_wait(&self, node: &ChatNode) -> Result<()> {
        let deadline = Instant::now() + Duration::from_secs(self.wait);
        loop {
            match node.send(&self.to, &self.message).await {
                Ok(()) => return Ok(()),
                Err(ChatError::PeerUnknown(_)) if Instant::now() < deadline => {
                    tokio::time::sleep(RESOLVE_RETRY).await;
                }
                Err(err) => {
                    return Err(err).with_context(|| {
                        format!("Could not deliver the message to '{}'", self.to)
                    })
                }
            }
        }
    }
}
