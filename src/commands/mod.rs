//! Command module - Strategy pattern for CLI commands.
//!
//! Each command is a separate module implementing the `CommandExecutor` trait.
//! This provides clean separation of concerns and makes adding new commands easy.

mod contacts;
mod keygen;
mod run;
mod send;

pub use contacts::ContactsCommand;
pub use keygen::KeygenCommand;
pub use run::RunCommand;
pub use send::SendCommand;

use anyhow::Result;

/// Trait for command execution - Strategy pattern.
///
/// Each command struct holds its parsed arguments and implements
/// this trait to define its execution logic.
pub trait CommandExecutor {
    /// Executes the command with its parsed arguments.
    fn execute(&self) -> Result<()>;
}
