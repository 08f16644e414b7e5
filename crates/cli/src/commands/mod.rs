//! Command implementations for the Shardline CLI

mod info;
mod recover;
mod split;

pub use info::InfoCommand;
pub use recover::RecoverCommand;
pub use split::SplitCommand;

use crate::config::Config;
use anyhow::Result;
use clap::Subcommand;

#[derive(Subcommand)]
pub enum Commands {
    /// Split a secret or file into pieces
    Split(SplitCommand),

    /// Recover a secret or file from pieces
    Recover(RecoverCommand),

    /// Display information about piece files
    Info(InfoCommand),
}

impl Commands {
    pub fn execute(&self, config: &Config) -> Result<()> {
        match self {
            Commands::Split(cmd) => cmd.execute(config),
            Commands::Recover(cmd) => cmd.execute(config),
            Commands::Info(cmd) => cmd.execute(config),
        }
    }
}
