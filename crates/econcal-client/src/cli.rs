//! Command-line interface definition.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use econcal_core::SourceKind;

/// econcal - economic calendar to Discord scheduled events
#[derive(Debug, Parser)]
#[command(name = "econcal")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, short, env = "ECONCAL_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, short = 'v', global = true)]
    pub debug: bool,

    /// Discord guild id (overrides [sync] guild_id)
    #[arg(long, env = "ECONCAL_GUILD_ID", global = true)]
    pub guild_id: Option<String>,

    /// Calendar source: finnhub, scraped-html, json-feed or rss
    #[arg(long, global = true)]
    pub source: Option<SourceKind>,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the sync daemon in the foreground
    Run,

    /// Run a single sync cycle and exit
    Sync {
        /// Print the planned creates without touching the store
        #[arg(long)]
        dry_run: bool,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Configuration commands
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Configuration subcommands.
#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Print the effective configuration (secrets masked)
    Dump,
    /// Validate the configuration and resolve secrets
    Validate,
    /// Show the configuration file path
    Path,
}
