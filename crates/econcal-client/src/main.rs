//! econcal CLI entry point.

use std::path::Path;
use std::process::ExitCode;

use clap::Parser;
use econcal_core::{TracingConfig, init_tracing};

use econcal_client::cli::{Cli, Command, ConfigAction};
use econcal_client::commands;
use econcal_client::config::ClientConfig;
use econcal_client::error::{ClientError, ClientResult};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let tracing_config = match cli.command {
        Command::Run if !config.debug => TracingConfig::daemon(),
        Command::Run => TracingConfig::daemon().with_level(tracing::Level::DEBUG),
        _ => TracingConfig::cli(config.debug),
    };
    if let Err(e) = init_tracing(tracing_config) {
        eprintln!("error: {}", e);
        return ExitCode::FAILURE;
    }

    let config_path = cli.config.clone().unwrap_or_else(ClientConfig::default_path);
    match run(cli.command, &config, &config_path).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Loads the config file and applies command-line overrides.
fn load_config(cli: &Cli) -> ClientResult<ClientConfig> {
    let mut config = match cli.config {
        Some(ref path) => ClientConfig::load_from(path),
        None => ClientConfig::load(),
    }
    .map_err(ClientError::Config)?;

    config.debug |= cli.debug;
    if let Some(ref guild_id) = cli.guild_id {
        config.sync.guild_id = Some(guild_id.clone());
    }
    if let Some(kind) = cli.source {
        config.source.kind = kind;
    }
    Ok(config)
}

async fn run(command: Command, config: &ClientConfig, config_path: &Path) -> ClientResult<()> {
    match command {
        Command::Run => commands::run::run(config).await,
        Command::Sync { dry_run: true, json } => commands::sync::dry_run(config, json).await,
        Command::Sync { dry_run: false, json } => commands::sync::once(config, json).await,
        Command::Config { action } => match action {
            ConfigAction::Dump => commands::config::dump(config, config_path),
            ConfigAction::Validate => commands::config::validate(config),
            ConfigAction::Path => commands::config::path(config_path),
        },
    }
}
