//! FlightDesk chat proxy
//!
//! Serves the flight tracker's chat assistant, or answers one question from
//! the terminal.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};

use flightdesk::{
    cache::SharedCache,
    chat::ChatService,
    cli::{CacheCommand, Cli, Command, cache_report},
    config::{CacheConfig, Config},
    gateway::Gateway,
    provider::OpenAiCompatibleProvider,
    setup_tracing,
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = setup_tracing(&cli.log_level, cli.log_format.as_deref()) {
        eprintln!("Failed to setup tracing: {e}");
        return ExitCode::FAILURE;
    }

    let mut config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    match cli.command {
        Some(Command::Ask {
            question,
            cache_file,
        }) => run_ask(&config, &question.join(" "), cache_file).await,
        Some(Command::Cache(cmd)) => run_cache_command(&config.cache, &cmd),
        Some(Command::Serve) | None => {
            if let Some(port) = cli.port {
                config.server.port = port;
            }
            if let Some(host) = cli.host {
                config.server.host = host;
            }
            run_server(config).await
        }
    }
}

/// Cache file used by terminal commands
fn cli_cache_path(config: &CacheConfig, explicit: Option<PathBuf>) -> PathBuf {
    explicit
        .or_else(|| config.persist_path())
        .unwrap_or_else(CacheConfig::default_persist_path)
}

/// Answer one question through the same dispatch path as the server
async fn run_ask(config: &Config, question: &str, cache_file: Option<PathBuf>) -> ExitCode {
    let provider = match OpenAiCompatibleProvider::new(&config.upstream) {
        Ok(p) => Arc::new(p),
        Err(e) => {
            eprintln!("❌ {e}");
            return ExitCode::FAILURE;
        }
    };

    let path = cli_cache_path(&config.cache, cache_file);
    let cache = SharedCache::persistent(&config.cache, &path);
    let chat = ChatService::from_config(config, cache, provider);

    let reply = chat
        .reply(&[flightdesk::protocol::ChatMessage::user(question)])
        .await;
    println!("{}", reply.response);
    info!(source = ?reply.source, "Answered");
    ExitCode::SUCCESS
}

/// Inspect or reset the persisted cache
fn run_cache_command(config: &CacheConfig, cmd: &CacheCommand) -> ExitCode {
    let path = cli_cache_path(config, cmd.cache_file().cloned());
    let cache = SharedCache::persistent(config, &path);
    print!("{}", cache_report(cmd, &cache, &path));
    ExitCode::SUCCESS
}

/// Run the proxy server
async fn run_server(config: Config) -> ExitCode {
    info!(
        version = env!("CARGO_PKG_VERSION"),
        port = config.server.port,
        cache = config.cache.enabled,
        "Starting FlightDesk chat proxy"
    );

    let gateway = match Gateway::new(config) {
        Ok(g) => g,
        Err(e) => {
            error!("Failed to create gateway: {e}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = gateway.run().await {
        error!("Gateway error: {e}");
        return ExitCode::FAILURE;
    }

    info!("Gateway shutdown complete");
    ExitCode::SUCCESS
}
