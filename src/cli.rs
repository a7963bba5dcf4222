//! Command-line interface

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};

use crate::cache::SharedCache;

/// FlightDesk chat proxy - LLM answers for the flight tracker behind a similarity cache
#[derive(Parser, Debug)]
#[command(name = "flightdesk")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file (YAML)
    #[arg(short, long, env = "FLIGHTDESK_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Port to listen on
    #[arg(short, long, env = "FLIGHTDESK_PORT")]
    pub port: Option<u16>,

    /// Host to bind to
    #[arg(long, env = "FLIGHTDESK_HOST")]
    pub host: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(
        long,
        default_value = "info",
        env = "FLIGHTDESK_LOG_LEVEL",
        global = true
    )]
    pub log_level: String,

    /// Log format (text, json)
    #[arg(long, env = "FLIGHTDESK_LOG_FORMAT", global = true)]
    pub log_format: Option<String>,

    /// Subcommand (optional - defaults to server mode)
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the proxy server (default)
    Serve,

    /// Ask a single question from the terminal
    Ask {
        /// The question
        #[arg(required = true, trailing_var_arg = true)]
        question: Vec<String>,

        /// Cache file (defaults to cache.persist_path, then the user data dir)
        #[arg(long)]
        cache_file: Option<PathBuf>,
    },

    /// Inspect or reset the persisted response cache
    #[command(subcommand)]
    Cache(CacheCommand),
}

/// Cache subcommands
#[derive(Subcommand, Debug)]
pub enum CacheCommand {
    /// Show cache counters
    Stats {
        /// Cache file (defaults to cache.persist_path, then the user data dir)
        #[arg(long)]
        cache_file: Option<PathBuf>,
    },

    /// List cached questions, oldest insertion first
    List {
        /// Cache file (defaults to cache.persist_path, then the user data dir)
        #[arg(long)]
        cache_file: Option<PathBuf>,
    },

    /// Remove every cached entry
    Clear {
        /// Cache file (defaults to cache.persist_path, then the user data dir)
        #[arg(long)]
        cache_file: Option<PathBuf>,
    },
}

impl CacheCommand {
    /// Explicit cache file, if one was given
    #[must_use]
    pub fn cache_file(&self) -> Option<&PathBuf> {
        match self {
            Self::Stats { cache_file } | Self::List { cache_file } | Self::Clear { cache_file } => {
                cache_file.as_ref()
            }
        }
    }
}

/// Run a cache subcommand against `cache` and render its terminal output.
///
/// Expired entries are purged first, so counts and listings only show live
/// answers.
pub fn cache_report(cmd: &CacheCommand, cache: &SharedCache, path: &Path) -> String {
    let expired = cache.purge_expired();
    let mut out = String::new();

    match cmd {
        CacheCommand::Stats { .. } => {
            let Some(stats) = cache.stats() else {
                return "Response cache is disabled in configuration.\n".to_string();
            };
            let _ = writeln!(out, "Cache file: {}", path.display());
            let _ = writeln!(out, "Entries:    {}/{}", stats.entries, stats.max_size);
            let _ = writeln!(out, "TTL:        {}s", stats.ttl_ms / 1000);
            if expired > 0 {
                let _ = writeln!(out, "Expired:    {expired} (purged)");
            }
        }
        CacheCommand::List { .. } => {
            let entries = cache.snapshot();
            if entries.is_empty() {
                let _ = writeln!(out, "No cached answers in {}", path.display());
            } else {
                let _ = writeln!(
                    out,
                    "{} cached answer(s) in {}:\n",
                    entries.len(),
                    path.display()
                );
                for entry in entries {
                    let when = DateTime::<Utc>::from_timestamp_millis(entry.timestamp)
                        .map_or_else(|| entry.timestamp.to_string(), |t| t.to_rfc3339());
                    let _ = writeln!(out, "  [{when}] {}", entry.question);
                }
            }
        }
        CacheCommand::Clear { .. } => {
            let dropped = cache.len();
            cache.clear();
            let _ = writeln!(
                out,
                "✅ Removed {dropped} cached answer(s) from {}",
                path.display()
            );
        }
    }

    out
}
