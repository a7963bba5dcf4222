//! FlightDesk chat proxy
//!
//! Backend for the chat assistant on the FlightDesk flight-tracking site.
//! Browser questions are answered, in order of preference, from:
//!
//! - **Similarity cache**: a previous answer to an overlapping question
//! - **Canned answers**: keyword-triggered replies for frequent topics
//! - **Upstream LLM**: an OpenAI-compatible chat completion API
//! - **Fallbacks**: canned answers again, then a fixed apology
//!
//! The cache itself lives in the `flightdesk-cache` crate.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cache;
pub mod canned;
pub mod chat;
pub mod cli;
pub mod config;
pub mod error;
pub mod failsafe;
pub mod gateway;
pub mod protocol;
pub mod provider;

pub use error::{Error, Result};

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Setup tracing/logging
///
/// `RUST_LOG` takes precedence over `level` when set.
pub fn setup_tracing(level: &str, format: Option<&str>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::registry().with(filter);

    let result = match format {
        Some("json") => subscriber.with(fmt::layer().json()).try_init(),
        _ => subscriber.with(fmt::layer()).try_init(),
    };

    result.map_err(|e| Error::Internal(format!("Failed to install tracing subscriber: {e}")))
}
