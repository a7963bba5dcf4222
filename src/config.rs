//! Configuration management

use std::{env, path::Path, path::PathBuf, time::Duration};

use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::canned::{CannedRule, default_rules};
use crate::{Error, Result};

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Config {
    /// Environment files to load before processing config.
    /// Paths support ~ expansion. Loaded in order, later files override earlier.
    #[serde(default)]
    pub env_files: Vec<String>,
    /// Server configuration
    pub server: ServerConfig,
    /// Upstream chat completion provider
    pub upstream: UpstreamConfig,
    /// Response cache configuration
    pub cache: CacheConfig,
    /// Retry configuration for upstream calls
    pub retry: RetryConfig,
    /// Keyword-triggered canned answers
    pub canned: CannedConfig,
}

impl Config {
    /// Load configuration from file and environment
    ///
    /// # Errors
    ///
    /// Returns an error if the config file does not exist or cannot be parsed.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::new();

        if let Some(p) = path {
            if !p.exists() {
                return Err(Error::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            figment = figment.merge(Yaml::file(p));
        }

        // FLIGHTDESK_UPSTREAM__MODEL=... -> upstream.model
        figment = figment.merge(Env::prefixed("FLIGHTDESK_").split("__"));

        let mut config: Self = figment
            .extract()
            .map_err(|e| Error::Config(e.to_string()))?;

        config.load_env_files();
        config.expand_env_vars();

        Ok(config)
    }

    /// Load environment files into the process environment.
    /// Files that don't exist are silently skipped.
    fn load_env_files(&self) {
        for path_str in &self.env_files {
            let expanded = expand_home(path_str);
            let path = Path::new(&expanded);
            if path.exists() {
                match dotenvy::from_path(path) {
                    Ok(()) => tracing::info!("Loaded env file: {expanded}"),
                    Err(e) => tracing::warn!("Failed to load env file {expanded}: {e}"),
                }
            } else {
                tracing::debug!("Env file not found (skipped): {expanded}");
            }
        }
    }

    /// Expand ${VAR} and ${VAR:-default} patterns in config values
    fn expand_env_vars(&mut self) {
        let Ok(re) = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)(?::-([^}]*))?\}") else {
            return;
        };

        self.upstream.base_url = Self::expand_string(&re, &self.upstream.base_url);
        self.upstream.model = Self::expand_string(&re, &self.upstream.model);
        if let Some(path) = self.cache.persist_path.as_mut() {
            *path = Self::expand_string(&re, path);
        }
    }

    fn expand_string(re: &Regex, value: &str) -> String {
        re.replace_all(value, |caps: &regex::Captures| {
            let var_name = &caps[1];
            let default = caps.get(2).map_or("", |m| m.as_str());
            env::var(var_name).unwrap_or_else(|_| default.to_string())
        })
        .into_owned()
    }
}

fn expand_home(path: &str) -> String {
    if path.starts_with('~') {
        if let Some(home) = dirs::home_dir() {
            return path.replacen('~', &home.display().to_string(), 1);
        }
    }
    path.to_string()
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Maximum request body size (bytes)
    pub max_body_size: usize,
    /// Origins allowed to call the API from a browser (`*` = any)
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8787,
            max_body_size: 256 * 1024,
            cors_origins: vec!["*".to_string()],
        }
    }
}

/// Upstream chat completion provider (OpenAI-compatible API)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// API base URL, `/chat/completions` is appended
    pub base_url: String,
    /// Model identifier
    pub model: String,
    /// Bearer token: literal value or `env:VAR_NAME`
    pub api_key: Option<String>,
    /// System instruction sent ahead of the conversation
    pub system_prompt: String,
    /// Sampling temperature
    pub temperature: f32,
    /// Completion length limit
    pub max_tokens: u32,
    /// Most recent conversation turns forwarded upstream
    pub max_history: usize,
    /// Per-request timeout
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
    /// Reply used when upstream fails and no canned answer applies
    pub apology: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key: Some("env:OPENAI_API_KEY".to_string()),
            system_prompt: "You are FlightDesk, a friendly assistant on a flight-tracking website. \
                Help travellers with flight status, delays, airports, baggage and weather at \
                their destination. Keep answers short and say so when you do not know."
                .to_string(),
            temperature: 0.7,
            max_tokens: 500,
            max_history: 10,
            timeout: Duration::from_secs(30),
            apology: "Sorry, I'm having trouble answering right now. Please try again in a \
                moment."
                .to_string(),
        }
    }
}

impl UpstreamConfig {
    /// Resolve the API key (expand `env:` references)
    #[must_use]
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key.as_ref().and_then(|key| {
            if let Some(var_name) = key.strip_prefix("env:") {
                env::var(var_name).ok()
            } else {
                Some(key.clone())
            }
        })
    }
}

/// Response cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Enable response caching
    pub enabled: bool,
    /// Maximum number of entries before eviction
    pub max_entries: usize,
    /// Entry time-to-live
    #[serde(with = "humantime_serde")]
    pub ttl: Duration,
    /// JSON file the server persists to (in-memory only when unset).
    /// The CLI always persists, falling back to [`CacheConfig::default_persist_path`].
    pub persist_path: Option<String>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_entries: flightdesk_cache::DEFAULT_MAX_SIZE,
            ttl: flightdesk_cache::DEFAULT_TTL,
            persist_path: None,
        }
    }
}

impl CacheConfig {
    /// Configured persist path with `~` expanded
    #[must_use]
    pub fn persist_path(&self) -> Option<PathBuf> {
        self.persist_path
            .as_deref()
            .map(|p| PathBuf::from(expand_home(p)))
    }

    /// Per-user cache file used by the CLI
    #[must_use]
    pub fn default_persist_path() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("flightdesk")
            .join("chat-cache.json")
    }
}

/// Retry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Enable retries
    pub enabled: bool,
    /// Maximum attempts (first call included)
    pub max_attempts: u32,
    /// Initial backoff duration
    #[serde(with = "humantime_serde")]
    pub initial_backoff: Duration,
    /// Maximum backoff duration
    #[serde(with = "humantime_serde")]
    pub max_backoff: Duration,
    /// Backoff multiplier
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_attempts: 2,
            initial_backoff: Duration::from_millis(250),
            max_backoff: Duration::from_secs(2),
            multiplier: 2.0,
        }
    }
}

/// Canned answer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CannedConfig {
    /// Enable keyword-triggered answers
    pub enabled: bool,
    /// Rules in priority order (replaces the built-in set when given)
    pub rules: Vec<CannedRule>,
}

impl Default for CannedConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            rules: default_rules(),
        }
    }
}

/// Custom humantime serde module for Duration
pub mod humantime_serde {
    use std::time::Duration;

    use serde::{self, Deserialize, Deserializer, Serializer};

    /// Serialize Duration to a human-readable string (`"250ms"` or `"30s"`)
    ///
    /// # Errors
    ///
    /// Returns a serialization error if the serializer fails.
    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if duration.subsec_millis() == 0 {
            serializer.serialize_str(&format!("{}s", duration.as_secs()))
        } else {
            serializer.serialize_str(&format!("{}ms", duration.as_millis()))
        }
    }

    /// Deserialize human-readable duration string (`"100ms"`, `"30s"`, `"5m"`, `"24h"`)
    ///
    /// # Errors
    ///
    /// Returns a deserialization error if the string cannot be parsed as a duration.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse(s.trim()).map_err(serde::de::Error::custom)
    }

    /// Parse a duration string; a bare number is seconds
    ///
    /// # Errors
    ///
    /// Returns an error message if the number part is not an integer.
    pub fn parse(s: &str) -> Result<Duration, String> {
        let number = |n: &str| n.trim().parse::<u64>().map_err(|e| format!("{s:?}: {e}"));

        // "ms" must be tried before "m" and "s"
        if let Some(ms) = s.strip_suffix("ms") {
            number(ms).map(Duration::from_millis)
        } else if let Some(secs) = s.strip_suffix('s') {
            number(secs).map(Duration::from_secs)
        } else if let Some(mins) = s.strip_suffix('m') {
            number(mins).map(|m| Duration::from_secs(m * 60))
        } else if let Some(hours) = s.strip_suffix('h') {
            number(hours).map(|h| Duration::from_secs(h * 3600))
        } else {
            number(s).map(Duration::from_secs)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.server.port, 8787);
        assert_eq!(config.cache.max_entries, 50);
        assert_eq!(config.cache.ttl, Duration::from_secs(86_400));
        assert!(config.cache.persist_path.is_none());
        assert!(!config.canned.rules.is_empty());
    }

    #[test]
    fn test_duration_parsing() {
        assert_eq!(humantime_serde::parse("100ms"), Ok(Duration::from_millis(100)));
        assert_eq!(humantime_serde::parse("30s"), Ok(Duration::from_secs(30)));
        assert_eq!(humantime_serde::parse("5m"), Ok(Duration::from_secs(300)));
        assert_eq!(humantime_serde::parse("24h"), Ok(Duration::from_secs(86_400)));
        assert_eq!(humantime_serde::parse("7"), Ok(Duration::from_secs(7)));
        assert!(humantime_serde::parse("soon").is_err());
    }

    #[test]
    fn test_yaml_sections() {
        let yaml = r#"
server:
  port: 9000
  cors_origins: ["https://flights.example.com"]
upstream:
  model: "gpt-4.1-mini"
  api_key: "sk-literal"
  timeout: "15s"
cache:
  max_entries: 10
  ttl: "2h"
  persist_path: "/tmp/flightdesk-cache.json"
retry:
  initial_backoff: "50ms"
canned:
  rules:
    - keywords: ["lounge"]
      response: "Lounges are airside."
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.upstream.model, "gpt-4.1-mini");
        assert_eq!(config.upstream.timeout, Duration::from_secs(15));
        assert_eq!(config.upstream.resolve_api_key().as_deref(), Some("sk-literal"));
        assert_eq!(config.cache.max_entries, 10);
        assert_eq!(config.cache.ttl, Duration::from_secs(7200));
        assert_eq!(config.retry.initial_backoff, Duration::from_millis(50));
        assert_eq!(config.canned.rules.len(), 1);
        assert!(config.canned.enabled);
    }

    #[test]
    fn test_missing_env_api_key_resolves_to_none() {
        let upstream = UpstreamConfig {
            api_key: Some("env:FLIGHTDESK_TEST_SURELY_UNSET_KEY".to_string()),
            ..UpstreamConfig::default()
        };
        assert!(upstream.resolve_api_key().is_none());
    }

    #[test]
    fn test_load_missing_file_is_error() {
        let err = Config::load(Some(Path::new("/nonexistent/flightdesk.yaml"))).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flightdesk.yaml");
        std::fs::write(&path, "cache:\n  max_entries: 3\n").unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.cache.max_entries, 3);
    }

    #[test]
    fn test_env_file_feeds_placeholder_expansion() {
        let dir = tempfile::tempdir().unwrap();
        let env_path = dir.path().join("test.env");
        let mut f = std::fs::File::create(&env_path).unwrap();
        writeln!(f, "FLIGHTDESK_TEST_MODEL_NAME=llama-3-70b").unwrap();
        drop(f);

        let mut config = Config {
            env_files: vec![env_path.to_string_lossy().to_string()],
            ..Default::default()
        };
        config.upstream.model = "${FLIGHTDESK_TEST_MODEL_NAME:-fallback}".to_string();
        config.upstream.base_url = "${FLIGHTDESK_TEST_UNSET_URL:-http://localhost:11434/v1}".to_string();
        config.load_env_files();
        config.expand_env_vars();

        assert_eq!(config.upstream.model, "llama-3-70b");
        assert_eq!(config.upstream.base_url, "http://localhost:11434/v1");
    }

    #[test]
    fn test_load_env_files_skips_missing() {
        let config = Config {
            env_files: vec!["/nonexistent/path/.env".to_string()],
            ..Default::default()
        };
        config.load_env_files();
    }
}
