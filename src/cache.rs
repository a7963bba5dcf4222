//! Shared handle to the similarity response cache
//!
//! The server keeps one cache for every request handler. Access goes through
//! a short, synchronous critical section: the lock is taken for a single
//! `get` or `set` and released before any `.await`.
//!
//! A file-backed cache writes to disk on every hit and every store, so the
//! async [`SharedCache::lookup`] and [`SharedCache::store`] run those calls on
//! the blocking pool.

use std::path::Path;
use std::sync::Arc;

use flightdesk_cache::{CacheEntry, CacheStats, FileStorage, SimilarityCache};
use parking_lot::Mutex;
use tracing::{info, warn};

use crate::config::CacheConfig;

/// Cloneable, optionally disabled similarity cache
#[derive(Clone, Default)]
pub struct SharedCache {
    inner: Option<Arc<Mutex<SimilarityCache>>>,
    /// Mutations touch the filesystem
    file_backed: bool,
}

impl SharedCache {
    /// Wrap an existing cache
    #[must_use]
    pub fn new(cache: SimilarityCache) -> Self {
        Self {
            inner: Some(Arc::new(Mutex::new(cache))),
            file_backed: false,
        }
    }

    /// A cache that never stores anything
    #[must_use]
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Build from configuration, persisting to `cache.persist_path` if set
    #[must_use]
    pub fn from_config(config: &CacheConfig) -> Self {
        if !config.enabled {
            info!("Response cache disabled");
            return Self::disabled();
        }
        match config.persist_path() {
            Some(path) => Self::persistent(config, &path),
            None => {
                info!(
                    max_entries = config.max_entries,
                    ttl_secs = config.ttl.as_secs(),
                    "Response cache in memory"
                );
                Self::new(SimilarityCache::new(config.max_entries, config.ttl))
            }
        }
    }

    /// Build a cache persisted to `path`, regardless of `persist_path`
    #[must_use]
    pub fn persistent(config: &CacheConfig, path: &Path) -> Self {
        if !config.enabled {
            return Self::disabled();
        }
        let cache = SimilarityCache::new(config.max_entries, config.ttl)
            .with_storage(FileStorage::new(path));
        info!(
            path = %path.display(),
            entries = cache.len(),
            max_entries = config.max_entries,
            "Response cache loaded"
        );
        Self {
            file_backed: true,
            ..Self::new(cache)
        }
    }

    /// Whether caching is active
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.inner.is_some()
    }

    /// Whether mutations are written to a file
    #[must_use]
    pub fn is_file_backed(&self) -> bool {
        self.file_backed
    }

    /// [`SharedCache::get`] for async callers
    pub async fn lookup(&self, query: &str) -> Option<String> {
        if !self.file_backed {
            return self.get(query);
        }
        let cache = self.clone();
        let query = query.to_string();
        tokio::task::spawn_blocking(move || cache.get(&query))
            .await
            .unwrap_or_else(|e| {
                warn!(error = %e, "Cache lookup task failed");
                None
            })
    }

    /// [`SharedCache::set`] for async callers
    pub async fn store(&self, query: &str, response: &str) {
        if !self.file_backed {
            self.set(query, response);
            return;
        }
        let cache = self.clone();
        let query = query.to_string();
        let response = response.to_string();
        if let Err(e) = tokio::task::spawn_blocking(move || cache.set(&query, &response)).await {
            warn!(error = %e, "Cache store task failed");
        }
    }

    /// Look up a similar question
    pub fn get(&self, query: &str) -> Option<String> {
        self.inner.as_ref().and_then(|cache| cache.lock().get(query))
    }

    /// Store an answer
    pub fn set(&self, query: &str, response: &str) {
        if let Some(cache) = &self.inner {
            cache.lock().set(query, response);
        }
    }

    /// Drop every entry
    pub fn clear(&self) {
        if let Some(cache) = &self.inner {
            cache.lock().clear();
        }
    }

    /// Remove expired entries, returning how many were dropped
    pub fn purge_expired(&self) -> usize {
        self.inner
            .as_ref()
            .map_or(0, |cache| cache.lock().purge_expired())
    }

    /// Number of stored entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.as_ref().map_or(0, |cache| cache.lock().len())
    }

    /// `true` when nothing is stored
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Counter snapshot, `None` when disabled
    #[must_use]
    pub fn stats(&self) -> Option<CacheStats> {
        self.inner.as_ref().map(|cache| cache.lock().stats())
    }

    /// Copy of the stored entries in scan order
    #[must_use]
    pub fn snapshot(&self) -> Vec<CacheEntry> {
        self.inner
            .as_ref()
            .map(|cache| cache.lock().entries().cloned().collect())
            .unwrap_or_default()
    }
}
