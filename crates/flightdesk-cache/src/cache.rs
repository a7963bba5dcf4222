//! The similarity cache itself

use std::time::Duration;

use indexmap::IndexMap;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::clock::{Clock, SystemClock};
use crate::entry::{CacheEntry, CacheStats};
use crate::matcher::{normalize, QueryMatcher, SubstringMatcher};
use crate::storage::{CacheStorage, NullStorage};

/// Default capacity
pub const DEFAULT_MAX_SIZE: usize = 50;

/// Default time-to-live (24 hours)
pub const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Bounded question/answer cache with similarity lookup.
///
/// Not internally synchronized: callers that share it across tasks wrap it in
/// a mutex and must not hold the lock across an `.await`.
pub struct SimilarityCache {
    /// Entries in insertion order, keyed by generated key
    entries: IndexMap<String, CacheEntry>,
    max_size: usize,
    ttl: Duration,
    clock: Box<dyn Clock>,
    storage: Box<dyn CacheStorage>,
    matcher: Box<dyn QueryMatcher>,
    hits: u64,
    misses: u64,
    expired: u64,
    evicted: u64,
}

impl SimilarityCache {
    /// Create an empty in-memory cache.
    ///
    /// `max_size` is clamped to at least 1.
    #[must_use]
    pub fn new(max_size: usize, ttl: Duration) -> Self {
        Self {
            entries: IndexMap::new(),
            max_size: max_size.max(1),
            ttl,
            clock: Box::new(SystemClock),
            storage: Box::new(NullStorage),
            matcher: Box::new(SubstringMatcher),
            hits: 0,
            misses: 0,
            expired: 0,
            evicted: 0,
        }
    }

    /// Replace the time source
    #[must_use]
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Replace the similarity predicate
    #[must_use]
    pub fn with_matcher(mut self, matcher: impl QueryMatcher + 'static) -> Self {
        self.matcher = Box::new(matcher);
        self
    }

    /// Attach durable storage and load whatever it holds.
    ///
    /// Unreadable or corrupt contents are logged and the cache starts empty.
    #[must_use]
    pub fn with_storage(mut self, storage: impl CacheStorage + 'static) -> Self {
        self.storage = Box::new(storage);
        self.entries = self.load();
        let trimmed = self.enforce_capacity();
        if trimmed > 0 {
            debug!(evicted = trimmed, "Trimmed loaded cache to capacity");
        }
        self
    }

    /// Look up an answer for `query`.
    ///
    /// Expired entries are purged first. The first live entry (in insertion
    /// order) whose question matches wins; its timestamp is refreshed.
    pub fn get(&mut self, query: &str) -> Option<String> {
        let now = self.clock.now_millis();
        let purged = self.purge_at(now);

        let needle = normalize(query);
        let matcher = &self.matcher;
        let found = self
            .entries
            .values_mut()
            .find(|entry| matcher.matches(&normalize(&entry.question), &needle));

        let result = found.map(|entry| {
            entry.timestamp = now;
            entry.response.clone()
        });

        if result.is_some() {
            self.hits += 1;
        } else {
            self.misses += 1;
        }

        if result.is_some() || purged > 0 {
            self.persist();
        }

        result
    }

    /// Store a new answer.
    ///
    /// Always inserts under a fresh key, even when a similar question is
    /// already cached, then evicts the oldest entries beyond capacity.
    pub fn set(&mut self, query: &str, response: &str) {
        let key = self.fresh_key();
        let entry = CacheEntry {
            key: key.clone(),
            question: query.trim().to_string(),
            response: response.to_string(),
            timestamp: self.clock.now_millis(),
        };
        self.entries.insert(key, entry);

        let evicted = self.enforce_capacity();
        if evicted > 0 {
            debug!(evicted, size = self.entries.len(), "Evicted oldest cache entries");
        }

        self.persist();
    }

    /// Remove expired entries now, returning how many were dropped
    pub fn purge_expired(&mut self) -> usize {
        let now = self.clock.now_millis();
        let purged = self.purge_at(now);
        if purged > 0 {
            self.persist();
        }
        purged
    }

    /// Drop every entry
    pub fn clear(&mut self) {
        self.entries.clear();
        self.persist();
    }

    /// Number of stored entries (expired ones included until the next purge)
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` when nothing is stored
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Stored entries in scan order
    pub fn entries(&self) -> impl Iterator<Item = &CacheEntry> {
        self.entries.values()
    }

    /// Capacity
    #[must_use]
    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Time-to-live
    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Snapshot of counters
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn stats(&self) -> CacheStats {
        let lookups = self.hits + self.misses;
        CacheStats {
            entries: self.entries.len(),
            max_size: self.max_size,
            ttl_ms: u64::try_from(self.ttl.as_millis()).unwrap_or(u64::MAX),
            hits: self.hits,
            misses: self.misses,
            expired: self.expired,
            evicted: self.evicted,
            hit_rate: if lookups == 0 {
                0.0
            } else {
                self.hits as f64 / lookups as f64
            },
        }
    }

    fn ttl_millis(&self) -> i64 {
        i64::try_from(self.ttl.as_millis()).unwrap_or(i64::MAX)
    }

    fn purge_at(&mut self, now: i64) -> usize {
        let ttl = self.ttl_millis();
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now, ttl));
        let purged = before - self.entries.len();
        if purged > 0 {
            self.expired += purged as u64;
            debug!(purged, "Purged expired cache entries");
        }
        purged
    }

    /// Evict by ascending timestamp until at most `max_size` remain.
    /// Equal timestamps evict the earlier insertion first.
    fn enforce_capacity(&mut self) -> usize {
        let excess = self.entries.len().saturating_sub(self.max_size);
        if excess == 0 {
            return 0;
        }

        let mut by_age: Vec<(i64, &String)> = self
            .entries
            .values()
            .map(|entry| (entry.timestamp, &entry.key))
            .collect();
        by_age.sort_by_key(|(timestamp, _)| *timestamp);

        let victims: Vec<String> = by_age
            .into_iter()
            .take(excess)
            .map(|(_, key)| key.clone())
            .collect();

        for key in &victims {
            self.entries.shift_remove(key);
        }
        self.evicted += excess as u64;
        excess
    }

    fn fresh_key(&self) -> String {
        loop {
            let key = Uuid::new_v4().to_string();
            if !self.entries.contains_key(&key) {
                return key;
            }
        }
    }

    fn load(&self) -> IndexMap<String, CacheEntry> {
        let bytes = match self.storage.load() {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return IndexMap::new(),
            Err(e) => {
                warn!(error = %e, "Failed to read response cache, starting empty");
                return IndexMap::new();
            }
        };

        match serde_json::from_slice::<IndexMap<String, CacheEntry>>(&bytes) {
            Ok(mut entries) => {
                // The map key is authoritative
                for (key, entry) in &mut entries {
                    entry.key.clone_from(key);
                }
                debug!(entries = entries.len(), "Loaded response cache");
                entries
            }
            Err(e) => {
                warn!(error = %e, "Response cache is corrupt, starting empty");
                IndexMap::new()
            }
        }
    }

    fn persist(&self) {
        let bytes = match serde_json::to_vec(&self.entries) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(error = %e, "Failed to serialize response cache");
                return;
            }
        };
        if let Err(e) = self.storage.save(&bytes) {
            warn!(error = %e, "Failed to save response cache");
        }
    }
}

impl Default for SimilarityCache {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_SIZE, DEFAULT_TTL)
    }
}

impl std::fmt::Debug for SimilarityCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimilarityCache")
            .field("entries", &self.entries.len())
            .field("max_size", &self.max_size)
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}
