//! Cache entry and statistics types

use serde::{Deserialize, Serialize};

/// A stored question/answer pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Unique key generated at insertion time
    pub key: String,
    /// Trimmed question text
    pub question: String,
    /// Stored answer
    pub response: String,
    /// Last write or last hit, epoch milliseconds
    pub timestamp: i64,
}

impl CacheEntry {
    /// Age of the entry at `now`
    #[must_use]
    pub fn age_millis(&self, now: i64) -> i64 {
        now.saturating_sub(self.timestamp)
    }

    /// An entry is expired once its age strictly exceeds the TTL
    #[must_use]
    pub fn is_expired(&self, now: i64, ttl_millis: i64) -> bool {
        self.age_millis(now) > ttl_millis
    }
}

/// Point-in-time view of cache counters
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CacheStats {
    /// Live entries
    pub entries: usize,
    /// Capacity
    pub max_size: usize,
    /// Time-to-live in milliseconds
    pub ttl_ms: u64,
    /// Lookups answered from the cache
    pub hits: u64,
    /// Lookups that found nothing
    pub misses: u64,
    /// Entries purged for age
    pub expired: u64,
    /// Entries evicted for capacity
    pub evicted: u64,
    /// Hit rate (0.0-1.0)
    pub hit_rate: f64,
}
