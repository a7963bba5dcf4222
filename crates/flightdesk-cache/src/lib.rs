//! Similarity response cache for the FlightDesk chat assistant
//!
//! Stores previous question/answer pairs and serves a stored answer when a new
//! question is "similar enough" to one already seen. Entries are bounded both
//! by age (lazy TTL purge on every read) and by count (oldest-first eviction
//! on every write).
//!
//! Everything the cache touches outside its own memory is injected:
//!
//! - [`Clock`]: the source of "now" ([`SystemClock`], [`ManualClock`])
//! - [`CacheStorage`]: where the serialized entry map lives
//!   ([`MemoryStorage`], [`FileStorage`], [`NullStorage`])
//! - [`QueryMatcher`]: the similarity predicate ([`SubstringMatcher`])
//!
//! # Example
//!
//! ```rust
//! use flightdesk_cache::SimilarityCache;
//!
//! let mut cache = SimilarityCache::default();
//! cache.set("flight", "R1");
//! assert_eq!(cache.get("What is my flight status").as_deref(), Some("R1"));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod cache;
mod clock;
mod entry;
mod matcher;
mod storage;

pub use cache::{SimilarityCache, DEFAULT_MAX_SIZE, DEFAULT_TTL};
pub use clock::{Clock, ManualClock, SystemClock};
pub use entry::{CacheEntry, CacheStats};
pub use matcher::{normalize, QueryMatcher, SubstringMatcher};
pub use storage::{CacheStorage, FileStorage, MemoryStorage, NullStorage, StorageError};
