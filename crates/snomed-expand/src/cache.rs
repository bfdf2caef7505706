//! Session-scoped cache of expansion results.
//!
//! Provides an LRU cache with optional TTL keyed by `(code, include_inactive)`.
//! The cache has a single owner: the orchestrator only reads and writes it from
//! the aggregating thread, so no interior locking is needed. Whether it lives
//! for one run or a whole session is the caller's decision.

use std::num::NonZeroUsize;
use std::time::Duration;

use chrono::{DateTime, Utc};
use lru::LruCache;

use crate::config::CacheConfig;
use crate::types::ExpansionResult;

/// Cache key: a code together with the include-inactive flag it was expanded with.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CacheKey {
    /// The expanded code.
    pub code: String,
    /// Whether inactive descendants were requested.
    pub include_inactive: bool,
}

impl CacheKey {
    /// Creates a cache key.
    pub fn new(code: impl Into<String>, include_inactive: bool) -> Self {
        Self {
            code: code.into(),
            include_inactive,
        }
    }
}

/// A cached expansion with its creation time.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CacheEntry {
    /// The cached result.
    pub result: ExpansionResult,
    /// When the result was stored.
    pub created_at: DateTime<Utc>,
}

impl CacheEntry {
    fn new(result: ExpansionResult) -> Self {
        Self {
            result,
            created_at: Utc::now(),
        }
    }

    fn is_expired(&self, ttl: Option<Duration>) -> bool {
        let Some(ttl) = ttl else {
            return false;
        };
        Utc::now()
            .signed_duration_since(self.created_at)
            .to_std()
            .map(|age| age > ttl)
            .unwrap_or(false)
    }
}

/// LRU cache of successful expansions.
///
/// # Example
///
/// ```rust
/// use snomed_expand::{ChildConcept, ExpansionCache, ExpansionResult};
///
/// let mut cache = ExpansionCache::default();
/// let result = ExpansionResult::success(
///     "73211009",
///     "Diabetes mellitus",
///     vec![ChildConcept::new("46635009", "Type 1 diabetes mellitus")],
/// );
/// cache.insert(false, result.clone());
///
/// assert_eq!(cache.get("73211009", false), Some(result));
/// assert_eq!(cache.get("73211009", true), None);
/// ```
pub struct ExpansionCache {
    inner: LruCache<CacheKey, CacheEntry>,
    ttl: Option<Duration>,
    hits: usize,
    misses: usize,
}

impl Default for ExpansionCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

impl ExpansionCache {
    /// Creates a cache with the given configuration.
    pub fn new(config: CacheConfig) -> Self {
        let capacity = NonZeroUsize::new(config.max_entries).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: LruCache::new(capacity),
            ttl: config.ttl,
            hits: 0,
            misses: 0,
        }
    }

    /// Creates a cache with custom capacity and TTL.
    pub fn with_capacity(max_entries: usize, ttl: Option<Duration>) -> Self {
        Self::new(CacheConfig { max_entries, ttl })
    }

    /// Looks up a live entry, promoting it to most-recently-used.
    ///
    /// An expired entry is evicted and reported as a miss.
    pub fn get(&mut self, code: &str, include_inactive: bool) -> Option<ExpansionResult> {
        let key = CacheKey::new(code, include_inactive);
        let ttl = self.ttl;

        let cached = self
            .inner
            .get(&key)
            .map(|entry| (entry.is_expired(ttl), entry.result.clone()));

        match cached {
            Some((false, result)) => {
                self.hits += 1;
                Some(result)
            }
            Some((true, _)) => {
                self.inner.pop(&key);
                self.misses += 1;
                None
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    /// Stores a successful result under `(result.code, include_inactive)`.
    ///
    /// Failed results are ignored and return false; a failure is never cached.
    pub fn insert(&mut self, include_inactive: bool, result: ExpansionResult) -> bool {
        if !result.is_success() {
            return false;
        }
        let key = CacheKey::new(result.code.clone(), include_inactive);
        self.inner.put(key, CacheEntry::new(result));
        true
    }

    /// Returns when the entry for a key was created, without touching LRU order.
    pub fn created_at(&self, code: &str, include_inactive: bool) -> Option<DateTime<Utc>> {
        self.inner
            .peek(&CacheKey::new(code, include_inactive))
            .map(|entry| entry.created_at)
    }

    /// Checks if a key exists (without affecting LRU order or checking expiry).
    pub fn contains(&self, code: &str, include_inactive: bool) -> bool {
        self.inner.contains(&CacheKey::new(code, include_inactive))
    }

    /// Removes one entry.
    pub fn remove(&mut self, code: &str, include_inactive: bool) -> Option<ExpansionResult> {
        self.inner
            .pop(&CacheKey::new(code, include_inactive))
            .map(|entry| entry.result)
    }

    /// Number of entries, possibly including expired ones not yet evicted.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Returns true if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Clears all entries and counters.
    pub fn clear(&mut self) {
        self.inner.clear();
        self.hits = 0;
        self.misses = 0;
    }

    /// Removes expired entries.
    pub fn cleanup_expired(&mut self) {
        let ttl = self.ttl;
        let expired: Vec<CacheKey> = self
            .inner
            .iter()
            .filter(|(_, entry)| entry.is_expired(ttl))
            .map(|(key, _)| key.clone())
            .collect();

        for key in expired {
            self.inner.pop(&key);
        }
    }

    /// Returns cache statistics.
    pub fn stats(&self) -> CacheStats {
        let total = self.inner.len();
        let expired = self
            .inner
            .iter()
            .filter(|(_, entry)| entry.is_expired(self.ttl))
            .count();

        CacheStats {
            total_entries: total,
            expired_entries: expired,
            valid_entries: total.saturating_sub(expired),
            hits: self.hits,
            misses: self.misses,
        }
    }
}

impl std::fmt::Debug for ExpansionCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExpansionCache")
            .field("entries", &self.inner.len())
            .field("ttl", &self.ttl)
            .field("hits", &self.hits)
            .field("misses", &self.misses)
            .finish()
    }
}

/// Statistics about the cache state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Total number of entries in the cache.
    pub total_entries: usize,
    /// Number of expired entries (not yet cleaned up).
    pub expired_entries: usize,
    /// Number of valid (non-expired) entries.
    pub valid_entries: usize,
    /// Lookups served from the cache.
    pub hits: usize,
    /// Lookups that missed or found an expired entry.
    pub misses: usize,
}
