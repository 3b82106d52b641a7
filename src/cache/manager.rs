//! In-memory response cache with per-entry TTL
//!
//! Provides a `ResponseCache` that stores provider payloads keyed by the
//! effective call arguments. Entries are stamped with the time they were
//! stored and are only served while younger than the TTL they were stored
//! with; stale entries are treated as absent and replaced on the next fetch.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::data::SourceId;

/// Source of the current time for cache stamping
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    /// Moves the clock forward
    pub fn advance(&self, by: Duration) {
        let by = chrono::Duration::from_std(by).unwrap_or(chrono::Duration::zero());
        let mut now = self.now.lock().unwrap_or_else(|poison| poison.into_inner());
        *now += by;
    }

    pub fn set(&self, to: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(|poison| poison.into_inner()) = to;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|poison| poison.into_inner())
    }
}

/// Identifies one provider call by everything that affects its result
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub source: SourceId,
    pub topic: String,
    pub params: Vec<String>,
}

impl CacheKey {
    pub fn new(source: SourceId, topic: impl Into<String>, params: Vec<String>) -> Self {
        Self {
            source,
            topic: topic.into(),
            params,
        }
    }
}

/// What a cache slot holds: a payload or the knowledge that there was none
#[derive(Debug)]
pub enum Cached<T> {
    Data(Arc<T>),
    Empty,
}

impl<T> Clone for Cached<T> {
    fn clone(&self) -> Self {
        match self {
            Cached::Data(data) => Cached::Data(Arc::clone(data)),
            Cached::Empty => Cached::Empty,
        }
    }
}

/// A stored payload with its freshness metadata
#[derive(Debug)]
struct CacheEntry<T> {
    payload: Cached<T>,
    stored_at: DateTime<Utc>,
    ttl: Duration,
}

impl<T> CacheEntry<T> {
    /// Reusable iff `now - stored_at < ttl`
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        let age = (now - self.stored_at).to_std().unwrap_or_default();
        age < self.ttl
    }
}

/// Thread-safe map from call arguments to cached payloads
///
/// Entries are never evicted; an expired entry stays in the map until the
/// next successful fetch for its key overwrites it.
pub struct ResponseCache<T> {
    entries: Mutex<HashMap<CacheKey, CacheEntry<T>>>,
    clock: Arc<dyn Clock>,
}

impl<T> ResponseCache<T> {
    /// Creates an empty cache stamped by the wall clock
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            clock,
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<CacheKey, CacheEntry<T>>> {
        // A panic while holding the lock cannot leave a half-written entry
        self.entries
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
    }

    /// Returns the payload for `key` if a fresh entry exists
    pub fn get(&self, key: &CacheKey) -> Option<Cached<T>> {
        let now = self.clock.now();
        let entries = self.lock();
        entries
            .get(key)
            .filter(|entry| entry.is_fresh(now))
            .map(|entry| entry.payload.clone())
    }

    /// Stores `payload` under `key`, replacing any previous entry
    ///
    /// A zero TTL could never be served, so nothing is stored.
    pub fn insert(&self, key: CacheKey, payload: Cached<T>, ttl: Duration) {
        if ttl.is_zero() {
            return;
        }
        let entry = CacheEntry {
            payload,
            stored_at: self.clock.now(),
            ttl,
        };
        self.lock().insert(key, entry);
    }

    /// Number of stored entries, including expired ones
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

impl<T> Default for ResponseCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 3, 12, 0, 0).unwrap()
    }

    fn key(topic: &str) -> CacheKey {
        CacheKey::new(SourceId::SearchInterest, topic, vec!["de-DE".to_string()])
    }

    fn cache_with_clock() -> (ResponseCache<String>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(start()));
        (ResponseCache::with_clock(clock.clone()), clock)
    }

    #[test]
    fn test_get_returns_none_for_missing_key() {
        let (cache, _clock) = cache_with_clock();
        assert!(cache.get(&key("Bitcoin")).is_none());
    }

    #[test]
    fn test_fresh_entry_returns_same_arc() {
        let (cache, clock) = cache_with_clock();
        let payload = Arc::new("series".to_string());
        cache.insert(
            key("Bitcoin"),
            Cached::Data(payload.clone()),
            Duration::from_secs(3600),
        );

        clock.advance(Duration::from_secs(10));

        match cache.get(&key("Bitcoin")) {
            Some(Cached::Data(hit)) => assert!(Arc::ptr_eq(&hit, &payload)),
            other => panic!("expected data hit, got {:?}", other),
        }
    }

    #[test]
    fn test_entry_expires_at_ttl_boundary() {
        let (cache, clock) = cache_with_clock();
        cache.insert(key("Bitcoin"), Cached::Empty, Duration::from_secs(60));

        clock.advance(Duration::from_secs(59));
        assert!(cache.get(&key("Bitcoin")).is_some());

        clock.advance(Duration::from_secs(1));
        assert!(cache.get(&key("Bitcoin")).is_none());
    }

    #[test]
    fn test_zero_ttl_stores_nothing() {
        let (cache, _clock) = cache_with_clock();
        cache.insert(
            key("Bitcoin"),
            Cached::Data(Arc::new("x".to_string())),
            Duration::ZERO,
        );
        assert!(cache.is_empty());
        assert!(cache.get(&key("Bitcoin")).is_none());
    }

    #[test]
    fn test_insert_replaces_entry() {
        let (cache, clock) = cache_with_clock();
        cache.insert(
            key("Bitcoin"),
            Cached::Data(Arc::new("old".to_string())),
            Duration::from_secs(60),
        );
        clock.advance(Duration::from_secs(120));
        cache.insert(
            key("Bitcoin"),
            Cached::Data(Arc::new("new".to_string())),
            Duration::from_secs(60),
        );

        assert_eq!(cache.len(), 1);
        match cache.get(&key("Bitcoin")) {
            Some(Cached::Data(hit)) => assert_eq!(hit.as_str(), "new"),
            other => panic!("expected data hit, got {:?}", other),
        }
    }

    #[test]
    fn test_keys_differ_by_params() {
        let (cache, _clock) = cache_with_clock();
        cache.insert(key("Bitcoin"), Cached::Empty, Duration::from_secs(60));

        let other_locale =
            CacheKey::new(SourceId::SearchInterest, "Bitcoin", vec!["en-US".to_string()]);
        let other_source = CacheKey::new(SourceId::News, "Bitcoin", vec!["de-DE".to_string()]);

        assert!(cache.get(&other_locale).is_none());
        assert!(cache.get(&other_source).is_none());
    }

    #[test]
    fn test_expired_entries_are_kept_until_replaced() {
        let (cache, clock) = cache_with_clock();
        cache.insert(key("a"), Cached::Empty, Duration::from_secs(1));
        clock.advance(Duration::from_secs(5));

        assert!(cache.get(&key("a")).is_none());
        assert_eq!(cache.len(), 1);
    }
}
