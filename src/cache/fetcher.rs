//! Cached, failure-isolating wrapper around a signal source
//!
//! A `CachedFetcher` answers from its [`ResponseCache`] while an entry is
//! fresh and otherwise calls the wrapped provider once per key at a time.
//! Provider errors, timeouts and panics all come back as
//! [`FetchResult::Failed`] and are never cached.

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::FutureExt;
use tracing::{debug, warn};

use super::manager::{CacheKey, Cached, Clock, ResponseCache, SystemClock};
use crate::data::{Credentials, SignalSource, SourceId};

/// Outcome of one fetch as seen by the presentation layer
#[derive(Debug)]
pub enum FetchResult<T> {
    /// The provider returned data
    Data(Arc<T>),
    /// The provider was reached but had nothing for the topic
    Empty,
    /// The provider call failed; holds the reason
    Failed(String),
}

impl<T> FetchResult<T> {
    /// Returns the payload if there is one
    pub fn data(&self) -> Option<&T> {
        match self {
            FetchResult::Data(data) => Some(data.as_ref()),
            _ => None,
        }
    }

    pub fn is_data(&self) -> bool {
        matches!(self, FetchResult::Data(_))
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, FetchResult::Empty)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, FetchResult::Failed(_))
    }
}

impl<T> Clone for FetchResult<T> {
    fn clone(&self) -> Self {
        match self {
            FetchResult::Data(data) => FetchResult::Data(Arc::clone(data)),
            FetchResult::Empty => FetchResult::Empty,
            FetchResult::Failed(reason) => FetchResult::Failed(reason.clone()),
        }
    }
}

impl<T> From<Cached<T>> for FetchResult<T> {
    fn from(cached: Cached<T>) -> Self {
        match cached {
            Cached::Data(data) => FetchResult::Data(data),
            Cached::Empty => FetchResult::Empty,
        }
    }
}

/// Wraps one provider with a TTL cache and single-flight fetching
pub struct CachedFetcher<T: Send + Sync + 'static> {
    source: Arc<dyn SignalSource<Output = T>>,
    cache: ResponseCache<T>,
    ttl: Duration,
    timeout: Option<Duration>,
    /// Per-key gates so concurrent misses on one key share a provider call
    in_flight: Mutex<HashMap<CacheKey, Arc<tokio::sync::Mutex<()>>>>,
}

impl<T: Send + Sync + 'static> CachedFetcher<T> {
    /// Creates a fetcher with the given TTL using the wall clock
    pub fn new(source: Arc<dyn SignalSource<Output = T>>, ttl: Duration) -> Self {
        Self::with_clock(source, ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(
        source: Arc<dyn SignalSource<Output = T>>,
        ttl: Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            source,
            cache: ResponseCache::with_clock(clock),
            ttl,
            timeout: None,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// Bounds each provider call; an elapsed timeout yields `Failed`
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn source_id(&self) -> SourceId {
        self.source.id()
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Number of cached entries, including expired ones
    pub fn cached_entries(&self) -> usize {
        self.cache.len()
    }

    /// Derives the cache key for a call
    ///
    /// The credential principal is part of the key; the secret never is.
    pub fn key_for(&self, topic: &str, credentials: Option<&Credentials>) -> CacheKey {
        let mut params = self.source.params();
        if let Some(credentials) = credentials {
            params.push(credentials.principal.clone());
        }
        CacheKey::new(self.source.id(), topic, params)
    }

    /// Fetches using the configured TTL
    pub async fn fetch(&self, topic: &str, credentials: Option<&Credentials>) -> FetchResult<T> {
        self.fetch_with_ttl(topic, credentials, self.ttl).await
    }

    /// Returns a fresh cached result or calls the provider
    ///
    /// # Behavior
    /// - Fresh entry: returned without calling the provider
    /// - `Ok(Some(_))` / `Ok(None)`: cached with `ttl`, returned as `Data` / `Empty`
    /// - Error, timeout or panic: returned as `Failed`, not cached
    pub async fn fetch_with_ttl(
        &self,
        topic: &str,
        credentials: Option<&Credentials>,
        ttl: Duration,
    ) -> FetchResult<T> {
        let source = self.source.id();
        let key = self.key_for(topic, credentials);

        if let Some(hit) = self.cache.get(&key) {
            debug!(%source, topic, "cache hit");
            return hit.into();
        }

        let gate = self.gate_for(&key);
        let result = {
            let _permit = gate.lock().await;

            // Another caller may have filled the slot while we waited
            if let Some(hit) = self.cache.get(&key) {
                debug!(%source, topic, "cache hit after wait");
                hit.into()
            } else {
                debug!(%source, topic, "cache miss, calling provider");
                self.call_provider(&key, topic, credentials, ttl).await
            }
        };
        self.release_gate(&key, &gate);

        result
    }

    async fn call_provider(
        &self,
        key: &CacheKey,
        topic: &str,
        credentials: Option<&Credentials>,
        ttl: Duration,
    ) -> FetchResult<T> {
        let source = self.source.id();
        let call = AssertUnwindSafe(self.source.fetch(topic, credentials)).catch_unwind();

        let outcome = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, call).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    warn!(%source, topic, timeout_ms = limit.as_millis() as u64, "provider timed out");
                    return FetchResult::Failed(format!(
                        "timed out after {}s",
                        limit.as_secs_f64()
                    ));
                }
            },
            None => call.await,
        };

        match outcome {
            Ok(Ok(Some(payload))) => {
                let payload = Arc::new(payload);
                self.cache
                    .insert(key.clone(), Cached::Data(Arc::clone(&payload)), ttl);
                FetchResult::Data(payload)
            }
            Ok(Ok(None)) => {
                debug!(%source, topic, "provider returned no data");
                self.cache.insert(key.clone(), Cached::Empty, ttl);
                FetchResult::Empty
            }
            Ok(Err(e)) => {
                warn!(%source, topic, error = %e, "provider call failed");
                FetchResult::Failed(e.to_string())
            }
            Err(_) => {
                warn!(%source, topic, "provider panicked");
                FetchResult::Failed("provider panicked".to_string())
            }
        }
    }

    fn gate_for(&self, key: &CacheKey) -> Arc<tokio::sync::Mutex<()>> {
        let mut in_flight = self
            .in_flight
            .lock()
            .unwrap_or_else(|poison| poison.into_inner());
        Arc::clone(
            in_flight
                .entry(key.clone())
                .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(()))),
        )
    }

    fn release_gate(&self, key: &CacheKey, gate: &Arc<tokio::sync::Mutex<()>>) {
        let mut in_flight = self
            .in_flight
            .lock()
            .unwrap_or_else(|poison| poison.into_inner());
        // Only the last holder removes the gate; waiters still reference it
        if in_flight
            .get(key)
            .is_some_and(|current| Arc::ptr_eq(current, gate) && Arc::strong_count(gate) <= 2)
        {
            in_flight.remove(key);
        }
    }
}
