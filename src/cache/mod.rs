//! Cache module for provider responses
//!
//! This module provides an in-memory response cache with a per-entry TTL and
//! the `CachedFetcher` that sits between the dashboard and each provider.
//! Fresh entries are served without touching the network; failures are never
//! cached so the next refresh retries the provider.

mod fetcher;
mod manager;

pub use fetcher::{CachedFetcher, FetchResult};
pub use manager::{CacheKey, Cached, Clock, ManualClock, ResponseCache, SystemClock};
