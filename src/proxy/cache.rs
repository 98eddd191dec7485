//! Response cache with a fixed time-to-live
//!
//! Entries are never evicted here: staleness is decided on read, by comparing
//! the entry's `cached_at` against the configured TTL. Store failures are
//! logged and treated as misses so that a broken backend never fails a request.

use crate::domain::types::{CacheKey, CacheTtlHours};
use crate::proxy::types::CacheEntry;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

/// Errors raised by a cache backend
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Cache backend unavailable: {0}")]
    Unavailable(String),

    #[error("Cache backend error: {0}")]
    Backend(String),
}

impl From<sqlx::Error> for CacheError {
    fn from(error: sqlx::Error) -> Self {
        match error {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                Self::Unavailable(error.to_string())
            }
            other => Self::Backend(other.to_string()),
        }
    }
}

/// Persistent key/value storage for cached responses
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>, CacheError>;

    /// Insert or replace the entry stored under `entry.key`
    async fn set(&self, entry: CacheEntry) -> Result<(), CacheError>;
}

/// Process-local store, used by default and in tests
#[derive(Debug, Default)]
pub struct InMemoryCacheStore {
    entries: RwLock<HashMap<String, CacheEntry>>,
    failing: AtomicBool,
}

impl InMemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Make every subsequent call fail, to simulate an unreachable backend
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), CacheError> {
        if self.failing.load(Ordering::SeqCst) {
            Err(CacheError::Unavailable("in-memory store set to fail".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl CacheStore for InMemoryCacheStore {
    async fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>, CacheError> {
        self.check_available()?;
        Ok(self.entries.read().get(key.as_ref()).cloned())
    }

    async fn set(&self, entry: CacheEntry) -> Result<(), CacheError> {
        self.check_available()?;
        self.entries.write().insert(entry.key.clone(), entry);
        Ok(())
    }
}

/// Whether an entry written at `cached_at` is still usable at `now`
pub fn is_fresh(cached_at: DateTime<Utc>, now: DateTime<Utc>, ttl: chrono::Duration) -> bool {
    now.signed_duration_since(cached_at) <= ttl
}

/// TTL-aware read view over a [`CacheStore`]
#[derive(Clone)]
pub struct TtlCache {
    store: Arc<dyn CacheStore>,
    ttl: CacheTtlHours,
}

impl TtlCache {
    pub fn new(store: Arc<dyn CacheStore>, ttl: CacheTtlHours) -> Self {
        Self { store, ttl }
    }

    pub fn store(&self) -> Arc<dyn CacheStore> {
        Arc::clone(&self.store)
    }

    /// Fresh entry for `key`, if any. Expired entries and store errors are misses.
    pub async fn get(&self, key: &CacheKey) -> Option<CacheEntry> {
        self.get_at(key, Utc::now()).await
    }

    pub async fn get_at(&self, key: &CacheKey, now: DateTime<Utc>) -> Option<CacheEntry> {
        match self.store.get(key).await {
            Ok(Some(entry)) if is_fresh(entry.cached_at, now, self.ttl.as_chrono()) => Some(entry),
            Ok(Some(entry)) => {
                debug!(cache_key = %key, cached_at = %entry.cached_at, "Cache entry expired");
                None
            }
            Ok(None) => None,
            Err(e) => {
                warn!(cache_key = %key, error = %e, "Cache read failed, treating as miss");
                None
            }
        }
    }

    /// Write-through without going via the background writer
    pub async fn set(&self, entry: CacheEntry) -> Result<(), CacheError> {
        self.store.set(entry).await
    }
}
