//! Stale-while-revalidate cache with a pluggable backing store.
//!
//! The persistent SQLite store is used when configured and reachable; on any
//! backend failure, including mid-session, the cache silently degrades to the
//! in-process map. Callers never see a cache error: a failed read is a miss, a
//! failed write is a no-op.

pub mod memory;
pub mod sqlite;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{info, warn};

use crate::article::Article;
use crate::TARGET_CACHE;

/// A cached, ranked article batch for one `(section, phase)` key.
///
/// Entries are always overwritten whole; a `partial` entry is superseded only
/// by a complete one for the same key within a refresh cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub payload: Vec<Article>,
    pub written_at: DateTime<Utc>,
    pub partial: bool,
}

/// Cache key for a section and fetch phase.
pub fn cache_key(section: &str, phase: &str) -> String {
    format!("section:{}:{}", section, phase)
}

/// Read-only snapshot of which backend is serving the cache.
#[derive(Debug, Clone, Serialize)]
pub struct CacheStatus {
    pub backend: &'static str,
    pub entries: usize,
    pub degraded: bool,
}

pub struct StalenessCache {
    persistent: Option<sqlite::SqliteCache>,
    memory: memory::MemoryCache,
    degraded: AtomicBool,
}

impl StalenessCache {
    /// Open the cache, probing the persistent store when a path is given.
    /// A store that cannot be opened is logged and skipped, never fatal.
    pub async fn open(sqlite_path: Option<&str>) -> Self {
        let persistent = match sqlite_path {
            Some(path) => match sqlite::SqliteCache::new(path).await {
                Ok(store) => {
                    info!(target: TARGET_CACHE, "Persistent cache ready at {}", path);
                    Some(store)
                }
                Err(err) => {
                    warn!(target: TARGET_CACHE, "Persistent cache unavailable ({}), using in-process cache", err);
                    None
                }
            },
            None => None,
        };
        StalenessCache {
            persistent,
            memory: memory::MemoryCache::new(),
            degraded: AtomicBool::new(false),
        }
    }

    /// In-process cache only. Used when no persistent store is configured.
    pub fn in_memory() -> Self {
        StalenessCache {
            persistent: None,
            memory: memory::MemoryCache::new(),
            degraded: AtomicBool::new(false),
        }
    }

    fn active_persistent(&self) -> Option<&sqlite::SqliteCache> {
        if self.degraded.load(Ordering::Relaxed) {
            None
        } else {
            self.persistent.as_ref()
        }
    }

    fn degrade(&self, op: &str, err: sqlx::Error) {
        warn!(target: TARGET_CACHE, "Persistent cache {} failed ({}), degrading to in-process cache", op, err);
        self.degraded.store(true, Ordering::Relaxed);
    }

    pub async fn get(&self, key: &str) -> Option<CacheEntry> {
        if let Some(store) = self.active_persistent() {
            match store.get(key).await {
                Ok(found) => return found,
                Err(err) => self.degrade("read", err),
            }
        }
        self.memory.get(key)
    }

    pub async fn set(&self, key: &str, entry: CacheEntry, ttl_seconds: u64) {
        if let Some(store) = self.active_persistent() {
            match store.set(key, &entry, ttl_seconds).await {
                Ok(()) => return,
                Err(err) => self.degrade("write", err),
            }
        }
        self.memory.set(key, entry, ttl_seconds);
    }

    pub async fn clear(&self) {
        if let Some(store) = self.active_persistent() {
            if let Err(err) = store.clear().await {
                self.degrade("clear", err);
            }
        }
        self.memory.clear();
    }

    pub async fn status(&self) -> CacheStatus {
        if let Some(store) = self.active_persistent() {
            match store.len().await {
                Ok(entries) => {
                    return CacheStatus {
                        backend: "sqlite",
                        entries,
                        degraded: false,
                    }
                }
                Err(err) => self.degrade("status", err),
            }
        }
        CacheStatus {
            backend: "memory",
            entries: self.memory.len(),
            degraded: self.degraded.load(Ordering::Relaxed),
        }
    }
}
