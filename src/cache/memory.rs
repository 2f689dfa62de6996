//! In-process fallback backend with per-key expiry.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;

use super::CacheEntry;

struct StoredEntry {
    entry: CacheEntry,
    expires_at: DateTime<Utc>,
}

pub struct MemoryCache {
    map: DashMap<String, StoredEntry>,
}

impl MemoryCache {
    pub fn new() -> Self {
        MemoryCache { map: DashMap::new() }
    }

    pub fn get(&self, key: &str) -> Option<CacheEntry> {
        let expired = match self.map.get(key) {
            Some(stored) => {
                if stored.expires_at > Utc::now() {
                    return Some(stored.entry.clone());
                }
                true
            }
            None => return None,
        };
        if expired {
            self.map.remove(key);
        }
        None
    }

    pub fn set(&self, key: &str, entry: CacheEntry, ttl_seconds: u64) {
        let expires_at = Utc::now() + Duration::seconds(ttl_seconds as i64);
        self.map
            .insert(key.to_string(), StoredEntry { entry, expires_at });
    }

    pub fn clear(&self) {
        self.map.clear();
    }

    pub fn len(&self) -> usize {
        let now = Utc::now();
        self.map.iter().filter(|kv| kv.expires_at > now).count()
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::article::tests::test_article;

    fn entry() -> CacheEntry {
        CacheEntry {
            payload: vec![test_article("m")],
            written_at: Utc::now(),
            partial: false,
        }
    }

    #[test]
    fn overwrites_in_place() {
        let cache = MemoryCache::new();
        cache.set("k", entry(), 60);
        let mut second = entry();
        second.payload.push(test_article("n"));
        cache.set("k", second, 60);
        assert_eq!(cache.get("k").unwrap().payload.len(), 2);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn expired_key_is_removed_on_read() {
        let cache = MemoryCache::new();
        cache.set("k", entry(), 0);
        assert!(cache.get("k").is_none());
        assert_eq!(cache.len(), 0);
    }
}
