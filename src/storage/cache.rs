use std::fmt::Display;
use std::sync::Arc;

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::storage::KeyValueStorage;

/// Namespaced keys for cached collections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheKey {
    WatchlistMovies,
    WatchlistTvShows,
    AvailableTags,
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheKey::WatchlistMovies => write!(f, "cache:watchlist:movies"),
            CacheKey::WatchlistTvShows => write!(f, "cache:watchlist:tv_shows"),
            CacheKey::AvailableTags => write!(f, "cache:tags"),
        }
    }
}

/// Stored cache envelope: payload plus write time and expiry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry<T> {
    pub data: T,
    /// Write time, epoch milliseconds
    pub timestamp: i64,
    /// `timestamp + ttl`, epoch milliseconds
    pub expires_at: i64,
}

#[derive(Serialize)]
struct CacheEntryRef<'a, T> {
    data: &'a T,
    timestamp: i64,
    expires_at: i64,
}

/// Result of a non-evicting cache read
#[derive(Debug, Clone, PartialEq)]
pub struct Cached<T> {
    pub data: T,
    pub is_stale: bool,
}

/// TTL-aware wrapper around the persistent key-value store
///
/// The cache is a best-effort optimization, never a correctness dependency:
/// every operation swallows storage failures after logging them, and corrupt
/// entries are treated as misses.
#[derive(Clone)]
pub struct TtlCache {
    storage: Arc<dyn KeyValueStorage>,
}

impl TtlCache {
    pub fn new(storage: Arc<dyn KeyValueStorage>) -> Self {
        Self { storage }
    }

    fn now_millis() -> i64 {
        Utc::now().timestamp_millis()
    }

    /// Serializes `value` with a timestamp and expiry and writes it under the
    /// namespaced key. Never fails the caller.
    pub async fn set<T: Serialize + Sync>(&self, key: &CacheKey, value: &T, ttl_minutes: i64) {
        let now = Self::now_millis();
        let entry = CacheEntryRef {
            data: value,
            timestamp: now,
            expires_at: now + ttl_minutes * 60_000,
        };

        let json = match serde_json::to_string(&entry) {
            Ok(json) => json,
            Err(e) => {
                tracing::error!(key = %key, error = %e, "Cache serialization error");
                return;
            }
        };

        if let Err(e) = self.storage.set(&key.to_string(), &json).await {
            tracing::warn!(key = %key, error = %e, "Cache write failed");
        }
    }

    /// Strict read: an expired or corrupt entry is deleted and reported as a
    /// miss.
    pub async fn get_and_evict<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<T> {
        let entry = self.read_entry::<T>(key).await?;

        if Self::now_millis() > entry.expires_at {
            tracing::debug!(key = %key, "Cache entry expired, evicting");
            self.remove(key).await;
            return None;
        }

        Some(entry.data)
    }

    /// Read-only lookup that never deletes: an expired entry is still
    /// returned, flagged stale, so callers can show it immediately and
    /// refresh in the background.
    pub async fn peek<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<Cached<T>> {
        let entry = self.read_entry::<T>(key).await?;
        Some(Cached {
            is_stale: Self::now_millis() > entry.expires_at,
            data: entry.data,
        })
    }

    /// Best-effort delete
    pub async fn remove(&self, key: &CacheKey) {
        if let Err(e) = self.storage.remove(&key.to_string()).await {
            tracing::warn!(key = %key, error = %e, "Cache delete failed");
        }
    }

    async fn read_entry<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<CacheEntry<T>> {
        let raw = match self.storage.get(&key.to_string()).await {
            Ok(raw) => raw?,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Cache read failed");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Corrupt cache entry, treating as miss");
                self.remove(key).await;
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    fn cache_over_memory() -> (TtlCache, Arc<MemoryStorage>) {
        let storage = Arc::new(MemoryStorage::new());
        (TtlCache::new(storage.clone() as Arc<dyn KeyValueStorage>), storage)
    }

    /// Writes an entry whose expiry is already `offset_ms` in the past or
    /// future, bypassing `set` so tests control the clock.
    async fn write_entry(storage: &MemoryStorage, key: &CacheKey, value: &[u32], offset_ms: i64) {
        let now = Utc::now().timestamp_millis();
        let data = value.to_vec();
        let entry = CacheEntryRef {
            data: &data,
            timestamp: now - 1,
            expires_at: now + offset_ms,
        };
        storage
            .set(&key.to_string(), &serde_json::to_string(&entry).unwrap())
            .await
            .unwrap();
    }

    #[test]
    fn test_cache_key_display() {
        assert_eq!(
            CacheKey::WatchlistMovies.to_string(),
            "cache:watchlist:movies"
        );
        assert_eq!(
            CacheKey::WatchlistTvShows.to_string(),
            "cache:watchlist:tv_shows"
        );
        assert_eq!(CacheKey::AvailableTags.to_string(), "cache:tags");
    }

    #[tokio::test]
    async fn test_set_then_get_within_ttl() {
        let (cache, _storage) = cache_over_memory();
        cache.set(&CacheKey::AvailableTags, &vec![1u32, 2, 3], 5).await;

        let read: Option<Vec<u32>> = cache.get_and_evict(&CacheKey::AvailableTags).await;
        assert_eq!(read, Some(vec![1, 2, 3]));
    }

    #[tokio::test]
    async fn test_get_and_evict_deletes_expired_entry() {
        let (cache, storage) = cache_over_memory();
        write_entry(&storage, &CacheKey::AvailableTags, &[9], -1_000).await;

        let read: Option<Vec<u32>> = cache.get_and_evict(&CacheKey::AvailableTags).await;
        assert_eq!(read, None);

        // The entry was deleted, not just skipped
        let raw = storage
            .get(&CacheKey::AvailableTags.to_string())
            .await
            .unwrap();
        assert_eq!(raw, None);
    }

    #[tokio::test]
    async fn test_peek_returns_stale_without_deleting() {
        let (cache, storage) = cache_over_memory();
        write_entry(&storage, &CacheKey::WatchlistMovies, &[4, 5], -1_000).await;

        let read: Option<Cached<Vec<u32>>> = cache.peek(&CacheKey::WatchlistMovies).await;
        let cached = read.unwrap();
        assert_eq!(cached.data, vec![4, 5]);
        assert!(cached.is_stale);

        // Still present after the peek
        let raw = storage
            .get(&CacheKey::WatchlistMovies.to_string())
            .await
            .unwrap();
        assert!(raw.is_some());

        // A strict read on the same expired entry then evicts it
        let strict: Option<Vec<u32>> = cache.get_and_evict(&CacheKey::WatchlistMovies).await;
        assert_eq!(strict, None);
    }

    #[tokio::test]
    async fn test_peek_fresh_entry_not_stale() {
        let (cache, storage) = cache_over_memory();
        write_entry(&storage, &CacheKey::WatchlistTvShows, &[1], 60_000).await;

        let read: Option<Cached<Vec<u32>>> = cache.peek(&CacheKey::WatchlistTvShows).await;
        assert!(!read.unwrap().is_stale);
    }

    #[tokio::test]
    async fn test_corrupt_entry_is_a_miss_and_self_heals() {
        let (cache, storage) = cache_over_memory();
        storage
            .set(&CacheKey::AvailableTags.to_string(), "not json at all")
            .await
            .unwrap();

        let read: Option<Vec<u32>> = cache.get_and_evict(&CacheKey::AvailableTags).await;
        assert_eq!(read, None);

        let raw = storage
            .get(&CacheKey::AvailableTags.to_string())
            .await
            .unwrap();
        assert_eq!(raw, None);
    }

    #[tokio::test]
    async fn test_remove_missing_key_is_quiet() {
        let (cache, _storage) = cache_over_memory();
        cache.remove(&CacheKey::WatchlistMovies).await;
    }
}
