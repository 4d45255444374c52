//! TTL + LRU file-backed key/value cache (§4.3).
//!
//! One `Cache` instance per logical namespace (`query`, `page`, `summary`,
//! see [`CacheNamespace`]); all three share this implementation. Durability
//! contract: body is written before the index is updated, so a crash
//! between the two leaves an orphan body file rather than a dangling index
//! entry — `get` already treats a missing body as a miss and self-heals by
//! dropping the stale index record, and a torn index file is recovered as
//! empty (§4.3 Durability).

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::error::ResearchError;

const DEFAULT_TTL_SECS: i64 = 24 * 60 * 60;
const DEFAULT_MAX_ENTRIES: usize = 100;

/// The three logical stores named in §4.3, each a distinct `Cache` instance
/// rooted in its own subdirectory of the configured cache directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheNamespace {
    Query,
    Page,
    Summary,
}

impl CacheNamespace {
    #[must_use]
    pub fn dir_name(self) -> &'static str {
        match self {
            CacheNamespace::Query => "query",
            CacheNamespace::Page => "page",
            CacheNamespace::Summary => "summary",
        }
    }
}

/// Per-entry metadata persisted in the index file, keyed by cache key.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct IndexRecord {
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    last_access: DateTime<Utc>,
    #[serde(default)]
    user_metadata: HashMap<String, String>,
}

/// A cache entry as exposed to callers (§3 `CacheEntry`): the key, the path
/// its body lives at, and its metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub key: String,
    pub body_path: PathBuf,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub last_access: DateTime<Utc>,
    pub user_metadata: HashMap<String, String>,
}

/// Snapshot of cache occupancy and hit/miss counters returned by `stats()`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheStats {
    pub namespace: String,
    pub entries: usize,
    pub max_entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

/// Derive the normalized cache key for a query plus metadata pairs (§4.3
/// Keying): `hash(normalized_query || '||' || sorted metadata k=v pairs)`,
/// normalization being lowercase + trim. Any ≥64-bit hash is acceptable per
/// §3's `content_hash` contract; this uses `xxh3_64`, hex-encoded.
#[must_use]
pub fn cache_key(query: &str, metadata: &[(&str, &str)]) -> String {
    let normalized_query = query.trim().to_lowercase();

    let mut pairs: Vec<String> = metadata
        .iter()
        .map(|(k, v)| format!("{}={}", k.trim().to_lowercase(), v.trim().to_lowercase()))
        .collect();
    pairs.sort();

    let material = format!("{}||{}", normalized_query, pairs.join("&"));
    let digest = xxhash_rust::xxh3::xxh3_64(material.as_bytes());
    hex::encode(digest.to_be_bytes())
}

struct Inner {
    index: HashMap<String, IndexRecord>,
}

/// A single TTL+LRU cache namespace rooted at `{cache_dir}/{namespace}`.
#[derive(Clone)]
pub struct Cache {
    namespace: CacheNamespace,
    dir: PathBuf,
    bodies_dir: PathBuf,
    index_path: PathBuf,
    ttl: Duration,
    max_entries: usize,
    inner: Arc<Mutex<Inner>>,
    hits: Arc<AtomicU64>,
    misses: Arc<AtomicU64>,
    evictions: Arc<AtomicU64>,
}

impl Cache {
    /// Open (creating if absent) the cache rooted at `{base_dir}/{namespace}`,
    /// loading its index. A torn/corrupt index is treated as empty and its
    /// orphaned body files are garbage-collected lazily on next `set` — they
    /// are simply never looked up again once the index forgets them.
    pub async fn open(
        base_dir: &Path,
        namespace: CacheNamespace,
        ttl: Duration,
        max_entries: usize,
    ) -> Result<Self, ResearchError> {
        let dir = base_dir.join(namespace.dir_name());
        let bodies_dir = dir.join("bodies");
        tokio::fs::create_dir_all(&bodies_dir)
            .await
            .map_err(|e| ResearchError::CacheCorruption {
                message: format!("failed to create cache directory {}: {e}", bodies_dir.display()),
            })?;

        let index_path = dir.join("index.json");
        let index = Self::load_index(&index_path).await;

        let cache = Self {
            namespace,
            dir,
            bodies_dir,
            index_path,
            ttl: if ttl.is_zero() {
                Duration::from_secs(DEFAULT_TTL_SECS as u64)
            } else {
                ttl
            },
            max_entries: if max_entries == 0 {
                DEFAULT_MAX_ENTRIES
            } else {
                max_entries
            },
            inner: Arc::new(Mutex::new(Inner { index })),
            hits: Arc::new(AtomicU64::new(0)),
            misses: Arc::new(AtomicU64::new(0)),
            evictions: Arc::new(AtomicU64::new(0)),
        };

        cache.sweep_expired().await?;
        Ok(cache)
    }

    async fn load_index(index_path: &Path) -> HashMap<String, IndexRecord> {
        match tokio::fs::read(index_path).await {
            Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or_else(|e| {
                log::warn!("cache index at {} is corrupt ({e}); treating as empty", index_path.display());
                HashMap::new()
            }),
            Err(_) => HashMap::new(),
        }
    }

    async fn persist_index(&self, index: &HashMap<String, IndexRecord>) -> Result<(), ResearchError> {
        let serialized = serde_json::to_vec_pretty(index).map_err(|e| ResearchError::CacheCorruption {
            message: format!("failed to serialize cache index: {e}"),
        })?;
        let tmp_path = self.index_path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, &serialized)
            .await
            .map_err(|e| ResearchError::CacheCorruption {
                message: format!("failed to write cache index tmp file: {e}"),
            })?;
        tokio::fs::rename(&tmp_path, &self.index_path)
            .await
            .map_err(|e| ResearchError::CacheCorruption {
                message: format!("failed to commit cache index: {e}"),
            })?;
        Ok(())
    }

    fn body_path(&self, key: &str) -> PathBuf {
        self.bodies_dir.join(format!("{key}.bin"))
    }

    /// Fetch the stored value for `key`, if present and unexpired. Updates
    /// `last_access`. If the index says the entry exists but its body file
    /// is gone, the entry is treated as a miss and the stale index record
    /// is dropped (§4.3: "MUST remove the entry and return miss if the body
    /// file is absent").
    pub async fn get(&self, key: &str) -> Result<Option<String>, ResearchError> {
        let mut guard = self.inner.lock().await;

        let Some(record) = guard.index.get(key).cloned() else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            return Ok(None);
        };

        if Utc::now() >= record.expires_at {
            guard.index.remove(key);
            self.persist_index(&guard.index).await?;
            self.misses.fetch_add(1, Ordering::Relaxed);
            return Ok(None);
        }

        let body_path = self.body_path(key);
        let body = match tokio::fs::read_to_string(&body_path).await {
            Ok(body) => body,
            Err(_) => {
                guard.index.remove(key);
                self.persist_index(&guard.index).await?;
                self.misses.fetch_add(1, Ordering::Relaxed);
                return Ok(None);
            }
        };

        let mut updated = record;
        updated.last_access = Utc::now();
        guard.index.insert(key.to_string(), updated);
        self.persist_index(&guard.index).await?;
        self.hits.fetch_add(1, Ordering::Relaxed);
        Ok(Some(body))
    }

    /// Store `value` under `key`, associated with `query` for inspection.
    /// Writes the body before the index record (§4.3 Durability), then
    /// sweeps expired entries and enforces the LRU size bound.
    pub async fn set(
        &self,
        key: &str,
        query: &str,
        value: &str,
        user_metadata: HashMap<String, String>,
        ttl_override: Option<Duration>,
    ) -> Result<(), ResearchError> {
        let body_path = self.body_path(key);
        let tmp_path = body_path.with_extension("bin.tmp");
        tokio::fs::write(&tmp_path, value.as_bytes())
            .await
            .map_err(|e| ResearchError::CacheCorruption {
                message: format!("failed to write cache body for {key}: {e}"),
            })?;
        tokio::fs::rename(&tmp_path, &body_path)
            .await
            .map_err(|e| ResearchError::CacheCorruption {
                message: format!("failed to commit cache body for {key}: {e}"),
            })?;

        let now = Utc::now();
        let ttl = ttl_override.unwrap_or(self.ttl);
        let expires_at = now
            + chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::seconds(DEFAULT_TTL_SECS));

        let mut user_metadata = user_metadata;
        user_metadata.insert("query".to_string(), query.to_string());

        let mut guard = self.inner.lock().await;
        guard.index.insert(
            key.to_string(),
            IndexRecord {
                created_at: now,
                expires_at,
                last_access: now,
                user_metadata,
            },
        );

        self.sweep_expired_locked(&mut guard.index).await;
        self.enforce_size_bound_locked(&mut guard.index).await;
        self.persist_index(&guard.index).await?;
        Ok(())
    }

    pub async fn delete(&self, key: &str) -> Result<(), ResearchError> {
        let mut guard = self.inner.lock().await;
        if guard.index.remove(key).is_some() {
            let _ = tokio::fs::remove_file(self.body_path(key)).await;
            self.persist_index(&guard.index).await?;
        }
        Ok(())
    }

    pub async fn clear(&self) -> Result<(), ResearchError> {
        let mut guard = self.inner.lock().await;
        for key in guard.index.keys() {
            let _ = tokio::fs::remove_file(self.body_path(key)).await;
        }
        guard.index.clear();
        self.persist_index(&guard.index).await?;
        Ok(())
    }

    pub async fn stats(&self) -> CacheStats {
        let guard = self.inner.lock().await;
        CacheStats {
            namespace: self.namespace.dir_name().to_string(),
            entries: guard.index.len(),
            max_entries: self.max_entries,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }

    /// List current entries as `CacheEntry` views, for inspection/testing.
    pub async fn entries(&self) -> Vec<CacheEntry> {
        let guard = self.inner.lock().await;
        guard
            .index
            .iter()
            .map(|(key, record)| CacheEntry {
                key: key.clone(),
                body_path: self.body_path(key),
                created_at: record.created_at,
                expires_at: record.expires_at,
                last_access: record.last_access,
                user_metadata: record.user_metadata.clone(),
            })
            .collect()
    }

    async fn sweep_expired(&self) -> Result<(), ResearchError> {
        let mut guard = self.inner.lock().await;
        self.sweep_expired_locked(&mut guard.index).await;
        self.persist_index(&guard.index).await
    }

    async fn sweep_expired_locked(&self, index: &mut HashMap<String, IndexRecord>) {
        let now = Utc::now();
        let expired: Vec<String> = index
            .iter()
            .filter(|(_, record)| now >= record.expires_at)
            .map(|(key, _)| key.clone())
            .collect();

        for key in expired {
            index.remove(&key);
            let _ = tokio::fs::remove_file(self.body_path(&key)).await;
        }
    }

    async fn enforce_size_bound_locked(&self, index: &mut HashMap<String, IndexRecord>) {
        if index.len() <= self.max_entries {
            return;
        }

        let mut by_last_access: Vec<(String, DateTime<Utc>)> = index
            .iter()
            .map(|(key, record)| (key.clone(), record.last_access))
            .collect();
        by_last_access.sort_by_key(|(_, last_access)| *last_access);

        let to_evict = index.len() - self.max_entries;
        for (key, _) in by_last_access.into_iter().take(to_evict) {
            index.remove(&key);
            let _ = tokio::fs::remove_file(self.body_path(&key)).await;
            self.evictions.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn open_cache(max_entries: usize) -> (TempDir, Cache) {
        let dir = TempDir::new().unwrap();
        let cache = Cache::open(
            dir.path(),
            CacheNamespace::Page,
            Duration::from_secs(3600),
            max_entries,
        )
        .await
        .unwrap();
        (dir, cache)
    }

    #[test]
    fn cache_key_is_order_independent_over_metadata() {
        let a = cache_key("  Rust  Async  ", &[("engine", "brave"), ("n", "10")]);
        let b = cache_key("rust async", &[("n", "10"), ("engine", "BRAVE")]);
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn set_then_get_round_trips() {
        let (_dir, cache) = open_cache(10).await;
        let key = cache_key("q", &[]);
        cache
            .set(&key, "q", "hello world", HashMap::new(), None)
            .await
            .unwrap();
        let got = cache.get(&key).await.unwrap();
        assert_eq!(got.as_deref(), Some("hello world"));
    }

    #[tokio::test]
    async fn missing_key_is_a_miss() {
        let (_dir, cache) = open_cache(10).await;
        assert!(cache.get("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn expired_entry_is_evicted_on_get() {
        let dir = TempDir::new().unwrap();
        let cache = Cache::open(dir.path(), CacheNamespace::Page, Duration::from_millis(1), 10)
            .await
            .unwrap();
        let key = cache_key("q", &[]);
        cache.set(&key, "q", "v", HashMap::new(), None).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(cache.get(&key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn missing_body_file_is_treated_as_miss() {
        let (_dir, cache) = open_cache(10).await;
        let key = cache_key("q", &[]);
        cache.set(&key, "q", "v", HashMap::new(), None).await.unwrap();
        tokio::fs::remove_file(cache.body_path(&key)).await.unwrap();
        assert!(cache.get(&key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn size_bound_evicts_oldest_last_access() {
        let (_dir, cache) = open_cache(2).await;
        for i in 0..3 {
            let key = cache_key(&format!("q{i}"), &[]);
            cache.set(&key, &format!("q{i}"), "v", HashMap::new(), None).await.unwrap();
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        let stats = cache.stats().await;
        assert_eq!(stats.entries, 2);
        assert_eq!(stats.evictions, 1);

        let first_key = cache_key("q0", &[]);
        assert!(cache.get(&first_key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn delete_removes_entry_and_body() {
        let (_dir, cache) = open_cache(10).await;
        let key = cache_key("q", &[]);
        cache.set(&key, "q", "v", HashMap::new(), None).await.unwrap();
        cache.delete(&key).await.unwrap();
        assert!(cache.get(&key).await.unwrap().is_none());
        assert!(!cache.body_path(&key).exists());
    }

    #[tokio::test]
    async fn clear_empties_the_cache() {
        let (_dir, cache) = open_cache(10).await;
        for i in 0..3 {
            let key = cache_key(&format!("q{i}"), &[]);
            cache.set(&key, &format!("q{i}"), "v", HashMap::new(), None).await.unwrap();
        }
        cache.clear().await.unwrap();
        let stats = cache.stats().await;
        assert_eq!(stats.entries, 0);
    }

    #[tokio::test]
    async fn open_creates_the_bodies_subdirectory() {
        use assert_fs::TempDir as AssertTempDir;
        use assert_fs::prelude::*;
        use predicates::prelude::*;

        let dir = AssertTempDir::new().unwrap();
        let _cache = Cache::open(dir.path(), CacheNamespace::Page, Duration::from_secs(3600), 10)
            .await
            .unwrap();

        dir.child("page").assert(predicate::path::is_dir());
        dir.child("page").child("bodies").assert(predicate::path::is_dir());
    }

    proptest::proptest! {
        #[test]
        fn cache_key_is_deterministic(query in ".{0,200}") {
            let a = cache_key(&query, &[]);
            let b = cache_key(&query, &[]);
            prop_assert_eq!(a, b);
        }
    }

    #[tokio::test]
    async fn torn_index_recovers_as_empty() {
        let dir = TempDir::new().unwrap();
        let ns_dir = dir.path().join(CacheNamespace::Page.dir_name());
        tokio::fs::create_dir_all(&ns_dir).await.unwrap();
        tokio::fs::write(ns_dir.join("index.json"), b"{not valid json")
            .await
            .unwrap();

        let cache = Cache::open(dir.path(), CacheNamespace::Page, Duration::from_secs(3600), 10)
            .await
            .unwrap();
        let stats = cache.stats().await;
        assert_eq!(stats.entries, 0);
    }
}
