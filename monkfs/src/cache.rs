//! TTL-bounded metadata cache keyed by filesystem path.
//!
//! Holds the last attribute snapshot fetched for a path so that repeated
//! `getattr` calls within the TTL do not hit the network.
//!
//! - Lazy expiry: an entry older than the TTL is reported absent, nothing
//!   sweeps the map in the background.
//! - No negative entries: "not found" is never cached.
//! - Unbounded in entry count.
//! - One reader/writer lock for the whole map, held only for the map access
//!   and never across a remote call.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use tokio::time::Instant;
use tracing::trace;

use crate::api::StatResponse;
use crate::path::parent_path;

struct CacheEntry {
    snapshot: StatResponse,
    inserted_at: Instant,
}

pub struct MetadataCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    ttl: Duration,
}

impl MetadataCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    // Entries are plain snapshots, a poisoned lock leaves nothing half-written.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, CacheEntry>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, CacheEntry>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Snapshot for `path`, or `None` when missing or older than the TTL.
    pub fn get(&self, path: &str) -> Option<StatResponse> {
        let entries = self.read();
        let entry = entries.get(path)?;
        if entry.inserted_at.elapsed() > self.ttl {
            trace!(path, "metadata cache entry expired");
            return None;
        }
        Some(entry.snapshot.clone())
    }

    pub fn set(&self, path: impl Into<String>, snapshot: StatResponse) {
        let entry = CacheEntry {
            snapshot,
            inserted_at: Instant::now(),
        };
        self.write().insert(path.into(), entry);
    }

    /// Drop `path` and every ancestor up to, but excluding, the root.
    pub fn invalidate(&self, path: &str) {
        let mut entries = self.write();
        entries.remove(path);
        let mut current = path;
        while let Some(parent) = parent_path(current) {
            if parent == "/" {
                break;
            }
            entries.remove(parent);
            current = parent;
        }
    }

    pub fn clear(&self) {
        self.write().clear();
    }

    /// Number of stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::FileMetadata;
    use std::sync::Arc;

    fn snapshot(size: u64) -> StatResponse {
        StatResponse {
            file_metadata: FileMetadata {
                size,
                kind: "file".into(),
                ..Default::default()
            },
            kind: "file".into(),
        }
    }

    #[test]
    fn get_after_set() {
        let cache = MetadataCache::new(Duration::from_secs(30));
        assert!(cache.get("/a").is_none());
        cache.set("/a", snapshot(7));
        assert_eq!(cache.get("/a"), Some(snapshot(7)));
    }

    #[test]
    fn set_overwrites() {
        let cache = MetadataCache::new(Duration::from_secs(30));
        cache.set("/a", snapshot(1));
        cache.set("/a", snapshot(2));
        assert_eq!(cache.get("/a").unwrap().file_metadata.size, 2);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn entries_expire_after_ttl() {
        let cache = MetadataCache::new(Duration::from_secs(30));
        cache.set("/a", snapshot(1));

        tokio::time::advance(Duration::from_secs(30)).await;
        assert!(cache.get("/a").is_some(), "age == ttl is still valid");

        tokio::time::advance(Duration::from_millis(1)).await;
        assert!(cache.get("/a").is_none());
        // lazy expiry keeps the stale entry stored
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn refresh_restarts_ttl() {
        let cache = MetadataCache::new(Duration::from_secs(10));
        cache.set("/a", snapshot(1));
        tokio::time::advance(Duration::from_secs(8)).await;
        cache.set("/a", snapshot(2));
        tokio::time::advance(Duration::from_secs(8)).await;
        assert_eq!(cache.get("/a").unwrap().file_metadata.size, 2);
    }

    #[test]
    fn invalidate_cascades_to_ancestors() {
        let cache = MetadataCache::new(Duration::from_secs(30));
        for p in ["/", "/a", "/a/b", "/a/b/c", "/a/x", "/a/b/d", "/z"] {
            cache.set(p, snapshot(0));
        }

        cache.invalidate("/a/b/c");

        for gone in ["/a/b/c", "/a/b", "/a"] {
            assert!(cache.get(gone).is_none(), "{gone} should be invalidated");
        }
        for kept in ["/", "/a/x", "/a/b/d", "/z"] {
            assert!(cache.get(kept).is_some(), "{kept} should be kept");
        }
    }

    #[test]
    fn invalidate_relative_paths() {
        let cache = MetadataCache::new(Duration::from_secs(30));
        for p in ["a", "a/b", "b"] {
            cache.set(p, snapshot(0));
        }
        cache.invalidate("a/b");
        assert!(cache.get("a/b").is_none());
        assert!(cache.get("a").is_none());
        assert!(cache.get("b").is_some());
    }

    #[test]
    fn clear_removes_everything() {
        let cache = MetadataCache::new(Duration::from_secs(30));
        cache.set("/a", snapshot(0));
        cache.set("/b", snapshot(0));
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn concurrent_readers_and_writers() {
        let cache = Arc::new(MetadataCache::new(Duration::from_secs(30)));
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || {
                    for j in 0..200u64 {
                        let path = format!("/dir{}/f{}", i % 2, j % 10);
                        cache.set(path.clone(), snapshot(j));
                        let _ = cache.get(&path);
                        if j % 50 == 0 {
                            cache.invalidate(&path);
                        }
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert!(cache.len() <= 20);
    }
}
