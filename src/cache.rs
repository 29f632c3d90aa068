//! Memoization shared by the registry, the town database and the resolver.
//!
//! Two kinds of cache live here:
//! * [`KeyedCache`]: a bounded LRU map for string keyed lookups (detected
//!   country names, county regexes, parsed place strings, town guesses).
//! * [`ContentCache`]: an unbounded map keyed by a content hash, used for the
//!   per-dataset town database that is expensive to build and never changes
//!   for the same input.
//!
//! A single process-wide switch ([`set_cache_enabled`]) turns every cache off,
//! which forces recomputation on each call. Handy when checking that cached
//! and fresh answers agree.

use lru::LruCache;
use serde::Serialize;
use std::collections::HashMap;
use std::hash::Hash;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info};

static CACHE_ENABLED: AtomicBool = AtomicBool::new(true);

pub fn set_cache_enabled(enabled: bool) {
    CACHE_ENABLED.store(enabled, Ordering::SeqCst);
    info!(enabled, "cache layer toggled");
}
pub fn cache_enabled() -> bool {
    CACHE_ENABLED.load(Ordering::Relaxed)
}

/// The independently invalidatable groups of cached data.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum CacheCategory {
    CountryName,
    CountyRegex,
    TownDatabase,
    PlaceParts,
    TownGuess,
}

// caches only hold derived data, so a poisoned lock is still usable
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: usize,
    pub misses: usize,
    pub entries: usize,
}

// ------------- KeyedCache -------------
pub struct KeyedCache<K: Hash + Eq, V: Clone> {
    cache: Mutex<LruCache<K, V>>,
    hits: AtomicUsize,
    misses: AtomicUsize,
}

impl<K: Hash + Eq, V: Clone> KeyedCache<K, V> {
    pub const DEFAULT_CAPACITY: usize = 1024;

    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity)
            .or(NonZeroUsize::new(Self::DEFAULT_CAPACITY))
            .unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: Mutex::new(LruCache::new(capacity)),
            hits: AtomicUsize::new(0),
            misses: AtomicUsize::new(0),
        }
    }
    /// Returns the cached value or computes and keeps it. The computation runs
    /// without holding the lock, so it may consult other caches.
    pub fn get_or_insert_with<F: FnOnce() -> V>(&self, key: K, compute: F) -> V {
        if !cache_enabled() {
            return compute();
        }
        if let Some(value) = lock(&self.cache).get(&key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return value.clone();
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        let value = compute();
        lock(&self.cache).put(key, value.clone());
        value
    }
    pub fn clear(&self) {
        lock(&self.cache).clear();
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
    }
    pub fn len(&self) -> usize {
        lock(&self.cache).len()
    }
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.len(),
        }
    }
}

// ------------- ContentCache -------------
pub struct ContentCache<V> {
    kept: Mutex<HashMap<blake3::Hash, Arc<V>>>,
}

impl<V> ContentCache<V> {
    pub fn new() -> Self {
        Self {
            kept: Mutex::new(HashMap::new()),
        }
    }
    pub fn get_or_build<F: FnOnce() -> V>(&self, key: blake3::Hash, build: F) -> Arc<V> {
        if !cache_enabled() {
            return Arc::new(build());
        }
        if let Some(kept) = lock(&self.kept).get(&key) {
            return Arc::clone(kept);
        }
        debug!(key = %key.to_hex(), "building content addressed entry");
        let built = Arc::new(build());
        Arc::clone(lock(&self.kept).entry(key).or_insert(built))
    }
    pub fn clear(&self) {
        lock(&self.kept).clear();
    }
    pub fn len(&self) -> usize {
        lock(&self.kept).len()
    }
}

impl<V> Default for ContentCache<V> {
    fn default() -> Self {
        Self::new()
    }
}
