//! Built-in bounded tile cache.
//!
//! Entries are kept in least-recently-used order and bounded both by total
//! payload bytes and by entry count. Two optional expiry policies drop
//! entries that were written, or last read, longer ago than a configured
//! time.
//!
//! # Size-Based Eviction
//!
//! The provider tracks the payload size of every entry and evicts
//! least-recently-used entries until the total is within budget. A tile
//! larger than the whole budget is never cached.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use lru::LruCache;
use tokio::sync::RwLock;
use tracing::debug;

use crate::config::{CacheConfig, EvictionPolicy};
use crate::error::CacheError;
use crate::storage::{TileKey, TileObject};

use super::provider::{CacheProvider, CacheStatistics};

/// Name under which the built-in provider is selected.
pub const LRU_PROVIDER_NAME: &str = "lru";

/// Default byte budget: 16MB
pub const DEFAULT_HARD_MEMORY_LIMIT_MB: u64 = 16;

/// Default maximum number of entries
pub const DEFAULT_MAX_ENTRIES: usize = 100_000;

/// Default expiry time for the expiring policies
pub const DEFAULT_EVICTION_TIME_SECS: u64 = 120;

/// Bytes in one MB of the configured budget
pub const BYTES_PER_MB: u64 = 1024 * 1024;

// =============================================================================
// Entries
// =============================================================================

struct CachedTile {
    tile: TileObject,
    size: u64,
    written: Instant,
    accessed: Instant,
}

impl CachedTile {
    fn is_expired(&self, policy: EvictionPolicy, ttl: Duration, now: Instant) -> bool {
        match policy {
            EvictionPolicy::Lru => false,
            EvictionPolicy::ExpireAfterWrite => now.duration_since(self.written) >= ttl,
            EvictionPolicy::ExpireAfterAccess => now.duration_since(self.accessed) >= ttl,
        }
    }
}

struct Entries {
    cache: LruCache<TileKey, CachedTile>,
    current_size: u64,
}

impl Entries {
    fn pop(&mut self, key: &TileKey) -> bool {
        match self.cache.pop(key) {
            Some(entry) => {
                self.current_size = self.current_size.saturating_sub(entry.size);
                true
            }
            None => false,
        }
    }
}

// =============================================================================
// Provider
// =============================================================================

/// LRU [`CacheProvider`] with a byte budget.
///
/// # Example
///
/// ```
/// use std::collections::BTreeMap;
/// use std::sync::Arc;
/// use tilestore::cache::{CacheProvider, LruCacheProvider};
/// use tilestore::grid::TileIndex;
/// use tilestore::storage::{ByteArrayResource, TileObject};
///
/// #[tokio::main]
/// async fn main() {
///     let cache = LruCacheProvider::with_capacity(1024 * 1024);
///
///     let tile = TileObject::complete(
///         "roads",
///         TileIndex::new(0, 0, 0),
///         "EPSG:4326",
///         "image/png",
///         BTreeMap::new(),
///         Arc::new(ByteArrayResource::new(vec![0x89, 0x50, 0x4E, 0x47])),
///     );
///     let key = tile.key().clone();
///
///     cache.put(tile).await.unwrap();
///     let cached = cache.get(&key).await.unwrap();
///     assert_eq!(cached.map(|t| t.blob_size()), Some(4));
/// }
/// ```
pub struct LruCacheProvider {
    entries: RwLock<Entries>,

    /// Maximum total payload size in bytes
    max_size: u64,

    policy: EvictionPolicy,
    ttl: Duration,

    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl LruCacheProvider {
    /// Provider with the default budget and plain LRU eviction.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_HARD_MEMORY_LIMIT_MB * BYTES_PER_MB)
    }

    /// Provider with a byte budget and plain LRU eviction.
    pub fn with_capacity(max_size: u64) -> Self {
        Self::with_policy(
            max_size,
            DEFAULT_MAX_ENTRIES,
            EvictionPolicy::Lru,
            Duration::from_secs(DEFAULT_EVICTION_TIME_SECS),
        )
    }

    /// Fully parameterized provider. `max_entries` of zero is treated as one.
    pub fn with_policy(
        max_size: u64,
        max_entries: usize,
        policy: EvictionPolicy,
        ttl: Duration,
    ) -> Self {
        let max_entries = NonZeroUsize::new(max_entries).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: RwLock::new(Entries {
                cache: LruCache::new(max_entries),
                current_size: 0,
            }),
            max_size,
            policy,
            ttl,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    /// Provider configured from validated settings.
    ///
    /// A byte budget past `u64::MAX` is clamped to it.
    pub fn from_config(config: &CacheConfig) -> Self {
        Self::with_policy(
            config.hard_memory_limit_mb.saturating_mul(BYTES_PER_MB),
            config.max_entries,
            config.eviction_policy,
            Duration::from_secs(config.eviction_time_secs),
        )
    }

    /// Number of cached tiles.
    pub async fn len(&self) -> usize {
        self.entries.read().await.cache.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.cache.is_empty()
    }

    /// Bytes currently held.
    pub async fn size(&self) -> u64 {
        self.entries.read().await.current_size
    }

    /// Byte budget.
    pub fn capacity(&self) -> u64 {
        self.max_size
    }

    /// Whether a tile is cached, without touching its recency.
    pub async fn contains(&self, key: &TileKey) -> bool {
        self.entries.read().await.cache.contains(key)
    }

    /// Drop every expired entry. Returns how many were dropped.
    pub async fn purge_expired(&self) -> usize {
        if self.policy == EvictionPolicy::Lru {
            return 0;
        }
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        let expired: Vec<TileKey> = entries
            .cache
            .iter()
            .filter(|(_, entry)| entry.is_expired(self.policy, self.ttl, now))
            .map(|(key, _)| key.clone())
            .collect();
        for key in &expired {
            entries.pop(key);
        }
        self.evictions
            .fetch_add(expired.len() as u64, Ordering::Relaxed);
        expired.len()
    }
}

impl Default for LruCacheProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheProvider for LruCacheProvider {
    async fn get(&self, key: &TileKey) -> Result<Option<TileObject>, CacheError> {
        let now = Instant::now();
        let mut entries = self.entries.write().await;

        let expired = match entries.cache.get_mut(key) {
            Some(entry) if !entry.is_expired(self.policy, self.ttl, now) => {
                entry.accessed = now;
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Ok(Some(entry.tile.clone()));
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            entries.pop(key);
            self.evictions.fetch_add(1, Ordering::Relaxed);
            debug!(tile = %key, "Cached tile expired");
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        Ok(None)
    }

    async fn put(&self, obj: TileObject) -> Result<(), CacheError> {
        let size = obj.blob_size();
        let key = obj.key().clone();
        let mut entries = self.entries.write().await;

        // Subtract the replaced entry first
        entries.pop(&key);

        if size > self.max_size {
            debug!(
                tile = %key,
                size,
                budget = self.max_size,
                "Tile larger than cache budget, not cached"
            );
            return Ok(());
        }

        let now = Instant::now();
        let entry = CachedTile {
            tile: obj,
            size,
            written: now,
            accessed: now,
        };

        // The entry-count bound may push out the least recently used entry
        if let Some((_, evicted)) = entries.cache.push(key, entry) {
            entries.current_size = entries.current_size.saturating_sub(evicted.size);
            self.evictions.fetch_add(1, Ordering::Relaxed);
        }
        entries.current_size += size;

        while entries.current_size > self.max_size {
            match entries.cache.pop_lru() {
                Some((_, evicted)) => {
                    entries.current_size = entries.current_size.saturating_sub(evicted.size);
                    self.evictions.fetch_add(1, Ordering::Relaxed);
                }
                None => break,
            }
        }
        Ok(())
    }

    async fn remove_tile(&self, key: &TileKey) -> Result<bool, CacheError> {
        Ok(self.entries.write().await.pop(key))
    }

    async fn remove_layer(&self, layer_name: &str) -> Result<(), CacheError> {
        let mut entries = self.entries.write().await;
        let keys: Vec<TileKey> = entries
            .cache
            .iter()
            .filter(|(key, _)| &*key.layer_name == layer_name)
            .map(|(key, _)| key.clone())
            .collect();
        for key in &keys {
            entries.pop(key);
        }
        debug!(layer = layer_name, removed = keys.len(), "Evicted layer from cache");
        Ok(())
    }

    async fn clear(&self) -> Result<(), CacheError> {
        let mut entries = self.entries.write().await;
        entries.cache.clear();
        entries.current_size = 0;
        Ok(())
    }

    async fn reset(&self) -> Result<(), CacheError> {
        self.clear().await?;
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        self.evictions.store(0, Ordering::Relaxed);
        Ok(())
    }

    async fn statistics(&self) -> CacheStatistics {
        let entries = self.entries.read().await;
        CacheStatistics::from_counters(
            self.hits.load(Ordering::Relaxed),
            self.misses.load(Ordering::Relaxed),
            self.evictions.load(Ordering::Relaxed),
            self.max_size,
            entries.current_size,
            entries.cache.len() as u64,
        )
    }

    fn is_available(&self) -> bool {
        true
    }

    fn name(&self) -> &str {
        LRU_PROVIDER_NAME
    }

    fn is_default(&self) -> bool {
        true
    }
}

// =============================================================================
// Tests
// =============================================================================
