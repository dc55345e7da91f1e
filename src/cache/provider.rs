//! Cache provider contract.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::Serialize;

use crate::error::CacheError;
use crate::storage::{TileKey, TileObject};

/// Point-in-time counters of a cache provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CacheStatistics {
    pub hit_count: u64,
    pub miss_count: u64,
    /// Entries dropped for capacity or expiry (explicit removals excluded)
    pub eviction_count: u64,
    pub request_count: u64,
    /// Hit percentage of all requests, 0 when there were none
    pub hit_rate: f64,
    pub miss_rate: f64,
    /// Byte budget
    pub total_size: u64,
    /// Bytes currently held
    pub actual_size: u64,
    pub entry_count: u64,
    /// `actual_size` as a percentage of `total_size`
    pub memory_occupation: f64,
}

impl CacheStatistics {
    /// Build statistics from raw counters, deriving the rates.
    pub fn from_counters(
        hit_count: u64,
        miss_count: u64,
        eviction_count: u64,
        total_size: u64,
        actual_size: u64,
        entry_count: u64,
    ) -> Self {
        let request_count = hit_count + miss_count;
        let (hit_rate, miss_rate) = if request_count == 0 {
            (0.0, 0.0)
        } else {
            let hits = hit_count as f64 * 100.0 / request_count as f64;
            (hits, 100.0 - hits)
        };
        let memory_occupation = if total_size == 0 {
            0.0
        } else {
            actual_size as f64 * 100.0 / total_size as f64
        };
        Self {
            hit_count,
            miss_count,
            eviction_count,
            request_count,
            hit_rate,
            miss_rate,
            total_size,
            actual_size,
            entry_count,
            memory_occupation,
        }
    }
}

/// Pluggable in-memory tile cache used by
/// [`MemoryBlobStore`](super::MemoryBlobStore).
///
/// Stored objects must own their payload: the caching layer hands in
/// defensive copies and expects a provider never to share buffers with
/// callers. Failures are reported as [`CacheError`] and absorbed by the
/// caching layer as misses.
#[async_trait]
pub trait CacheProvider: Send + Sync {
    /// Look up a tile.
    async fn get(&self, key: &TileKey) -> Result<Option<TileObject>, CacheError>;

    /// Insert or replace a tile.
    async fn put(&self, obj: TileObject) -> Result<(), CacheError>;

    /// Drop one tile. Returns whether it was cached.
    async fn remove_tile(&self, key: &TileKey) -> Result<bool, CacheError>;

    /// Drop every tile of a layer.
    async fn remove_layer(&self, layer_name: &str) -> Result<(), CacheError>;

    /// Drop every tile.
    async fn clear(&self) -> Result<(), CacheError>;

    /// Drop every tile and zero the statistics.
    async fn reset(&self) -> Result<(), CacheError>;

    async fn statistics(&self) -> CacheStatistics;

    /// Whether the provider can serve requests in this environment.
    fn is_available(&self) -> bool;

    /// Name used for explicit selection.
    fn name(&self) -> &str;

    /// Whether this is the built-in provider.
    fn is_default(&self) -> bool {
        false
    }
}

/// Shared, swappable reference to the active provider.
///
/// The caching layer and its invalidation listener hold clones of the same
/// handle, so replacing the provider is seen by both.
#[derive(Clone)]
pub struct ProviderHandle {
    inner: Arc<RwLock<Arc<dyn CacheProvider>>>,
}

impl ProviderHandle {
    pub fn new(provider: Arc<dyn CacheProvider>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(provider)),
        }
    }

    /// The active provider. The lock is released before returning.
    pub fn current(&self) -> Arc<dyn CacheProvider> {
        self.inner.read().clone()
    }

    pub fn replace(&self, provider: Arc<dyn CacheProvider>) {
        *self.inner.write() = provider;
    }
}
