//! Test utilities for integration tests.
//!
//! Mock stores and providers that count calls or fail on demand, plus tile
//! builders.

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use tilestore::cache::{CacheProvider, CacheStatistics, LruCacheProvider};
use tilestore::error::{CacheError, StorageError};
use tilestore::grid::TileIndex;
use tilestore::storage::{
    BlobStore, BlobStoreListener, ByteArrayResource, ParametersMapping, TileKey, TileObject,
    TileRange, TransientBlobStore,
};

pub const GRIDSET: &str = "EPSG:4326";
pub const FORMAT: &str = "image/png";

// =============================================================================
// Tile Builders
// =============================================================================

/// Complete tile at `(x, y, z)` with the given payload.
pub fn tile(layer: &str, x: i64, y: i64, z: u32, payload: &[u8]) -> TileObject {
    TileObject::complete(
        layer,
        TileIndex::new(x, y, z),
        GRIDSET,
        FORMAT,
        BTreeMap::new(),
        Arc::new(ByteArrayResource::new(Bytes::copy_from_slice(payload))),
    )
}

/// Complete tile carrying request parameters.
pub fn styled_tile(layer: &str, x: i64, style: &str, payload: &[u8]) -> TileObject {
    let mut parameters = BTreeMap::new();
    parameters.insert("STYLES".to_string(), style.to_string());
    TileObject::complete(
        layer,
        TileIndex::new(x, 0, 0),
        GRIDSET,
        FORMAT,
        parameters,
        Arc::new(ByteArrayResource::new(Bytes::copy_from_slice(payload))),
    )
}

/// Identity-only copy of a tile, for lookups.
pub fn query_of(obj: &TileObject) -> TileObject {
    TileObject::from_key(obj.key().clone())
}

/// Identity-only tile at `(x, y, z)`.
pub fn query(layer: &str, x: i64, y: i64, z: u32) -> TileObject {
    TileObject::from_key(TileKey::new(layer, GRIDSET, FORMAT, None, TileIndex::new(x, y, z)))
}

// =============================================================================
// Tracking Blob Store
// =============================================================================

/// A transient store that counts lookups and can be told to fail.
///
/// Listeners are registered on the inner store, so notifications behave
/// exactly as for [`TransientBlobStore`].
#[derive(Default)]
pub struct TrackingBlobStore {
    inner: TransientBlobStore,
    get_count: AtomicUsize,
    fail_writes: AtomicBool,
    fail_deletes: AtomicBool,
}

impl TrackingBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inner(&self) -> &TransientBlobStore {
        &self.inner
    }

    pub fn get_count(&self) -> usize {
        self.get_count.load(Ordering::SeqCst)
    }

    pub fn reset_tracking(&self) {
        self.get_count.store(0, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    fn check_delete(&self) -> Result<(), StorageError> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(StorageError::Backend("delete refused".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl BlobStore for TrackingBlobStore {
    async fn get(&self, obj: &mut TileObject) -> Result<bool, StorageError> {
        self.get_count.fetch_add(1, Ordering::SeqCst);
        self.inner.get(obj).await
    }

    async fn put(&self, obj: &TileObject) -> Result<(), StorageError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::Backend("write refused".to_string()));
        }
        self.inner.put(obj).await
    }

    async fn delete(&self, obj: &TileObject) -> Result<bool, StorageError> {
        self.check_delete()?;
        self.inner.delete(obj).await
    }

    async fn delete_layer(&self, layer_name: &str) -> Result<bool, StorageError> {
        self.check_delete()?;
        self.inner.delete_layer(layer_name).await
    }

    async fn delete_by_grid_set(
        &self,
        layer_name: &str,
        grid_set_id: &str,
    ) -> Result<bool, StorageError> {
        self.check_delete()?;
        self.inner.delete_by_grid_set(layer_name, grid_set_id).await
    }

    async fn delete_by_parameters(
        &self,
        layer_name: &str,
        parameters_id: &str,
    ) -> Result<bool, StorageError> {
        self.check_delete()?;
        self.inner
            .delete_by_parameters(layer_name, parameters_id)
            .await
    }

    async fn delete_range(&self, range: &TileRange) -> Result<bool, StorageError> {
        self.check_delete()?;
        self.inner.delete_range(range).await
    }

    async fn rename(
        &self,
        old_layer_name: &str,
        new_layer_name: &str,
    ) -> Result<bool, StorageError> {
        self.inner.rename(old_layer_name, new_layer_name).await
    }

    async fn layer_metadata(
        &self,
        layer_name: &str,
        key: &str,
    ) -> Result<Option<String>, StorageError> {
        self.inner.layer_metadata(layer_name, key).await
    }

    async fn put_layer_metadata(
        &self,
        layer_name: &str,
        key: &str,
        value: &str,
    ) -> Result<(), StorageError> {
        self.inner.put_layer_metadata(layer_name, key, value).await
    }

    async fn layer_exists(&self, layer_name: &str) -> Result<bool, StorageError> {
        self.inner.layer_exists(layer_name).await
    }

    async fn parameters_mapping(
        &self,
        layer_name: &str,
    ) -> Result<ParametersMapping, StorageError> {
        self.inner.parameters_mapping(layer_name).await
    }

    fn add_listener(&self, listener: Arc<dyn BlobStoreListener>) {
        self.inner.add_listener(listener);
    }

    fn remove_listener(&self, listener: &Arc<dyn BlobStoreListener>) -> bool {
        self.inner.remove_listener(listener)
    }

    async fn clear(&self) -> Result<(), StorageError> {
        self.check_delete()?;
        self.inner.clear().await
    }

    async fn destroy(&self) {
        self.inner.destroy().await
    }
}

// =============================================================================
// Failing Cache Provider
// =============================================================================

/// A provider whose every operation fails.
pub struct FailingCacheProvider {
    calls: AtomicUsize,
}

impl FailingCacheProvider {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn fail<T>(&self) -> Result<T, CacheError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(CacheError::Provider("cache offline".to_string()))
    }
}

#[async_trait]
impl CacheProvider for FailingCacheProvider {
    async fn get(&self, _key: &TileKey) -> Result<Option<TileObject>, CacheError> {
        self.fail()
    }

    async fn put(&self, _obj: TileObject) -> Result<(), CacheError> {
        self.fail()
    }

    async fn remove_tile(&self, _key: &TileKey) -> Result<bool, CacheError> {
        self.fail()
    }

    async fn remove_layer(&self, _layer_name: &str) -> Result<(), CacheError> {
        self.fail()
    }

    async fn clear(&self) -> Result<(), CacheError> {
        self.fail()
    }

    async fn reset(&self) -> Result<(), CacheError> {
        self.fail()
    }

    async fn statistics(&self) -> CacheStatistics {
        CacheStatistics::default()
    }

    fn is_available(&self) -> bool {
        true
    }

    fn name(&self) -> &str {
        "failing"
    }
}

// =============================================================================
// Switchable Cache Provider
// =============================================================================

/// An LRU provider that can be taken offline.
pub struct SwitchableCacheProvider {
    inner: LruCacheProvider,
    online: AtomicBool,
}

impl SwitchableCacheProvider {
    pub fn new() -> Self {
        Self {
            inner: LruCacheProvider::new(),
            online: AtomicBool::new(true),
        }
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    pub fn inner(&self) -> &LruCacheProvider {
        &self.inner
    }
}

#[async_trait]
impl CacheProvider for SwitchableCacheProvider {
    async fn get(&self, key: &TileKey) -> Result<Option<TileObject>, CacheError> {
        self.inner.get(key).await
    }

    async fn put(&self, obj: TileObject) -> Result<(), CacheError> {
        self.inner.put(obj).await
    }

    async fn remove_tile(&self, key: &TileKey) -> Result<bool, CacheError> {
        self.inner.remove_tile(key).await
    }

    async fn remove_layer(&self, layer_name: &str) -> Result<(), CacheError> {
        self.inner.remove_layer(layer_name).await
    }

    async fn clear(&self) -> Result<(), CacheError> {
        self.inner.clear().await
    }

    async fn reset(&self) -> Result<(), CacheError> {
        self.inner.reset().await
    }

    async fn statistics(&self) -> CacheStatistics {
        self.inner.statistics().await
    }

    fn is_available(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    fn name(&self) -> &str {
        "switchable"
    }
}
