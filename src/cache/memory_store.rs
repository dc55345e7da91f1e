//! Caching layer over a blob store.
//!
//! [`MemoryBlobStore`] answers reads from a [`CacheProvider`] and forwards
//! everything else to the wrapped store. The cache never holds data the store
//! no longer has, as far as the store reports its mutations:
//!
//! - writes go to the store first, then a private copy is cached
//! - deletes issued through this layer evict the affected scope even when
//!   the store call fails
//! - mutations made on the wrapped store directly reach the cache through
//!   a [`CacheInvalidationListener`] registered on that store
//!
//! Cache failures never reach callers: they are logged and treated as a miss.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::error::{ConfigError, StorageError};
use crate::storage::{
    BlobStore, BlobStoreDecorator, BlobStoreListener, ByteArrayResource, NullBlobStore,
    ParametersMapping, TileKey, TileObject, TileRange,
};

use super::listener::CacheInvalidationListener;
use super::lru_provider::LruCacheProvider;
use super::provider::{CacheProvider, CacheStatistics, ProviderHandle};
use super::selection::select_cache_provider;

/// [`BlobStore`] serving reads from an in-memory cache.
///
/// # Example
///
/// ```
/// use std::collections::BTreeMap;
/// use std::sync::Arc;
/// use tilestore::cache::MemoryBlobStore;
/// use tilestore::grid::TileIndex;
/// use tilestore::storage::{BlobStore, ByteArrayResource, TileObject, TransientBlobStore};
///
/// #[tokio::main]
/// async fn main() {
///     let store = MemoryBlobStore::wrapping(Arc::new(TransientBlobStore::new()));
///
///     let tile = TileObject::complete(
///         "roads",
///         TileIndex::new(0, 0, 0),
///         "EPSG:4326",
///         "image/png",
///         BTreeMap::new(),
///         Arc::new(ByteArrayResource::new(vec![1, 2, 3])),
///     );
///     store.put(&tile).await.unwrap();
///
///     let mut query = TileObject::from_key(tile.key().clone());
///     assert!(store.get(&mut query).await.unwrap());
///     assert_eq!(query.blob_size(), 3);
/// }
/// ```
pub struct MemoryBlobStore {
    store: BlobStoreDecorator,
    provider: ProviderHandle,

    /// Registered on the wrapped store for as long as it is wrapped
    listener: Arc<dyn BlobStoreListener>,

    /// Preferred provider name for [`configure_from_candidates`](Self::configure_from_candidates)
    provider_name: RwLock<Option<String>>,

    /// Set once a provider was assigned explicitly or selected
    provider_assigned: AtomicBool,
}

impl MemoryBlobStore {
    /// Cache with the built-in provider over a store that keeps nothing.
    pub fn new() -> Self {
        Self::wrapping(Arc::new(NullBlobStore::new()))
    }

    /// Cache with the built-in provider over `store`.
    pub fn wrapping(store: Arc<dyn BlobStore>) -> Self {
        Self::build(store, Arc::new(LruCacheProvider::default()), false)
    }

    /// Cache with an explicitly assigned provider over `store`.
    pub fn with_cache_provider(
        store: Arc<dyn BlobStore>,
        provider: Arc<dyn CacheProvider>,
    ) -> Self {
        Self::build(store, provider, true)
    }

    fn build(store: Arc<dyn BlobStore>, provider: Arc<dyn CacheProvider>, assigned: bool) -> Self {
        let provider = ProviderHandle::new(provider);
        let listener: Arc<dyn BlobStoreListener> =
            Arc::new(CacheInvalidationListener::new(provider.clone()));
        store.add_listener(listener.clone());
        Self {
            store: BlobStoreDecorator::new(store),
            provider,
            listener,
            provider_name: RwLock::new(None),
            provider_assigned: AtomicBool::new(assigned),
        }
    }

    // =========================================================================
    // Configuration
    // =========================================================================

    /// Replace the wrapped store, moving the invalidation listener along.
    pub fn set_store(&self, store: Arc<dyn BlobStore>) {
        self.store.store().remove_listener(&self.listener);
        store.add_listener(self.listener.clone());
        self.store.set_store(store);
    }

    /// The wrapped store.
    pub fn store(&self) -> Arc<dyn BlobStore> {
        self.store.store()
    }

    /// Assign the cache provider explicitly.
    ///
    /// Only one explicit assignment is allowed; it also disables automatic
    /// selection.
    pub fn set_cache_provider(&self, provider: Arc<dyn CacheProvider>) -> Result<(), ConfigError> {
        if self.provider_assigned.swap(true, Ordering::AcqRel) {
            return Err(ConfigError::ProviderAlreadyAssigned(
                self.provider.current().name().to_string(),
            ));
        }
        debug!(provider = provider.name(), "Cache provider assigned");
        self.provider.replace(provider);
        Ok(())
    }

    /// The active cache provider.
    pub fn cache_provider(&self) -> Arc<dyn CacheProvider> {
        self.provider.current()
    }

    /// Name preferred by [`configure_from_candidates`](Self::configure_from_candidates).
    pub fn set_cache_provider_name(&self, name: impl Into<String>) {
        *self.provider_name.write() = Some(name.into());
    }

    /// Pick a provider among `candidates`, unless one was already assigned.
    ///
    /// Returns whether the active provider changed. When no candidate fits,
    /// the built-in provider stays in place.
    pub fn configure_from_candidates(&self, candidates: &[Arc<dyn CacheProvider>]) -> bool {
        if self.provider_assigned.load(Ordering::Acquire) {
            debug!("Cache provider already configured");
            return false;
        }
        let preferred = self.provider_name.read().clone();
        match select_cache_provider(candidates, preferred.as_deref()) {
            Some(provider) => self.set_cache_provider(provider).is_ok(),
            None => false,
        }
    }

    pub async fn cache_statistics(&self) -> CacheStatistics {
        self.provider.current().statistics().await
    }

    // =========================================================================
    // Eviction
    // =========================================================================

    async fn evict_tile(&self, key: &TileKey) {
        if let Err(e) = self.provider.current().remove_tile(key).await {
            warn!(tile = %key, error = %e, "Failed to evict cached tile");
        }
    }

    async fn evict_layer(&self, layer_name: &str) {
        if let Err(e) = self.provider.current().remove_layer(layer_name).await {
            warn!(layer = layer_name, error = %e, "Failed to evict cached layer");
        }
    }

    async fn cache_copy(&self, obj: &TileObject) {
        let provider = self.provider.current();
        if !provider.is_available() {
            // A copy cached before the outage is stale now
            self.evict_tile(obj.key()).await;
            return;
        }
        let cached = match owned_copy(obj) {
            Ok(cached) => cached,
            Err(e) => {
                warn!(tile = %obj.key(), error = %e, "Failed to copy tile for caching");
                self.evict_tile(obj.key()).await;
                return;
            }
        };
        if let Err(e) = provider.put(cached).await {
            warn!(tile = %obj.key(), error = %e, "Failed to cache tile");
            self.evict_tile(obj.key()).await;
        }
    }
}

impl Default for MemoryBlobStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for MemoryBlobStore {
    fn drop(&mut self) {
        self.store.store().remove_listener(&self.listener);
    }
}

/// Copy of `obj` whose payload lives in a buffer of its own.
fn owned_copy(obj: &TileObject) -> Result<TileObject, std::io::Error> {
    let blob = obj.blob().ok_or_else(|| {
        std::io::Error::new(std::io::ErrorKind::InvalidInput, "tile carries no payload")
    })?;
    let mut cached = obj.clone();
    cached.set_blob(Arc::new(ByteArrayResource::copy_of(blob.as_ref())?));
    Ok(cached)
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn get(&self, obj: &mut TileObject) -> Result<bool, StorageError> {
        let provider = self.provider.current();
        if !provider.is_available() {
            debug!(
                tile = %obj.key(),
                provider = provider.name(),
                "Cache unavailable, reading from store"
            );
            return self.store.get(obj).await;
        }
        let cached = match provider.get(obj.key()).await {
            Ok(cached) => cached,
            Err(e) => {
                warn!(tile = %obj.key(), error = %e, "Cache lookup failed, reading from store");
                None
            }
        };

        let cached = match cached {
            Some(cached) => {
                debug!(tile = %obj.key(), "Cache hit");
                cached
            }
            None => {
                debug!(tile = %obj.key(), "Cache miss, reading from store");
                if !self.store.get(obj).await? {
                    return Ok(false);
                }
                let cached = owned_copy(obj)?;
                if let Err(e) = provider.put(cached.clone()).await {
                    warn!(tile = %obj.key(), error = %e, "Failed to cache tile");
                    self.evict_tile(obj.key()).await;
                }
                cached
            }
        };

        if let Some(blob) = cached.blob() {
            obj.set_blob(blob.clone());
        }
        Ok(true)
    }

    async fn put(&self, obj: &TileObject) -> Result<(), StorageError> {
        if let Err(e) = self.store.put(obj).await {
            self.evict_tile(obj.key()).await;
            return Err(e);
        }
        self.cache_copy(obj).await;
        Ok(())
    }

    async fn delete(&self, obj: &TileObject) -> Result<bool, StorageError> {
        let result = self.store.delete(obj).await;
        self.evict_tile(obj.key()).await;
        result
    }

    async fn delete_layer(&self, layer_name: &str) -> Result<bool, StorageError> {
        self.evict_layer(layer_name).await;
        let result = self.store.delete_layer(layer_name).await;
        self.evict_layer(layer_name).await;
        result
    }

    async fn delete_by_grid_set(
        &self,
        layer_name: &str,
        grid_set_id: &str,
    ) -> Result<bool, StorageError> {
        self.evict_layer(layer_name).await;
        let result = self.store.delete_by_grid_set(layer_name, grid_set_id).await;
        self.evict_layer(layer_name).await;
        result
    }

    async fn delete_by_parameters(
        &self,
        layer_name: &str,
        parameters_id: &str,
    ) -> Result<bool, StorageError> {
        let result = self
            .store
            .delete_by_parameters(layer_name, parameters_id)
            .await;
        self.evict_layer(layer_name).await;
        result
    }

    async fn delete_range(&self, range: &TileRange) -> Result<bool, StorageError> {
        // Tiles cached after this point are evicted by the store's notifications
        self.evict_layer(range.layer_name()).await;
        self.store.delete_range(range).await
    }

    async fn rename(
        &self,
        old_layer_name: &str,
        new_layer_name: &str,
    ) -> Result<bool, StorageError> {
        let result = self.store.rename(old_layer_name, new_layer_name).await;
        if matches!(result, Ok(true)) {
            self.evict_layer(old_layer_name).await;
        }
        result
    }

    async fn layer_metadata(
        &self,
        layer_name: &str,
        key: &str,
    ) -> Result<Option<String>, StorageError> {
        self.store.layer_metadata(layer_name, key).await
    }

    async fn put_layer_metadata(
        &self,
        layer_name: &str,
        key: &str,
        value: &str,
    ) -> Result<(), StorageError> {
        self.store.put_layer_metadata(layer_name, key, value).await
    }

    async fn layer_exists(&self, layer_name: &str) -> Result<bool, StorageError> {
        self.store.layer_exists(layer_name).await
    }

    async fn parameters_mapping(
        &self,
        layer_name: &str,
    ) -> Result<ParametersMapping, StorageError> {
        self.store.parameters_mapping(layer_name).await
    }

    fn add_listener(&self, listener: Arc<dyn BlobStoreListener>) {
        self.store.add_listener(listener)
    }

    fn remove_listener(&self, listener: &Arc<dyn BlobStoreListener>) -> bool {
        self.store.remove_listener(listener)
    }

    async fn clear(&self) -> Result<(), StorageError> {
        let result = self.store.clear().await;
        if let Err(e) = self.provider.current().clear().await {
            warn!(error = %e, "Failed to clear cache");
        }
        result
    }

    async fn destroy(&self) {
        self.store.destroy().await;
        self.store.store().remove_listener(&self.listener);
        if let Err(e) = self.provider.current().reset().await {
            warn!(error = %e, "Failed to reset cache provider");
        }
    }
}
