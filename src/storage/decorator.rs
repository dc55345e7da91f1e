use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::warn;

use crate::error::StorageError;

use super::blob_store::{BlobStore, BlobStoreListener, ParametersMapping};
use super::tile::{TileObject, TileRange};

/// Pass-through [`BlobStore`] wrapping exactly one other store.
///
/// Every call is forwarded unchanged. Layers that add behavior (caching,
/// metrics, read-only enforcement) own a decorator and intercept only the
/// operations they care about.
///
/// The wrapped store is meant to be set once, before first use. Replacing it
/// after a call has been forwarded works but is reported as a configuration
/// problem.
pub struct BlobStoreDecorator {
    delegate: RwLock<Arc<dyn BlobStore>>,
    in_use: AtomicBool,
}

impl BlobStoreDecorator {
    pub fn new(delegate: Arc<dyn BlobStore>) -> Self {
        Self {
            delegate: RwLock::new(delegate),
            in_use: AtomicBool::new(false),
        }
    }

    /// Replace the wrapped store.
    pub fn set_store(&self, delegate: Arc<dyn BlobStore>) {
        if self.in_use.load(Ordering::Acquire) {
            warn!(
                "Wrapped blob store replaced after first use; in-flight callers may still see the previous store"
            );
        }
        *self.delegate.write() = delegate;
    }

    /// The wrapped store.
    pub fn store(&self) -> Arc<dyn BlobStore> {
        self.delegate.read().clone()
    }

    fn target(&self) -> Arc<dyn BlobStore> {
        self.in_use.store(true, Ordering::Release);
        self.store()
    }
}

#[async_trait]
impl BlobStore for BlobStoreDecorator {
    async fn get(&self, obj: &mut TileObject) -> Result<bool, StorageError> {
        self.target().get(obj).await
    }

    async fn put(&self, obj: &TileObject) -> Result<(), StorageError> {
        self.target().put(obj).await
    }

    async fn delete(&self, obj: &TileObject) -> Result<bool, StorageError> {
        self.target().delete(obj).await
    }

    async fn delete_layer(&self, layer_name: &str) -> Result<bool, StorageError> {
        self.target().delete_layer(layer_name).await
    }

    async fn delete_by_grid_set(
        &self,
        layer_name: &str,
        grid_set_id: &str,
    ) -> Result<bool, StorageError> {
        self.target()
            .delete_by_grid_set(layer_name, grid_set_id)
            .await
    }

    async fn delete_by_parameters(
        &self,
        layer_name: &str,
        parameters_id: &str,
    ) -> Result<bool, StorageError> {
        self.target()
            .delete_by_parameters(layer_name, parameters_id)
            .await
    }

    async fn delete_range(&self, range: &TileRange) -> Result<bool, StorageError> {
        self.target().delete_range(range).await
    }

    async fn rename(
        &self,
        old_layer_name: &str,
        new_layer_name: &str,
    ) -> Result<bool, StorageError> {
        self.target().rename(old_layer_name, new_layer_name).await
    }

    async fn layer_metadata(
        &self,
        layer_name: &str,
        key: &str,
    ) -> Result<Option<String>, StorageError> {
        self.target().layer_metadata(layer_name, key).await
    }

    async fn put_layer_metadata(
        &self,
        layer_name: &str,
        key: &str,
        value: &str,
    ) -> Result<(), StorageError> {
        self.target()
            .put_layer_metadata(layer_name, key, value)
            .await
    }

    async fn layer_exists(&self, layer_name: &str) -> Result<bool, StorageError> {
        self.target().layer_exists(layer_name).await
    }

    async fn parameters_mapping(
        &self,
        layer_name: &str,
    ) -> Result<ParametersMapping, StorageError> {
        self.target().parameters_mapping(layer_name).await
    }

    fn add_listener(&self, listener: Arc<dyn BlobStoreListener>) {
        self.target().add_listener(listener)
    }

    fn remove_listener(&self, listener: &Arc<dyn BlobStoreListener>) -> bool {
        self.target().remove_listener(listener)
    }

    async fn clear(&self) -> Result<(), StorageError> {
        self.target().clear().await
    }

    async fn destroy(&self) {
        self.target().destroy().await
    }
}
