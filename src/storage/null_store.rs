use std::sync::Arc;

use async_trait::async_trait;

use crate::error::StorageError;

use super::blob_store::{BlobStore, BlobStoreListener, ListenerList, ParametersMapping};
use super::tile::{TileObject, TileRange};

/// A store that keeps nothing.
///
/// Writes are accepted and discarded, lookups always miss. Since nothing is
/// ever persisted, no mutation is ever notified. Useful as the backend of a
/// purely in-memory cache.
#[derive(Default)]
pub struct NullBlobStore {
    listeners: ListenerList,
}

impl NullBlobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BlobStore for NullBlobStore {
    async fn get(&self, _obj: &mut TileObject) -> Result<bool, StorageError> {
        Ok(false)
    }

    async fn put(&self, _obj: &TileObject) -> Result<(), StorageError> {
        Ok(())
    }

    async fn delete(&self, _obj: &TileObject) -> Result<bool, StorageError> {
        Ok(false)
    }

    async fn delete_layer(&self, _layer_name: &str) -> Result<bool, StorageError> {
        Ok(false)
    }

    async fn delete_by_grid_set(
        &self,
        _layer_name: &str,
        _grid_set_id: &str,
    ) -> Result<bool, StorageError> {
        Ok(false)
    }

    async fn delete_by_parameters(
        &self,
        _layer_name: &str,
        _parameters_id: &str,
    ) -> Result<bool, StorageError> {
        Ok(false)
    }

    async fn delete_range(&self, _range: &TileRange) -> Result<bool, StorageError> {
        Ok(false)
    }

    async fn rename(
        &self,
        _old_layer_name: &str,
        _new_layer_name: &str,
    ) -> Result<bool, StorageError> {
        Ok(false)
    }

    async fn layer_metadata(
        &self,
        _layer_name: &str,
        _key: &str,
    ) -> Result<Option<String>, StorageError> {
        Ok(None)
    }

    async fn put_layer_metadata(
        &self,
        _layer_name: &str,
        _key: &str,
        _value: &str,
    ) -> Result<(), StorageError> {
        Ok(())
    }

    async fn layer_exists(&self, _layer_name: &str) -> Result<bool, StorageError> {
        Ok(false)
    }

    async fn parameters_mapping(
        &self,
        _layer_name: &str,
    ) -> Result<ParametersMapping, StorageError> {
        Ok(ParametersMapping::new())
    }

    fn add_listener(&self, listener: Arc<dyn BlobStoreListener>) {
        self.listeners.add(listener);
    }

    fn remove_listener(&self, listener: &Arc<dyn BlobStoreListener>) -> bool {
        self.listeners.remove(listener)
    }

    async fn clear(&self) -> Result<(), StorageError> {
        Ok(())
    }

    async fn destroy(&self) {}
}
