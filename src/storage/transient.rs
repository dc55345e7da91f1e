//! Process-memory blob store.
//!
//! Implements the full [`BlobStore`] contract, including listener
//! notifications, without any persistence. Serves as the reference backend
//! for the caching layer and for anything that needs a working store
//! without a filesystem or object storage.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tracing::debug;

use crate::error::StorageError;

use super::blob_store::{
    BlobStore, BlobStoreListener, ListenerList, ParametersMapping, TileEvent,
};
use super::tile::{ByteArrayResource, TileKey, TileObject, TileRange};

#[derive(Debug, Clone)]
struct StoredTile {
    data: Bytes,
    last_modified: DateTime<Utc>,
}

#[derive(Default)]
struct State {
    tiles: HashMap<TileKey, StoredTile>,
    /// layer -> key -> value
    metadata: HashMap<String, HashMap<String, String>>,
    /// layer -> parameters id -> parameters
    parameters: HashMap<String, ParametersMapping>,
}

impl State {
    fn has_layer(&self, layer_name: &str) -> bool {
        self.metadata.contains_key(layer_name)
            || self.tiles.keys().any(|k| &*k.layer_name == layer_name)
    }

    /// Remove matching tiles, returning their keys and sizes.
    fn remove_tiles<F>(&mut self, predicate: F) -> Vec<(TileKey, u64)>
    where
        F: Fn(&TileKey) -> bool,
    {
        let keys: Vec<TileKey> = self.tiles.keys().filter(|&k| predicate(k)).cloned().collect();
        keys.into_iter()
            .filter_map(|key| {
                self.tiles
                    .remove(&key)
                    .map(|tile| (key, tile.data.len() as u64))
            })
            .collect()
    }
}

/// A [`BlobStore`] keeping tiles in a hash map.
#[derive(Default)]
pub struct TransientBlobStore {
    state: RwLock<State>,
    listeners: ListenerList,
    destroyed: AtomicBool,
}

impl TransientBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored tiles.
    pub fn tile_count(&self) -> usize {
        self.state.read().tiles.len()
    }

    /// Number of stored tiles of one layer.
    pub fn layer_tile_count(&self, layer_name: &str) -> usize {
        self.state
            .read()
            .tiles
            .keys()
            .filter(|k| &*k.layer_name == layer_name)
            .count()
    }

    /// Number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    fn check_alive(&self) -> Result<(), StorageError> {
        if self.destroyed.load(Ordering::Acquire) {
            return Err(StorageError::Destroyed);
        }
        Ok(())
    }
}

#[async_trait]
impl BlobStore for TransientBlobStore {
    async fn get(&self, obj: &mut TileObject) -> Result<bool, StorageError> {
        self.check_alive()?;
        let stored = self.state.read().tiles.get(obj.key()).cloned();
        match stored {
            Some(tile) => {
                let resource =
                    ByteArrayResource::new(tile.data).with_last_modified(tile.last_modified);
                obj.set_blob(Arc::new(resource));
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn put(&self, obj: &TileObject) -> Result<(), StorageError> {
        self.check_alive()?;
        let data = obj.contents()?.ok_or_else(|| {
            StorageError::Backend(format!("{} carries no payload", obj))
        })?;
        let last_modified = obj.created().unwrap_or_else(Utc::now);
        let size = data.len() as u64;

        let previous = {
            let mut state = self.state.write();
            if let Some(id) = obj.parameters_id() {
                let mapping = state
                    .parameters
                    .entry(obj.layer_name().to_string())
                    .or_default();
                let recorded = mapping.entry(id.to_string()).or_insert(None);
                if recorded.is_none() && !obj.parameters().is_empty() {
                    *recorded = Some(obj.parameters().clone());
                }
            }
            state.tiles.insert(
                obj.key().clone(),
                StoredTile {
                    data,
                    last_modified,
                },
            )
        };

        let event = TileEvent::new(obj.key(), size);
        match previous {
            Some(old) => {
                self.listeners
                    .notify_tile_updated(&event, old.data.len() as u64)
                    .await
            }
            None => self.listeners.notify_tile_stored(&event).await,
        }
        Ok(())
    }

    async fn delete(&self, obj: &TileObject) -> Result<bool, StorageError> {
        self.check_alive()?;
        let removed = self.state.write().tiles.remove(obj.key());
        match removed {
            Some(tile) => {
                let event = TileEvent::new(obj.key(), tile.data.len() as u64);
                self.listeners.notify_tile_deleted(&event).await;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_layer(&self, layer_name: &str) -> Result<bool, StorageError> {
        self.check_alive()?;
        let existed = {
            let mut state = self.state.write();
            let tiles = state.remove_tiles(|k| &*k.layer_name == layer_name);
            let metadata = state.metadata.remove(layer_name).is_some();
            let parameters = state.parameters.remove(layer_name).is_some();
            !tiles.is_empty() || metadata || parameters
        };
        if existed {
            debug!(layer = layer_name, "Layer deleted");
            self.listeners.notify_layer_deleted(layer_name).await;
        }
        Ok(existed)
    }

    async fn delete_by_grid_set(
        &self,
        layer_name: &str,
        grid_set_id: &str,
    ) -> Result<bool, StorageError> {
        self.check_alive()?;
        let removed = self.state.write().remove_tiles(|k| {
            &*k.layer_name == layer_name && &*k.grid_set_id == grid_set_id
        });
        if removed.is_empty() {
            return Ok(false);
        }
        self.listeners
            .notify_grid_subset_deleted(layer_name, grid_set_id)
            .await;
        Ok(true)
    }

    async fn delete_by_parameters(
        &self,
        layer_name: &str,
        parameters_id: &str,
    ) -> Result<bool, StorageError> {
        self.check_alive()?;
        let existed = {
            let mut state = self.state.write();
            let tiles = state.remove_tiles(|k| {
                &*k.layer_name == layer_name && k.parameters_id.as_deref() == Some(parameters_id)
            });
            let mapping = state
                .parameters
                .get_mut(layer_name)
                .map(|m| m.remove(parameters_id).is_some())
                .unwrap_or(false);
            !tiles.is_empty() || mapping
        };
        if existed {
            self.listeners
                .notify_parameters_deleted(layer_name, parameters_id)
                .await;
        }
        Ok(existed)
    }

    async fn delete_range(&self, range: &TileRange) -> Result<bool, StorageError> {
        self.check_alive()?;
        let removed = self.state.write().remove_tiles(|k| range.contains(k));
        for (key, size) in &removed {
            self.listeners
                .notify_tile_deleted(&TileEvent::new(key, *size))
                .await;
        }
        Ok(!removed.is_empty())
    }

    async fn rename(
        &self,
        old_layer_name: &str,
        new_layer_name: &str,
    ) -> Result<bool, StorageError> {
        self.check_alive()?;
        let renamed = {
            let mut state = self.state.write();
            if !state.has_layer(old_layer_name) || state.has_layer(new_layer_name) {
                false
            } else {
                let new_name: Arc<str> = Arc::from(new_layer_name);
                let moved: Vec<(TileKey, StoredTile)> = {
                    let keys: Vec<TileKey> = state
                        .tiles
                        .keys()
                        .filter(|k| &*k.layer_name == old_layer_name)
                        .cloned()
                        .collect();
                    keys.into_iter()
                        .filter_map(|k| state.tiles.remove(&k).map(|t| (k, t)))
                        .collect()
                };
                for (mut key, tile) in moved {
                    key.layer_name = new_name.clone();
                    state.tiles.insert(key, tile);
                }
                if let Some(metadata) = state.metadata.remove(old_layer_name) {
                    state.metadata.insert(new_layer_name.to_string(), metadata);
                }
                if let Some(parameters) = state.parameters.remove(old_layer_name) {
                    state
                        .parameters
                        .insert(new_layer_name.to_string(), parameters);
                }
                true
            }
        };
        if renamed {
            self.listeners
                .notify_layer_renamed(old_layer_name, new_layer_name)
                .await;
        }
        Ok(renamed)
    }

    async fn layer_metadata(
        &self,
        layer_name: &str,
        key: &str,
    ) -> Result<Option<String>, StorageError> {
        self.check_alive()?;
        Ok(self
            .state
            .read()
            .metadata
            .get(layer_name)
            .and_then(|m| m.get(key).cloned()))
    }

    async fn put_layer_metadata(
        &self,
        layer_name: &str,
        key: &str,
        value: &str,
    ) -> Result<(), StorageError> {
        self.check_alive()?;
        self.state
            .write()
            .metadata
            .entry(layer_name.to_string())
            .or_default()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn layer_exists(&self, layer_name: &str) -> Result<bool, StorageError> {
        self.check_alive()?;
        Ok(self.state.read().has_layer(layer_name))
    }

    async fn parameters_mapping(
        &self,
        layer_name: &str,
    ) -> Result<ParametersMapping, StorageError> {
        self.check_alive()?;
        Ok(self
            .state
            .read()
            .parameters
            .get(layer_name)
            .cloned()
            .unwrap_or_default())
    }

    fn add_listener(&self, listener: Arc<dyn BlobStoreListener>) {
        self.listeners.add(listener);
    }

    fn remove_listener(&self, listener: &Arc<dyn BlobStoreListener>) -> bool {
        self.listeners.remove(listener)
    }

    async fn clear(&self) -> Result<(), StorageError> {
        self.check_alive()?;
        let layers: Vec<String> = {
            let mut state = self.state.write();
            let mut layers: Vec<String> = state
                .tiles
                .keys()
                .map(|k| k.layer_name.to_string())
                .chain(state.metadata.keys().cloned())
                .chain(state.parameters.keys().cloned())
                .collect();
            layers.sort();
            layers.dedup();
            *state = State::default();
            layers
        };
        for layer in &layers {
            self.listeners.notify_layer_deleted(layer).await;
        }
        Ok(())
    }

    async fn destroy(&self) {
        self.destroyed.store(true, Ordering::Release);
        *self.state.write() = State::default();
    }
}
