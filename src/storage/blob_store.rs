//! The blob store contract and its mutation notifications.
//!
//! Every store implementation must notify its registered listeners of each
//! committed mutation before the mutating call returns. Caches layered on top
//! of a store rely on these notifications as their only signal that data
//! changed underneath them.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::error::StorageError;
use crate::grid::TileIndex;

use super::tile::{TileKey, TileObject, TileRange};

/// Parameter maps known for a layer, keyed by parameters id. `None` marks an
/// id whose parameters were never recorded.
pub type ParametersMapping = HashMap<String, Option<BTreeMap<String, String>>>;

// =============================================================================
// Listener
// =============================================================================

/// Tile-scoped mutation details.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileEvent {
    pub layer_name: String,
    pub grid_set_id: String,
    pub blob_format: String,
    pub parameters_id: Option<String>,
    pub index: TileIndex,
    /// Size of the payload involved in the mutation
    pub blob_size: u64,
}

impl TileEvent {
    pub fn new(key: &TileKey, blob_size: u64) -> Self {
        Self {
            layer_name: key.layer_name.to_string(),
            grid_set_id: key.grid_set_id.to_string(),
            blob_format: key.blob_format.to_string(),
            parameters_id: key.parameters_id.as_deref().map(str::to_string),
            index: key.index,
            blob_size,
        }
    }

    /// Key of the tile the event is about.
    pub fn key(&self) -> TileKey {
        TileKey::new(
            self.layer_name.as_str(),
            self.grid_set_id.as_str(),
            self.blob_format.as_str(),
            self.parameters_id.as_deref().map(Arc::from),
            self.index,
        )
    }
}

/// Receiver of blob store mutation notifications.
///
/// All methods default to doing nothing so implementations only override
/// the events they care about.
#[async_trait]
pub trait BlobStoreListener: Send + Sync {
    async fn tile_stored(&self, _event: &TileEvent) {}

    async fn tile_deleted(&self, _event: &TileEvent) {}

    /// A tile was overwritten; `old_size` is the size of the replaced payload.
    async fn tile_updated(&self, _event: &TileEvent, _old_size: u64) {}

    async fn layer_deleted(&self, _layer_name: &str) {}

    async fn layer_renamed(&self, _old_layer_name: &str, _new_layer_name: &str) {}

    async fn grid_subset_deleted(&self, _layer_name: &str, _grid_set_id: &str) {}

    async fn parameters_deleted(&self, _layer_name: &str, _parameters_id: &str) {}
}

/// Ordered set of listeners owned by a store.
///
/// Notifications take a snapshot of the list and await every listener in
/// registration order, so a listener added or removed during a fan-out only
/// affects later notifications.
#[derive(Default)]
pub struct ListenerList {
    listeners: RwLock<Vec<Arc<dyn BlobStoreListener>>>,
}

impl ListenerList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, listener: Arc<dyn BlobStoreListener>) {
        self.listeners.write().push(listener);
    }

    /// Remove by identity. Returns whether the listener was registered.
    pub fn remove(&self, listener: &Arc<dyn BlobStoreListener>) -> bool {
        let mut listeners = self.listeners.write();
        let before = listeners.len();
        listeners.retain(|l| !same_listener(l, listener));
        listeners.len() != before
    }

    pub fn len(&self) -> usize {
        self.listeners.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.read().is_empty()
    }

    fn snapshot(&self) -> Vec<Arc<dyn BlobStoreListener>> {
        self.listeners.read().clone()
    }

    pub async fn notify_tile_stored(&self, event: &TileEvent) {
        for listener in self.snapshot() {
            listener.tile_stored(event).await;
        }
    }

    pub async fn notify_tile_deleted(&self, event: &TileEvent) {
        for listener in self.snapshot() {
            listener.tile_deleted(event).await;
        }
    }

    pub async fn notify_tile_updated(&self, event: &TileEvent, old_size: u64) {
        for listener in self.snapshot() {
            listener.tile_updated(event, old_size).await;
        }
    }

    pub async fn notify_layer_deleted(&self, layer_name: &str) {
        for listener in self.snapshot() {
            listener.layer_deleted(layer_name).await;
        }
    }

    pub async fn notify_layer_renamed(&self, old_layer_name: &str, new_layer_name: &str) {
        for listener in self.snapshot() {
            listener.layer_renamed(old_layer_name, new_layer_name).await;
        }
    }

    pub async fn notify_grid_subset_deleted(&self, layer_name: &str, grid_set_id: &str) {
        for listener in self.snapshot() {
            listener.grid_subset_deleted(layer_name, grid_set_id).await;
        }
    }

    pub async fn notify_parameters_deleted(&self, layer_name: &str, parameters_id: &str) {
        for listener in self.snapshot() {
            listener.parameters_deleted(layer_name, parameters_id).await;
        }
    }
}

/// Pointer identity, ignoring vtable differences between codegen units.
fn same_listener(a: &Arc<dyn BlobStoreListener>, b: &Arc<dyn BlobStoreListener>) -> bool {
    std::ptr::eq(Arc::as_ptr(a) as *const (), Arc::as_ptr(b) as *const ())
}

// =============================================================================
// BlobStore
// =============================================================================

/// Persistence contract for tiles, layer metadata and bulk deletions.
///
/// Implementations must be thread-safe and notify every registered
/// [`BlobStoreListener`] of each mutation that changed persisted state
/// before returning.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Look up a tile. On success the payload, size and creation time are
    /// filled into `obj` and `true` is returned.
    async fn get(&self, obj: &mut TileObject) -> Result<bool, StorageError>;

    /// Store a tile, replacing any previous payload.
    async fn put(&self, obj: &TileObject) -> Result<(), StorageError>;

    /// Delete one tile. Returns whether it existed.
    async fn delete(&self, obj: &TileObject) -> Result<bool, StorageError>;

    /// Delete every tile and the metadata of a layer.
    async fn delete_layer(&self, layer_name: &str) -> Result<bool, StorageError>;

    /// Delete the tiles of a layer in one grid set.
    async fn delete_by_grid_set(
        &self,
        layer_name: &str,
        grid_set_id: &str,
    ) -> Result<bool, StorageError>;

    /// Delete the tiles of a layer stored under one parameters id.
    async fn delete_by_parameters(
        &self,
        layer_name: &str,
        parameters_id: &str,
    ) -> Result<bool, StorageError>;

    /// Delete every tile in a range. Returns whether any tile existed.
    async fn delete_range(&self, range: &TileRange) -> Result<bool, StorageError>;

    /// Rename a layer. Returns whether the layer was renamed.
    async fn rename(&self, old_layer_name: &str, new_layer_name: &str)
        -> Result<bool, StorageError>;

    async fn layer_metadata(
        &self,
        layer_name: &str,
        key: &str,
    ) -> Result<Option<String>, StorageError>;

    async fn put_layer_metadata(
        &self,
        layer_name: &str,
        key: &str,
        value: &str,
    ) -> Result<(), StorageError>;

    async fn layer_exists(&self, layer_name: &str) -> Result<bool, StorageError>;

    async fn parameters_mapping(&self, layer_name: &str)
        -> Result<ParametersMapping, StorageError>;

    fn add_listener(&self, listener: Arc<dyn BlobStoreListener>);

    /// Returns whether the listener was registered.
    fn remove_listener(&self, listener: &Arc<dyn BlobStoreListener>) -> bool;

    /// Drop everything held by the store.
    async fn clear(&self) -> Result<(), StorageError>;

    /// Release resources. No further calls are valid afterwards.
    async fn destroy(&self);
}
