use async_trait::async_trait;
use tracing::{debug, warn};

use crate::storage::{BlobStoreListener, TileEvent};

use super::provider::ProviderHandle;

/// Keeps a cache consistent with mutations made directly on the store
/// underneath it.
///
/// Tile-scoped events evict the tile, layer-scoped events evict the whole
/// layer. Newly stored tiles are ignored: they are picked up on the next
/// miss.
pub struct CacheInvalidationListener {
    provider: ProviderHandle,
}

impl CacheInvalidationListener {
    pub fn new(provider: ProviderHandle) -> Self {
        Self { provider }
    }

    async fn evict_tile(&self, event: &TileEvent) {
        let key = event.key();
        if let Err(e) = self.provider.current().remove_tile(&key).await {
            warn!(tile = %key, error = %e, "Failed to evict cached tile");
        }
    }

    async fn evict_layer(&self, layer_name: &str) {
        debug!(layer = layer_name, "Store mutation invalidates cached layer");
        if let Err(e) = self.provider.current().remove_layer(layer_name).await {
            warn!(layer = layer_name, error = %e, "Failed to evict cached layer");
        }
    }
}

#[async_trait]
impl BlobStoreListener for CacheInvalidationListener {
    async fn tile_deleted(&self, event: &TileEvent) {
        self.evict_tile(event).await;
    }

    async fn tile_updated(&self, event: &TileEvent, _old_size: u64) {
        self.evict_tile(event).await;
    }

    async fn layer_deleted(&self, layer_name: &str) {
        self.evict_layer(layer_name).await;
    }

    async fn layer_renamed(&self, old_layer_name: &str, _new_layer_name: &str) {
        self.evict_layer(old_layer_name).await;
    }

    async fn grid_subset_deleted(&self, layer_name: &str, _grid_set_id: &str) {
        self.evict_layer(layer_name).await;
    }

    async fn parameters_deleted(&self, layer_name: &str, _parameters_id: &str) {
        self.evict_layer(layer_name).await;
    }
}
