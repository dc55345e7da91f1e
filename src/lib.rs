//! # tilestore
//!
//! Tile addressing and cache-consistent tile storage for map tile servers.
//!
//! Given a tile request (layer, grid set, zoom, column, row, format,
//! parameters) this library computes the geographic bounds of the tile,
//! decides whether the tile is blanked by a coverage geometry, and serves or
//! stores its payload through an in-memory cache that stays consistent with
//! the store underneath it.
//!
//! ## Features
//!
//! - **Exact tiling arithmetic**: bounds from index, per-zoom coverage, WMTS row order
//! - **Cache consistency**: every mutation evicts the affected tiles, including
//!   mutations made directly on the wrapped store
//! - **Bounded caching**: byte-budget LRU with optional expiry
//! - **Geometry filtering**: containment or intersection tests with DE-9IM predicates
//!
//! ## Architecture
//!
//! - [`grid`] - Grid sets, grid subsets, tile indices and bounding boxes
//! - [`storage`] - Tile model, blob store contract and mutation notifications
//! - [`cache`] - Caching layer and cache providers
//! - [`filter`] - Tile request filters
//! - [`config`] - CLI and configuration types
//!
//! ## Example
//!
//! ```rust
//! use std::collections::BTreeMap;
//! use std::sync::Arc;
//! use tilestore::{BlobStore, ByteArrayResource, MemoryBlobStore, TileIndex, TileObject, TransientBlobStore};
//!
//! #[tokio::main]
//! async fn main() {
//!     let backend = Arc::new(TransientBlobStore::new());
//!     let store = MemoryBlobStore::wrapping(backend.clone());
//!
//!     let tile = TileObject::complete(
//!         "roads",
//!         TileIndex::new(3, 1, 2),
//!         "EPSG:4326",
//!         "image/png",
//!         BTreeMap::new(),
//!         Arc::new(ByteArrayResource::new(vec![0u8; 64])),
//!     );
//!     store.put(&tile).await.unwrap();
//!
//!     // Deleting on the backend directly still evicts the cached copy
//!     backend.delete(&tile).await.unwrap();
//!     let mut query = TileObject::from_key(tile.key().clone());
//!     assert!(!store.get(&mut query).await.unwrap());
//! }
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod filter;
pub mod grid;
pub mod storage;

// Re-export commonly used types
pub use cache::{
    select_cache_provider, CacheInvalidationListener, CacheProvider, CacheStatistics,
    LruCacheProvider, MemoryBlobStore,
};
pub use config::{CacheConfig, Cli, Command, EvictionPolicy};
pub use error::{CacheError, ConfigError, FilterError, GridError, StorageError};
pub use filter::{GeometryFilter, RequestFilter, TileRequest};
pub use grid::{builtin_gridset, BoundingBox, Coverage, GridSet, GridSubset, Srs, TileIndex};
pub use storage::{
    BlobStore, BlobStoreDecorator, BlobStoreListener, ByteArrayResource, NullBlobStore, Resource,
    TileEvent, TileKey, TileObject, TileRange, TransientBlobStore,
};
