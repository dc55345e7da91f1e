//! Tile persistence.
//!
//! # Components
//!
//! - [`BlobStore`]: async persistence contract with mutation notifications
//! - [`BlobStoreListener`]: receiver of those notifications
//! - [`BlobStoreDecorator`]: pass-through wrapper other layers build on
//! - [`TransientBlobStore`]: process-memory store
//! - [`NullBlobStore`]: store that keeps nothing
//! - [`TileObject`], [`TileKey`], [`TileRange`]: the tile model

mod blob_store;
mod decorator;
mod null_store;
mod tile;
mod transient;

pub use blob_store::{BlobStore, BlobStoreListener, ListenerList, ParametersMapping, TileEvent};
pub use decorator::BlobStoreDecorator;
pub use null_store::NullBlobStore;
pub use tile::{parameters_id, ByteArrayResource, Resource, TileKey, TileObject, TileRange};
pub use transient::TransientBlobStore;
