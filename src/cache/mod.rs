//! In-memory tile caching over a blob store.
//!
//! # Components
//!
//! - [`MemoryBlobStore`]: the caching layer, itself a [`BlobStore`](crate::storage::BlobStore)
//! - [`CacheProvider`]: pluggable cache backend contract
//! - [`LruCacheProvider`]: built-in byte-bounded LRU provider
//! - [`CacheInvalidationListener`]: evicts on mutations of the wrapped store
//! - [`select_cache_provider`]: startup provider selection

mod listener;
mod lru_provider;
mod memory_store;
mod provider;
mod selection;

pub use listener::CacheInvalidationListener;
pub use lru_provider::{
    LruCacheProvider, BYTES_PER_MB, DEFAULT_EVICTION_TIME_SECS, DEFAULT_HARD_MEMORY_LIMIT_MB,
    DEFAULT_MAX_ENTRIES, LRU_PROVIDER_NAME,
};
pub use memory_store::MemoryBlobStore;
pub use provider::{CacheProvider, CacheStatistics, ProviderHandle};
pub use selection::select_cache_provider;
