use thiserror::Error;

/// Errors raised by grid set and grid subset arithmetic
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GridError {
    /// Requested zoom level is outside the declared range
    #[error("Invalid zoom level {z}: expected a level between {start} and {stop}")]
    InvalidZoomLevel { z: u32, start: u32, stop: u32 },

    /// No level of the subset carries this name
    #[error("Unknown grid level name: {0}")]
    UnknownLevelName(String),

    /// Resolutions are empty, non-positive or not strictly decreasing
    #[error("Invalid resolutions: {0}")]
    InvalidResolutions(String),

    /// Bounding box does not intersect the grid set extent
    #[error("Bounding box {bounds} does not intersect the extent of grid set {gridset}")]
    OutsideGridExtent { gridset: String, bounds: String },

    /// No built-in grid set with this name
    #[error("Unknown grid set: {0}")]
    UnknownGridSet(String),
}

/// Failures reported by a blob store
#[derive(Debug, Error)]
pub enum StorageError {
    /// Error reported by the storage backend
    #[error("Storage backend error: {0}")]
    Backend(String),

    /// I/O error while reading or writing a tile payload
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The store has been destroyed and accepts no further calls
    #[error("Blob store has been destroyed")]
    Destroyed,
}

/// Failures of a cache provider.
///
/// These never reach callers of the caching layer; they degrade to a cache miss.
#[derive(Debug, Clone, Error)]
pub enum CacheError {
    /// Provider is not available in this environment
    #[error("Cache provider {0} is not available")]
    Unavailable(String),

    /// Provider-specific failure
    #[error("Cache provider error: {0}")]
    Provider(String),
}

/// Setup-time configuration errors. Not recoverable per request.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// CRS identifier cannot be resolved
    #[error("Unknown CRS identifier: {0}")]
    UnknownCrs(String),

    /// A cache provider was already explicitly assigned
    #[error("Cache provider already assigned: {0}")]
    ProviderAlreadyAssigned(String),

    /// Cache configuration failed validation
    #[error("Invalid cache configuration: {0}")]
    InvalidCacheConfig(String),
}

/// Outcome of a request filter rejecting or failing on a tile request
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FilterError {
    /// The tile lies outside the area allowed by the filter and must be
    /// answered with an empty tile. This is a control signal, not a failure.
    #[error("Tile rejected as blank by filter {filter}")]
    BlankTile { filter: String },

    /// The tile index could not be resolved against its grid subset
    #[error("Grid error: {0}")]
    Grid(#[from] GridError),
}

impl FilterError {
    /// Whether this is the blank tile signal.
    pub fn is_blank_tile(&self) -> bool {
        matches!(self, FilterError::BlankTile { .. })
    }
}
