//! Tile identity and payload model.
//!
//! A [`TileObject`] names a tile through its [`TileKey`] and optionally
//! carries a payload. Query objects (identity only) are used for lookups
//! and deletes; complete objects (identity and payload) for stores and
//! cache entries.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

use crate::grid::{Coverage, GridSubset, TileIndex};

// =============================================================================
// Resource
// =============================================================================

/// An opaque tile payload.
pub trait Resource: Send + Sync + fmt::Debug {
    /// Payload size in bytes.
    fn size(&self) -> u64;

    /// When the payload was last written.
    fn last_modified(&self) -> DateTime<Utc>;

    /// Read the whole payload.
    fn contents(&self) -> Result<Bytes, std::io::Error>;
}

/// A payload held in memory.
#[derive(Debug, Clone, PartialEq)]
pub struct ByteArrayResource {
    data: Bytes,
    last_modified: DateTime<Utc>,
}

impl ByteArrayResource {
    /// Wrap bytes, stamped with the current time.
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self {
            data: data.into(),
            last_modified: Utc::now(),
        }
    }

    pub fn with_last_modified(mut self, last_modified: DateTime<Utc>) -> Self {
        self.last_modified = last_modified;
        self
    }

    /// Copy another resource into a freshly allocated buffer owned by the
    /// returned value. Keeps the original's modification time.
    pub fn copy_of(resource: &dyn Resource) -> Result<Self, std::io::Error> {
        let contents = resource.contents()?;
        Ok(Self {
            data: Bytes::copy_from_slice(&contents),
            last_modified: resource.last_modified(),
        })
    }

    pub fn bytes(&self) -> &Bytes {
        &self.data
    }
}

impl Resource for ByteArrayResource {
    fn size(&self) -> u64 {
        self.data.len() as u64
    }

    fn last_modified(&self) -> DateTime<Utc> {
        self.last_modified
    }

    fn contents(&self) -> Result<Bytes, std::io::Error> {
        Ok(self.data.clone())
    }
}

// =============================================================================
// Tile Key
// =============================================================================

/// Identity of a tile: layer, grid set, format, parameters and position.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TileKey {
    pub layer_name: Arc<str>,
    pub grid_set_id: Arc<str>,
    pub blob_format: Arc<str>,
    /// `None` for tiles without request parameters
    pub parameters_id: Option<Arc<str>>,
    pub index: TileIndex,
}

impl TileKey {
    pub fn new(
        layer_name: impl Into<Arc<str>>,
        grid_set_id: impl Into<Arc<str>>,
        blob_format: impl Into<Arc<str>>,
        parameters_id: Option<Arc<str>>,
        index: TileIndex,
    ) -> Self {
        Self {
            layer_name: layer_name.into(),
            grid_set_id: grid_set_id.into(),
            blob_format: blob_format.into(),
            parameters_id,
            index,
        }
    }
}

impl fmt::Display for TileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}",
            self.layer_name, self.grid_set_id, self.blob_format, self.index
        )?;
        if let Some(ref id) = self.parameters_id {
            write!(f, "?{}", id)?;
        }
        Ok(())
    }
}

/// Stable identifier for a set of request parameters.
///
/// Hex SHA-256 of the `key=value` pairs in key order joined with `&`.
/// An empty map has no identifier.
pub fn parameters_id(parameters: &BTreeMap<String, String>) -> Option<String> {
    if parameters.is_empty() {
        return None;
    }
    let joined = parameters
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");
    Some(hex::encode(Sha256::digest(joined.as_bytes())))
}

// =============================================================================
// Tile Object
// =============================================================================

/// A tile identity with an optional payload.
#[derive(Debug, Clone)]
pub struct TileObject {
    key: TileKey,
    parameters: BTreeMap<String, String>,
    blob: Option<Arc<dyn Resource>>,
    blob_size: u64,
    created: Option<DateTime<Utc>>,
}

impl TileObject {
    /// Identity-only object for lookups and deletes.
    pub fn query(
        layer_name: &str,
        index: TileIndex,
        grid_set_id: &str,
        blob_format: &str,
        parameters: BTreeMap<String, String>,
    ) -> Self {
        let id = parameters_id(&parameters).map(Arc::from);
        Self {
            key: TileKey::new(layer_name, grid_set_id, blob_format, id, index),
            parameters,
            blob: None,
            blob_size: 0,
            created: None,
        }
    }

    /// Object carrying a payload, used to store tiles.
    pub fn complete(
        layer_name: &str,
        index: TileIndex,
        grid_set_id: &str,
        blob_format: &str,
        parameters: BTreeMap<String, String>,
        blob: Arc<dyn Resource>,
    ) -> Self {
        let mut obj = Self::query(layer_name, index, grid_set_id, blob_format, parameters);
        obj.set_blob(blob);
        obj
    }

    /// Query object for a bare key, without a parameter map.
    pub fn from_key(key: TileKey) -> Self {
        Self {
            key,
            parameters: BTreeMap::new(),
            blob: None,
            blob_size: 0,
            created: None,
        }
    }

    pub fn key(&self) -> &TileKey {
        &self.key
    }

    pub fn layer_name(&self) -> &str {
        &self.key.layer_name
    }

    pub fn grid_set_id(&self) -> &str {
        &self.key.grid_set_id
    }

    pub fn blob_format(&self) -> &str {
        &self.key.blob_format
    }

    pub fn parameters_id(&self) -> Option<&str> {
        self.key.parameters_id.as_deref()
    }

    /// Override the parameters id, for callers that only know the id.
    pub fn set_parameters_id(&mut self, id: Option<&str>) {
        self.key.parameters_id = id.map(Arc::from);
    }

    pub fn parameters(&self) -> &BTreeMap<String, String> {
        &self.parameters
    }

    pub fn index(&self) -> TileIndex {
        self.key.index
    }

    pub fn blob(&self) -> Option<&Arc<dyn Resource>> {
        self.blob.as_ref()
    }

    /// Attach a payload. Size and creation time follow the resource.
    pub fn set_blob(&mut self, blob: Arc<dyn Resource>) {
        self.blob_size = blob.size();
        self.created = Some(blob.last_modified());
        self.blob = Some(blob);
    }

    pub fn blob_size(&self) -> u64 {
        self.blob_size
    }

    pub fn created(&self) -> Option<DateTime<Utc>> {
        self.created
    }

    /// Read the payload, `None` for query objects.
    pub fn contents(&self) -> Result<Option<Bytes>, std::io::Error> {
        self.blob.as_ref().map(|blob| blob.contents()).transpose()
    }
}

impl fmt::Display for TileObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TileObject[{}]", self.key)
    }
}

// =============================================================================
// Tile Range
// =============================================================================

/// A set of tiles of one layer and grid set: one index rectangle per zoom.
#[derive(Debug, Clone, PartialEq)]
pub struct TileRange {
    layer_name: String,
    grid_set_id: String,
    /// `None` matches every format
    blob_format: Option<String>,
    /// `None` matches every parameters id
    parameters_id: Option<String>,
    zoom_start: u32,
    zoom_stop: u32,
    rects: BTreeMap<u32, Coverage>,
}

impl TileRange {
    /// Range over explicit rectangles. Zoom bounds follow the rectangles.
    pub fn new(layer_name: &str, grid_set_id: &str, rects: Vec<Coverage>) -> Self {
        let rects: BTreeMap<u32, Coverage> = rects.into_iter().map(|r| (r.z, r)).collect();
        let zoom_start = rects.keys().next().copied().unwrap_or(0);
        let zoom_stop = rects.keys().next_back().copied().unwrap_or(0);
        Self {
            layer_name: layer_name.to_string(),
            grid_set_id: grid_set_id.to_string(),
            blob_format: None,
            parameters_id: None,
            zoom_start,
            zoom_stop,
            rects,
        }
    }

    /// Every tile of a grid subset.
    pub fn from_subset(layer_name: &str, subset: &GridSubset) -> Self {
        Self::new(layer_name, subset.name(), subset.coverages().to_vec())
    }

    pub fn with_format(mut self, blob_format: &str) -> Self {
        self.blob_format = Some(blob_format.to_string());
        self
    }

    pub fn with_parameters_id(mut self, parameters_id: &str) -> Self {
        self.parameters_id = Some(parameters_id.to_string());
        self
    }

    pub fn layer_name(&self) -> &str {
        &self.layer_name
    }

    pub fn grid_set_id(&self) -> &str {
        &self.grid_set_id
    }

    pub fn blob_format(&self) -> Option<&str> {
        self.blob_format.as_deref()
    }

    pub fn parameters_id(&self) -> Option<&str> {
        self.parameters_id.as_deref()
    }

    pub fn zoom_start(&self) -> u32 {
        self.zoom_start
    }

    pub fn zoom_stop(&self) -> u32 {
        self.zoom_stop
    }

    /// Rectangle at level `z`, if the range has one.
    pub fn rect(&self, z: u32) -> Option<&Coverage> {
        self.rects.get(&z)
    }

    /// Whether the tile with this key belongs to the range.
    pub fn contains(&self, key: &TileKey) -> bool {
        if *key.layer_name != *self.layer_name || *key.grid_set_id != *self.grid_set_id {
            return false;
        }
        if let Some(ref format) = self.blob_format {
            if *key.blob_format != **format {
                return false;
            }
        }
        if let Some(ref id) = self.parameters_id {
            if key.parameters_id.as_deref() != Some(id.as_str()) {
                return false;
            }
        }
        self.rects
            .get(&key.index.z)
            .is_some_and(|rect| rect.contains(&key.index))
    }
}
