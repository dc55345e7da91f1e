use std::sync::Arc;

use crate::error::FilterError;
use crate::grid::{GridSubset, TileIndex};

/// The part of a tile request that request filters inspect.
#[derive(Debug, Clone)]
pub struct TileRequest {
    pub layer_name: String,
    pub grid_subset: Arc<GridSubset>,
    pub index: TileIndex,
}

impl TileRequest {
    pub fn new(
        layer_name: impl Into<String>,
        grid_subset: Arc<GridSubset>,
        index: TileIndex,
    ) -> Self {
        Self {
            layer_name: layer_name.into(),
            grid_subset,
            index,
        }
    }
}

/// A check applied to every tile request before the tile is served.
///
/// Returning [`FilterError::BlankTile`] tells the request layer to answer
/// with an empty tile instead of rendering or looking up the real one.
pub trait RequestFilter: Send + Sync {
    fn name(&self) -> &str;

    fn apply(&self, request: &TileRequest) -> Result<(), FilterError>;
}
