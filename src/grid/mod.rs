//! Tile grid addressing.
//!
//! Converts between tile indices and geographic bounding boxes, and
//! computes which tiles cover a given area at each zoom level.
//!
//! # Components
//!
//! - [`GridSet`]: immutable tiling scheme (CRS, extent, tile size, resolutions)
//! - [`GridSubset`]: a grid set bounded to an area and zoom range, with a
//!   precomputed [`Coverage`] per level
//! - [`TileIndex`]: `(x, y, z)` position of a tile
//! - [`BoundingBox`]: axis-aligned extent in map units
//! - [`Srs`]: EPSG coordinate reference system identifier
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use tilestore::grid::{BoundingBox, GridSet, GridSubset, TileIndex};
//!
//! let subset = GridSubset::new(
//!     Arc::new(GridSet::world_epsg4326()),
//!     Some(BoundingBox::new(0.0, 0.0, 180.0, 90.0)),
//!     Some(0),
//!     Some(1),
//! )
//! .unwrap();
//!
//! assert_eq!(subset.coverage(1).unwrap().as_array(), [2, 1, 3, 1]);
//!
//! let bounds = subset.bounds_from_index(&TileIndex::new(2, 1, 1)).unwrap();
//! assert_eq!(bounds, BoundingBox::new(0.0, 0.0, 90.0, 90.0));
//! ```

mod bbox;
mod gridset;
mod index;
mod srs;
mod subset;

pub use bbox::BoundingBox;
pub use gridset::{
    builtin_gridset, Grid, GridSet, GridSetBuilder, DEFAULT_PIXEL_SIZE, DEFAULT_TILE_SIZE,
    EPSG4326_METERS_PER_UNIT,
};
pub use index::{Coverage, TileIndex};
pub use srs::Srs;
pub use subset::GridSubset;
