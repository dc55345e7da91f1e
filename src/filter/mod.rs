//! Tile request filters.
//!
//! A filter inspects a [`TileRequest`] before the tile is served and may
//! reject it as a blank tile.

mod geometry;
mod request;

pub use geometry::{GeometryFilter, GEOMETRY_FILTER_NAME};
pub use request::{RequestFilter, TileRequest};
