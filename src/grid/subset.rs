//! Grid subsets: a grid set restricted to an area and a zoom range.
//!
//! The per-level coverage table is computed once, when the subset is
//! created, and never changes afterwards.

use std::sync::Arc;

use crate::error::GridError;

use super::bbox::BoundingBox;
use super::gridset::GridSet;
use super::index::{Coverage, TileIndex};
use super::srs::Srs;

/// A [`GridSet`] bounded to an area and an inclusive zoom range.
#[derive(Debug, Clone, PartialEq)]
pub struct GridSubset {
    gridset: Arc<GridSet>,
    /// Requested area, clipped to the grid set extent
    extent: BoundingBox,
    zoom_start: u32,
    zoom_stop: u32,
    /// One rectangle per level, index 0 is `zoom_start`
    coverages: Vec<Coverage>,
}

impl GridSubset {
    /// Create a subset.
    ///
    /// `bounds` defaults to the grid set extent, `zoom_start` to 0 and
    /// `zoom_stop` to the last level of the grid set.
    pub fn new(
        gridset: Arc<GridSet>,
        bounds: Option<BoundingBox>,
        zoom_start: Option<u32>,
        zoom_stop: Option<u32>,
    ) -> Result<Self, GridError> {
        let last_level = gridset.num_levels() - 1;
        let zoom_start = zoom_start.unwrap_or(0);
        let zoom_stop = zoom_stop.unwrap_or(last_level);

        if zoom_stop > last_level {
            return Err(GridError::InvalidZoomLevel {
                z: zoom_stop,
                start: 0,
                stop: last_level,
            });
        }
        if zoom_start > zoom_stop {
            return Err(GridError::InvalidZoomLevel {
                z: zoom_start,
                start: 0,
                stop: zoom_stop,
            });
        }

        let requested = bounds.unwrap_or_else(|| gridset.extent());
        let extent = requested
            .intersection(&gridset.extent())
            .ok_or_else(|| GridError::OutsideGridExtent {
                gridset: gridset.name().to_string(),
                bounds: requested.to_string(),
            })?;

        let coverages = (zoom_start..=zoom_stop)
            .map(|z| gridset.closest_rectangle(z, &extent))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            gridset,
            extent,
            zoom_start,
            zoom_stop,
            coverages,
        })
    }

    /// A subset covering the whole grid set at every level.
    pub fn full(gridset: Arc<GridSet>) -> Result<Self, GridError> {
        Self::new(gridset, None, None, None)
    }

    pub fn gridset(&self) -> &GridSet {
        &self.gridset
    }

    /// Name of the underlying grid set, used as the grid set id of tiles.
    pub fn name(&self) -> &str {
        self.gridset.name()
    }

    pub fn srs(&self) -> Srs {
        self.gridset.srs()
    }

    pub fn zoom_start(&self) -> u32 {
        self.zoom_start
    }

    pub fn zoom_stop(&self) -> u32 {
        self.zoom_stop
    }

    /// The requested area clipped to the grid set extent.
    pub fn original_extent(&self) -> BoundingBox {
        self.extent
    }

    fn check_zoom(&self, z: u32) -> Result<usize, GridError> {
        if z < self.zoom_start || z > self.zoom_stop {
            return Err(GridError::InvalidZoomLevel {
                z,
                start: self.zoom_start,
                stop: self.zoom_stop,
            });
        }
        Ok((z - self.zoom_start) as usize)
    }

    /// Geographic bounds of a tile.
    pub fn bounds_from_index(&self, index: &TileIndex) -> Result<BoundingBox, GridError> {
        self.check_zoom(index.z)?;
        self.gridset.bounds_from_index(index)
    }

    /// Bounds of an index rectangle at a level of this subset.
    pub fn bounds_from_rectangle(&self, rect: &Coverage) -> Result<BoundingBox, GridError> {
        self.check_zoom(rect.z)?;
        self.gridset.bounds_from_rectangle(rect)
    }

    /// Precomputed index rectangle at level `z`.
    pub fn coverage(&self, z: u32) -> Result<Coverage, GridError> {
        let slot = self.check_zoom(z)?;
        Ok(self.coverages[slot])
    }

    /// All coverage rectangles, ordered by increasing zoom.
    pub fn coverages(&self) -> &[Coverage] {
        &self.coverages
    }

    /// Coverage rectangles with rows numbered from the top of the grid, as
    /// WMTS tile matrix limits expect. One entry per level, by increasing zoom.
    pub fn wmts_coverages(&self) -> Vec<[i64; 4]> {
        self.coverages
            .iter()
            .map(|coverage| {
                let tiles_high = self
                    .gridset
                    .levels()
                    .get(coverage.z as usize)
                    .map(|grid| grid.tiles_high())
                    .unwrap_or(1);
                [
                    coverage.min_x,
                    tiles_high - 1 - coverage.max_y,
                    coverage.max_x,
                    tiles_high - 1 - coverage.min_y,
                ]
            })
            .collect()
    }

    /// Level names, one per level, by increasing zoom.
    pub fn grid_names(&self) -> Vec<String> {
        (self.zoom_start..=self.zoom_stop)
            .filter_map(|z| self.gridset.levels().get(z as usize))
            .map(|grid| grid.name().to_string())
            .collect()
    }

    /// Zoom level carrying the given level name.
    pub fn grid_index(&self, name: &str) -> Result<u32, GridError> {
        (self.zoom_start..=self.zoom_stop)
            .find(|&z| {
                self.gridset
                    .levels()
                    .get(z as usize)
                    .is_some_and(|grid| grid.name() == name)
            })
            .ok_or_else(|| GridError::UnknownLevelName(name.to_string()))
    }

    /// Whether the index falls inside the coverage of its level.
    pub fn covers(&self, index: &TileIndex) -> bool {
        match self.check_zoom(index.z) {
            Ok(slot) => self.coverages[slot].contains(index),
            Err(_) => false,
        }
    }

    /// Area actually covered by whole tiles at the deepest level.
    pub fn covered_bounds(&self) -> BoundingBox {
        let deepest = self.coverages[self.coverages.len() - 1];
        self.gridset
            .bounds_from_rectangle(&deepest)
            .unwrap_or(self.extent)
    }

    /// Index rectangle at level `z` for the part of `bounds` inside this
    /// subset. `None` when the area lies outside the coverage.
    pub fn coverage_intersection(
        &self,
        z: u32,
        bounds: &BoundingBox,
    ) -> Result<Option<Coverage>, GridError> {
        let coverage = self.coverage(z)?;
        let Some(clipped) = bounds.intersection(&self.extent) else {
            return Ok(None);
        };
        let requested = self.gridset.closest_rectangle(z, &clipped)?;

        let rect = Coverage::new(
            requested.min_x.max(coverage.min_x),
            requested.min_y.max(coverage.min_y),
            requested.max_x.min(coverage.max_x),
            requested.max_y.min(coverage.max_y),
            z,
        );
        if rect.min_x > rect.max_x || rect.min_y > rect.max_y {
            return Ok(None);
        }
        Ok(Some(rect))
    }

    /// Resolution at level `z`.
    pub fn resolution(&self, z: u32) -> Result<f64, GridError> {
        self.check_zoom(z)?;
        Ok(self.gridset.level(z)?.resolution())
    }

    /// Number of tiles in the coverage at level `z`.
    pub fn num_tiles(&self, z: u32) -> Result<u64, GridError> {
        Ok(self.coverage(z)?.tile_count())
    }
}
