//! Grid sets: named tiling schemes over a coordinate reference system.
//!
//! A grid set fixes the extent, the tile origin, the tile size in pixels and
//! one resolution per zoom level. All tile arithmetic (index to bounds and
//! bounds to index rectangle) lives here; [`GridSubset`](super::GridSubset)
//! adds a restricted area and zoom range on top.
//!
//! Tile rows are always counted from the bottom of the grid. A top-left
//! aligned grid set anchors its tiles at the top edge of the extent, so any
//! partial row ends up at the bottom, but row 0 is still the southernmost.

use serde::Serialize;

use crate::error::GridError;

use super::bbox::BoundingBox;
use super::index::{Coverage, TileIndex};
use super::srs::Srs;

/// Default tile size in pixels.
pub const DEFAULT_TILE_SIZE: u32 = 256;

/// OGC standardized rendering pixel size in meters (0.28mm).
pub const DEFAULT_PIXEL_SIZE: f64 = 0.00028;

/// Meters per degree at the equator of the WGS84 ellipsoid.
pub const EPSG4326_METERS_PER_UNIT: f64 = 6_378_137.0 * 2.0 * std::f64::consts::PI / 360.0;

/// Half the circumference of the Web Mercator world.
const WEB_MERCATOR_HALF_EXTENT: f64 = 20_037_508.34;

/// Quotients closer than this to an integer are treated as that integer, so
/// floating point noise on a tile boundary does not add a row or column.
const SNAP_TOLERANCE: f64 = 1e-6;

// =============================================================================
// Grid level
// =============================================================================

/// One zoom level of a grid set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Grid {
    name: String,
    resolution: f64,
    scale_denominator: f64,
    tiles_wide: i64,
    tiles_high: i64,
}

impl Grid {
    /// Level identifier, as used for WMTS tile matrix names.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Map units per pixel.
    pub fn resolution(&self) -> f64 {
        self.resolution
    }

    pub fn scale_denominator(&self) -> f64 {
        self.scale_denominator
    }

    /// Number of tile columns needed to cover the grid set extent.
    pub fn tiles_wide(&self) -> i64 {
        self.tiles_wide
    }

    /// Number of tile rows needed to cover the grid set extent.
    pub fn tiles_high(&self) -> i64 {
        self.tiles_high
    }
}

// =============================================================================
// Grid set
// =============================================================================

/// An immutable tiling scheme.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GridSet {
    name: String,
    srs: Srs,
    extent: BoundingBox,
    top_left_aligned: bool,
    tile_width: u32,
    tile_height: u32,
    meters_per_unit: f64,
    pixel_size: f64,
    levels: Vec<Grid>,
}

impl GridSet {
    /// Start building a grid set.
    pub fn builder(name: impl Into<String>, srs: Srs, extent: BoundingBox) -> GridSetBuilder {
        GridSetBuilder::new(name, srs, extent)
    }

    /// The world in geographic coordinates: two 256 pixel tiles at level 0,
    /// 22 levels.
    pub fn world_epsg4326() -> GridSet {
        GridSet::builder(
            "EPSG:4326",
            Srs::wgs84(),
            BoundingBox::new(-180.0, -90.0, 180.0, 90.0),
        )
        .meters_per_unit(EPSG4326_METERS_PER_UNIT)
        .levels(22)
        .build()
        .expect("built-in EPSG:4326 grid set is valid")
    }

    /// The world in spherical Web Mercator: one 256 pixel tile at level 0,
    /// 31 levels.
    pub fn world_epsg3857() -> GridSet {
        GridSet::builder(
            "EPSG:900913",
            Srs::web_mercator(),
            BoundingBox::new(
                -WEB_MERCATOR_HALF_EXTENT,
                -WEB_MERCATOR_HALF_EXTENT,
                WEB_MERCATOR_HALF_EXTENT,
                WEB_MERCATOR_HALF_EXTENT,
            ),
        )
        .levels(31)
        .build()
        .expect("built-in EPSG:900913 grid set is valid")
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn srs(&self) -> Srs {
        self.srs
    }

    pub fn extent(&self) -> BoundingBox {
        self.extent
    }

    pub fn is_top_left_aligned(&self) -> bool {
        self.top_left_aligned
    }

    pub fn tile_width(&self) -> u32 {
        self.tile_width
    }

    pub fn tile_height(&self) -> u32 {
        self.tile_height
    }

    pub fn meters_per_unit(&self) -> f64 {
        self.meters_per_unit
    }

    pub fn pixel_size(&self) -> f64 {
        self.pixel_size
    }

    pub fn levels(&self) -> &[Grid] {
        &self.levels
    }

    pub fn num_levels(&self) -> u32 {
        self.levels.len() as u32
    }

    /// Get a zoom level.
    pub fn level(&self, z: u32) -> Result<&Grid, GridError> {
        self.levels
            .get(z as usize)
            .ok_or(GridError::InvalidZoomLevel {
                z,
                start: 0,
                stop: self.num_levels().saturating_sub(1),
            })
    }

    /// Corner from which tile columns and rows are measured.
    pub fn tile_origin(&self) -> (f64, f64) {
        if self.top_left_aligned {
            (self.extent.min_x, self.extent.max_y)
        } else {
            (self.extent.min_x, self.extent.min_y)
        }
    }

    /// Ground span of one tile at level `z`, in map units.
    fn tile_span(&self, grid: &Grid) -> (f64, f64) {
        (
            grid.resolution * self.tile_width as f64,
            grid.resolution * self.tile_height as f64,
        )
    }

    /// Bounds of the tile at `index`.
    pub fn bounds_from_index(&self, index: &TileIndex) -> Result<BoundingBox, GridError> {
        let grid = self.level(index.z)?;
        let (span_x, span_y) = self.tile_span(grid);
        let (origin_x, origin_y) = self.tile_origin();

        let row = if self.top_left_aligned {
            index.y - grid.tiles_high
        } else {
            index.y
        };

        let min_x = origin_x + span_x * index.x as f64;
        let min_y = origin_y + span_y * row as f64;
        Ok(BoundingBox::new(min_x, min_y, min_x + span_x, min_y + span_y))
    }

    /// Bounds of an index rectangle.
    pub fn bounds_from_rectangle(&self, rect: &Coverage) -> Result<BoundingBox, GridError> {
        let lower = self.bounds_from_index(&TileIndex::new(rect.min_x, rect.min_y, rect.z))?;
        let upper = self.bounds_from_index(&TileIndex::new(rect.max_x, rect.max_y, rect.z))?;
        Ok(BoundingBox::new(
            lower.min_x,
            lower.min_y,
            upper.max_x,
            upper.max_y,
        ))
    }

    /// Smallest index rectangle at level `z` whose tiles fully contain
    /// `bounds`, clamped to the grid.
    ///
    /// Minimums are floored, maximums are `ceil - 1`, and the result never
    /// has a maximum below its minimum.
    pub fn closest_rectangle(&self, z: u32, bounds: &BoundingBox) -> Result<Coverage, GridError> {
        let grid = self.level(z)?;
        let (span_x, span_y) = self.tile_span(grid);
        let (origin_x, origin_y) = self.tile_origin();

        let mut min_x = snap((bounds.min_x - origin_x) / span_x).floor() as i64;
        let mut min_y = snap((bounds.min_y - origin_y) / span_y).floor() as i64;
        let mut max_x = snap((bounds.max_x - origin_x) / span_x).ceil() as i64 - 1;
        let mut max_y = snap((bounds.max_y - origin_y) / span_y).ceil() as i64 - 1;

        if self.top_left_aligned {
            min_y += grid.tiles_high;
            max_y += grid.tiles_high;
        }

        // A zero-width box sitting on a tile boundary
        max_x = max_x.max(min_x);
        max_y = max_y.max(min_y);

        min_x = min_x.clamp(0, grid.tiles_wide - 1);
        max_x = max_x.clamp(0, grid.tiles_wide - 1);
        min_y = min_y.clamp(0, grid.tiles_high - 1);
        max_y = max_y.clamp(0, grid.tiles_high - 1);

        Ok(Coverage::new(min_x, min_y, max_x, max_y, z))
    }
}

fn snap(value: f64) -> f64 {
    let rounded = value.round();
    if (value - rounded).abs() < SNAP_TOLERANCE {
        rounded
    } else {
        value
    }
}

// =============================================================================
// Builder
// =============================================================================

#[derive(Debug, Clone)]
enum LevelSpec {
    Count(u32),
    Resolutions(Vec<f64>),
}

/// Builder for [`GridSet`].
///
/// Levels are given either as a count, in which case the level 0 resolution
/// is chosen so the extent fits a whole number of tiles along its longer
/// axis and every further level halves it, or as explicit resolutions.
#[derive(Debug, Clone)]
pub struct GridSetBuilder {
    name: String,
    srs: Srs,
    extent: BoundingBox,
    top_left_aligned: bool,
    tile_width: u32,
    tile_height: u32,
    meters_per_unit: f64,
    pixel_size: f64,
    levels: LevelSpec,
    level_names: Option<Vec<String>>,
}

impl GridSetBuilder {
    fn new(name: impl Into<String>, srs: Srs, extent: BoundingBox) -> Self {
        Self {
            name: name.into(),
            srs,
            extent,
            top_left_aligned: false,
            tile_width: DEFAULT_TILE_SIZE,
            tile_height: DEFAULT_TILE_SIZE,
            meters_per_unit: 1.0,
            pixel_size: DEFAULT_PIXEL_SIZE,
            levels: LevelSpec::Count(1),
            level_names: None,
        }
    }

    pub fn top_left_aligned(mut self, aligned: bool) -> Self {
        self.top_left_aligned = aligned;
        self
    }

    pub fn tile_size(mut self, width: u32, height: u32) -> Self {
        self.tile_width = width;
        self.tile_height = height;
        self
    }

    pub fn meters_per_unit(mut self, meters_per_unit: f64) -> Self {
        self.meters_per_unit = meters_per_unit;
        self
    }

    pub fn pixel_size(mut self, pixel_size: f64) -> Self {
        self.pixel_size = pixel_size;
        self
    }

    /// Generate `count` levels by successive halving.
    pub fn levels(mut self, count: u32) -> Self {
        self.levels = LevelSpec::Count(count);
        self
    }

    /// Use explicit resolutions, one per level.
    pub fn resolutions(mut self, resolutions: Vec<f64>) -> Self {
        self.levels = LevelSpec::Resolutions(resolutions);
        self
    }

    /// Override the default `<name>:<z>` level names.
    pub fn level_names(mut self, names: Vec<String>) -> Self {
        self.level_names = Some(names);
        self
    }

    pub fn build(self) -> Result<GridSet, GridError> {
        if !self.extent.is_valid() || self.extent.width() <= 0.0 || self.extent.height() <= 0.0 {
            return Err(GridError::InvalidResolutions(format!(
                "grid set {} has an empty extent {}",
                self.name, self.extent
            )));
        }
        if self.tile_width == 0 || self.tile_height == 0 {
            return Err(GridError::InvalidResolutions(format!(
                "grid set {} has a zero tile size",
                self.name
            )));
        }

        let resolutions = match &self.levels {
            LevelSpec::Count(count) => self.halving_resolutions(*count),
            LevelSpec::Resolutions(resolutions) => resolutions.clone(),
        };
        validate_resolutions(&resolutions)?;

        if let Some(ref names) = self.level_names {
            if names.len() != resolutions.len() {
                return Err(GridError::InvalidResolutions(format!(
                    "{} level names given for {} levels",
                    names.len(),
                    resolutions.len()
                )));
            }
        }

        let levels = resolutions
            .iter()
            .enumerate()
            .map(|(z, &resolution)| {
                let name = match self.level_names {
                    Some(ref names) => names[z].clone(),
                    None => format!("{}:{}", self.name, z),
                };
                Grid {
                    name,
                    resolution,
                    scale_denominator: resolution * self.meters_per_unit / self.pixel_size,
                    tiles_wide: tiles_needed(self.extent.width(), resolution, self.tile_width),
                    tiles_high: tiles_needed(self.extent.height(), resolution, self.tile_height),
                }
            })
            .collect();

        Ok(GridSet {
            name: self.name,
            srs: self.srs,
            extent: self.extent,
            top_left_aligned: self.top_left_aligned,
            tile_width: self.tile_width,
            tile_height: self.tile_height,
            meters_per_unit: self.meters_per_unit,
            pixel_size: self.pixel_size,
            levels,
        })
    }

    fn halving_resolutions(&self, count: u32) -> Vec<f64> {
        let tile_w = self.tile_width as f64;
        let tile_h = self.tile_height as f64;
        let width = self.extent.width();
        let height = self.extent.height();

        // Ratio of the extent's aspect to the tile's aspect
        let ratio = (width / tile_w) / (height / tile_h);
        let base = if ratio >= 1.0 {
            let tiles_wide = ratio.round().max(1.0);
            (width / (tiles_wide * tile_w)).max(height / tile_h)
        } else {
            let tiles_high = (1.0 / ratio).round().max(1.0);
            (height / (tiles_high * tile_h)).max(width / tile_w)
        };

        (0..count).map(|z| base / 2f64.powi(z as i32)).collect()
    }
}

fn validate_resolutions(resolutions: &[f64]) -> Result<(), GridError> {
    if resolutions.is_empty() {
        return Err(GridError::InvalidResolutions(
            "at least one level is required".to_string(),
        ));
    }
    if let Some(bad) = resolutions.iter().find(|r| !r.is_finite() || **r <= 0.0) {
        return Err(GridError::InvalidResolutions(format!(
            "resolution {} is not a positive number",
            bad
        )));
    }
    for (z, pair) in resolutions.windows(2).enumerate() {
        if pair[1] >= pair[0] {
            return Err(GridError::InvalidResolutions(format!(
                "resolution at level {} ({}) is not smaller than at level {} ({})",
                z + 1,
                pair[1],
                z,
                pair[0]
            )));
        }
    }
    Ok(())
}

fn tiles_needed(length: f64, resolution: f64, tile_size: u32) -> i64 {
    let tiles = snap(length / (resolution * tile_size as f64)).ceil() as i64;
    tiles.max(1)
}

/// Resolve one of the built-in grid sets by name.
pub fn builtin_gridset(name: &str) -> Result<GridSet, GridError> {
    match name.to_ascii_uppercase().as_str() {
        "EPSG:4326" | "GLOBALCRS84GEOMETRIC" => Ok(GridSet::world_epsg4326()),
        "EPSG:900913" | "EPSG:3857" | "GOOGLEMAPSCOMPATIBLE" => Ok(GridSet::world_epsg3857()),
        _ => Err(GridError::UnknownGridSet(name.to_string())),
    }
}
