//! Request filter that blanks tiles outside an allowed area.

use geo::{coord, MultiPolygon, Polygon, Rect, Relate};
use tracing::debug;

use crate::error::{ConfigError, FilterError};
use crate::grid::{BoundingBox, Srs};

use super::request::{RequestFilter, TileRequest};

/// Default filter name.
pub const GEOMETRY_FILTER_NAME: &str = "geometry";

/// Blanks every tile whose bounds are not covered by a geometry.
///
/// By default a tile passes only if the geometry contains it entirely. With
/// [`with_check_intersection`](Self::with_check_intersection) any contact
/// between the tile and the geometry, an edge included, is enough.
///
/// The filter only applies to requests in a grid set with the same CRS as
/// the filter; tiles in any other CRS always pass.
#[derive(Debug, Clone)]
pub struct GeometryFilter {
    name: String,
    srs: Option<Srs>,
    geometry: Option<MultiPolygon<f64>>,
    check_intersection: bool,
    axis_order_north_east: bool,
}

impl GeometryFilter {
    /// A filter that lets everything through until a CRS and a geometry are set.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            srs: None,
            geometry: None,
            check_intersection: false,
            axis_order_north_east: false,
        }
    }

    /// Set the CRS of the filter geometry.
    ///
    /// The identifier is resolved right away; an unknown one is a
    /// configuration error.
    pub fn with_crs(mut self, identifier: &str) -> Result<Self, ConfigError> {
        self.srs = Some(Srs::from_identifier(identifier)?);
        Ok(self)
    }

    /// Set an already resolved CRS.
    pub fn with_srs(mut self, srs: Srs) -> Self {
        self.srs = Some(srs);
        self
    }

    pub fn with_geometry(mut self, geometry: impl Into<MultiPolygon<f64>>) -> Self {
        self.geometry = Some(geometry.into());
        self
    }

    /// Use a rectangle as the geometry.
    pub fn with_bounds(self, bounds: &BoundingBox) -> Self {
        self.with_geometry(rectangle(bounds.min_x, bounds.min_y, bounds.max_x, bounds.max_y))
    }

    /// Accept tiles that intersect the geometry instead of requiring containment.
    pub fn with_check_intersection(mut self, check_intersection: bool) -> Self {
        self.check_intersection = check_intersection;
        self
    }

    /// Geometry coordinates are given north/east (y, x).
    pub fn with_axis_order_north_east(mut self, north_east: bool) -> Self {
        self.axis_order_north_east = north_east;
        self
    }

    pub fn srs(&self) -> Option<Srs> {
        self.srs
    }

    pub fn geometry(&self) -> Option<&MultiPolygon<f64>> {
        self.geometry.as_ref()
    }

    pub fn check_intersection(&self) -> bool {
        self.check_intersection
    }

    pub fn axis_order_north_east(&self) -> bool {
        self.axis_order_north_east
    }

    fn accepts(&self, geometry: &MultiPolygon<f64>, bounds: &BoundingBox) -> bool {
        let tile = if self.axis_order_north_east {
            rectangle(bounds.min_y, bounds.min_x, bounds.max_y, bounds.max_x)
        } else {
            rectangle(bounds.min_x, bounds.min_y, bounds.max_x, bounds.max_y)
        };

        let matrix = geometry.relate(&tile);
        if self.check_intersection {
            matrix.is_intersects()
        } else {
            matrix.is_contains()
        }
    }
}

impl Default for GeometryFilter {
    fn default() -> Self {
        Self::new(GEOMETRY_FILTER_NAME)
    }
}

fn rectangle(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Polygon<f64> {
    Rect::new(coord! { x: min_x, y: min_y }, coord! { x: max_x, y: max_y }).to_polygon()
}

impl RequestFilter for GeometryFilter {
    fn name(&self) -> &str {
        &self.name
    }

    fn apply(&self, request: &TileRequest) -> Result<(), FilterError> {
        let (Some(geometry), Some(srs)) = (&self.geometry, self.srs) else {
            return Ok(());
        };
        // No reprojection: other coordinate systems are outside this filter's scope
        if request.grid_subset.srs() != srs {
            return Ok(());
        }

        let bounds = request.grid_subset.bounds_from_index(&request.index)?;
        if self.accepts(geometry, &bounds) {
            return Ok(());
        }

        debug!(
            filter = %self.name,
            layer = %request.layer_name,
            tile = %request.index,
            "Tile outside filter geometry, serving blank tile"
        );
        Err(FilterError::BlankTile {
            filter: self.name.clone(),
        })
    }
}
