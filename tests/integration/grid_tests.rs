//! Integration tests for grid addressing.
//!
//! These tests verify:
//! - Tile bounds and the index rectangle they map back to agree
//! - Per-level coverage of a subset
//! - Level names and their zoom levels
//! - Row flipping for WMTS coverages

use std::sync::Arc;

use proptest::prelude::*;
use tilestore::error::GridError;
use tilestore::grid::{builtin_gridset, BoundingBox, GridSet, GridSubset, Srs, TileIndex};

fn world() -> Arc<GridSet> {
    Arc::new(GridSet::world_epsg4326())
}

fn eastern_hemisphere(zoom_start: u32, zoom_stop: u32) -> GridSubset {
    GridSubset::new(
        world(),
        Some(BoundingBox::new(0.0, 0.0, 180.0, 90.0)),
        Some(zoom_start),
        Some(zoom_stop),
    )
    .unwrap()
}

// =============================================================================
// Bounds
// =============================================================================

#[test]
fn test_bounds_of_known_tiles() {
    let subset = GridSubset::full(world()).unwrap();

    assert_eq!(
        subset.bounds_from_index(&TileIndex::new(0, 0, 0)).unwrap(),
        BoundingBox::new(-180.0, -90.0, 0.0, 90.0)
    );
    assert_eq!(
        subset.bounds_from_index(&TileIndex::new(1, 0, 0)).unwrap(),
        BoundingBox::new(0.0, -90.0, 180.0, 90.0)
    );
    assert_eq!(
        subset.bounds_from_index(&TileIndex::new(2, 1, 1)).unwrap(),
        BoundingBox::new(0.0, 0.0, 90.0, 90.0)
    );
}

#[test]
fn test_bounds_outside_zoom_range() {
    let subset = eastern_hemisphere(1, 3);
    let result = subset.bounds_from_index(&TileIndex::new(0, 0, 0));
    assert!(matches!(result, Err(GridError::InvalidZoomLevel { z: 0, .. })));
}

#[test]
fn test_web_mercator_single_root_tile() {
    let gridset = builtin_gridset("EPSG:3857").unwrap();
    assert_eq!(gridset.srs(), Srs::epsg(900913));

    let subset = GridSubset::full(Arc::new(gridset)).unwrap();
    assert_eq!(subset.num_tiles(0).unwrap(), 1);
    assert_eq!(subset.num_tiles(1).unwrap(), 4);

    let root = subset.bounds_from_index(&TileIndex::new(0, 0, 0)).unwrap();
    assert!((root.min_x + 20_037_508.34).abs() < 1e-6);
    assert!((root.max_y - 20_037_508.34).abs() < 1e-6);
}

#[test]
fn test_unknown_builtin_gridset() {
    assert!(matches!(
        builtin_gridset("EPSG:27700"),
        Err(GridError::UnknownGridSet(_))
    ));
}

// =============================================================================
// Coverage
// =============================================================================

#[test]
fn test_eastern_hemisphere_coverages() {
    let subset = eastern_hemisphere(0, 2);
    let rects: Vec<[i64; 4]> = subset.coverages().iter().map(|c| c.as_array()).collect();
    assert_eq!(rects, vec![[1, 0, 1, 0], [2, 1, 3, 1], [4, 2, 7, 3]]);
}

#[test]
fn test_wmts_rows_counted_from_top() {
    let subset = eastern_hemisphere(1, 2);
    let wmts = subset.wmts_coverages();
    // Level 1 is 4x2 tiles, level 2 is 8x4
    assert_eq!(wmts, vec![[2, 0, 3, 0], [4, 0, 7, 1]]);
}

#[test]
fn test_grid_names_round_trip_to_zoom() {
    let subset = eastern_hemisphere(3, 9);
    let names = subset.grid_names();
    assert_eq!(names.len(), 7);
    assert_eq!(names.first().map(String::as_str), Some("EPSG:4326:3"));
    assert_eq!(names.last().map(String::as_str), Some("EPSG:4326:9"));

    for (offset, name) in names.iter().enumerate() {
        assert_eq!(subset.grid_index(name).unwrap(), 3 + offset as u32);
    }
    assert!(subset.grid_index("EPSG:4326:10").is_err());
}

#[test]
fn test_custom_level_names() {
    let gridset = GridSet::builder(
        "regional",
        Srs::wgs84(),
        BoundingBox::new(0.0, 0.0, 10.0, 10.0),
    )
    .resolutions(vec![0.1, 0.05, 0.025])
    .level_names(vec!["coarse".into(), "medium".into(), "fine".into()])
    .build()
    .unwrap();

    let subset = GridSubset::full(Arc::new(gridset)).unwrap();
    assert_eq!(subset.grid_names(), vec!["coarse", "medium", "fine"]);
    assert_eq!(subset.grid_index("fine").unwrap(), 2);
}

#[test]
fn test_increasing_resolutions_rejected() {
    let result = GridSet::builder(
        "broken",
        Srs::wgs84(),
        BoundingBox::new(0.0, 0.0, 10.0, 10.0),
    )
    .resolutions(vec![0.1, 0.2])
    .build();
    assert!(matches!(result, Err(GridError::InvalidResolutions(_))));
}

// =============================================================================
// Properties
// =============================================================================

proptest! {
    #[test]
    fn prop_tile_bounds_map_back_to_tile(z in 0u32..10, fx in 0.0f64..1.0, fy in 0.0f64..1.0) {
        let subset = GridSubset::full(world()).unwrap();
        let coverage = subset.coverage(z).unwrap();
        let x = ((coverage.tiles_wide() as f64) * fx) as i64;
        let y = ((coverage.tiles_high() as f64) * fy) as i64;
        let index = TileIndex::new(x, y, z);

        let bounds = subset.bounds_from_index(&index).unwrap();
        let rect = subset.gridset().closest_rectangle(z, &bounds).unwrap();
        prop_assert_eq!(rect.as_array(), [x, y, x, y]);
    }

    #[test]
    fn prop_covered_tiles_touch_requested_area(
        min_x in -180.0f64..170.0,
        min_y in -90.0f64..80.0,
        w in 1.0f64..90.0,
        h in 1.0f64..45.0,
        z in 0u32..8,
    ) {
        let area = BoundingBox::new(min_x, min_y, (min_x + w).min(180.0), (min_y + h).min(90.0));
        let subset = GridSubset::new(world(), Some(area), Some(0), Some(7)).unwrap();

        let coverage = subset.coverage(z).unwrap();
        let covered = subset.gridset().bounds_from_rectangle(&coverage).unwrap();
        prop_assert!(covered.expand(1e-6, 1e-6).contains(&subset.original_extent()));

        for corner in [
            TileIndex::new(coverage.min_x, coverage.min_y, z),
            TileIndex::new(coverage.max_x, coverage.max_y, z),
        ] {
            let bounds = subset.bounds_from_index(&corner).unwrap();
            prop_assert!(bounds.intersects(&subset.original_extent()));
        }
    }
}
