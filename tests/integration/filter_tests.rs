//! Integration tests for request filters over real grid subsets.
//!
//! These tests verify:
//! - Which tiles of a level a rectangular mask serves in each mode
//! - Polygon masks, including point contact
//! - Requests in another CRS bypass the filter
//! - Filters behave as trait objects in a chain

use std::sync::Arc;

use geo::{LineString, Polygon};
use tilestore::error::FilterError;
use tilestore::filter::{GeometryFilter, RequestFilter, TileRequest};
use tilestore::grid::{BoundingBox, GridSet, GridSubset, TileIndex};

fn world_subset() -> Arc<GridSubset> {
    Arc::new(GridSubset::full(Arc::new(GridSet::world_epsg4326())).unwrap())
}

fn served_tiles(filter: &dyn RequestFilter, subset: &Arc<GridSubset>, z: u32) -> Vec<TileIndex> {
    let coverage = subset.coverage(z).unwrap();
    coverage
        .indices()
        .filter(|index| {
            let request = TileRequest::new("roads", subset.clone(), *index);
            match filter.apply(&request) {
                Ok(()) => true,
                Err(e) => {
                    assert!(e.is_blank_tile(), "unexpected filter error: {}", e);
                    false
                }
            }
        })
        .collect()
}

fn triangle() -> Polygon<f64> {
    Polygon::new(
        LineString::from(vec![(0.0, 0.0), (90.0, 0.0), (0.0, 90.0), (0.0, 0.0)]),
        vec![],
    )
}

// =============================================================================
// Rectangular Masks
// =============================================================================

#[test]
fn test_containment_serves_tiles_inside_mask() {
    let subset = world_subset();
    let filter = GeometryFilter::default()
        .with_crs("EPSG:4326")
        .unwrap()
        .with_bounds(&BoundingBox::new(0.0, 0.0, 90.0, 90.0));

    let mut served = served_tiles(&filter, &subset, 2);
    served.sort_by_key(|i| (i.x, i.y));
    assert_eq!(
        served,
        vec![
            TileIndex::new(4, 2, 2),
            TileIndex::new(4, 3, 2),
            TileIndex::new(5, 2, 2),
            TileIndex::new(5, 3, 2),
        ]
    );
}

#[test]
fn test_intersection_serves_touching_neighbours() {
    let subset = world_subset();
    let filter = GeometryFilter::default()
        .with_crs("EPSG:4326")
        .unwrap()
        .with_bounds(&BoundingBox::new(0.0, 0.0, 90.0, 90.0))
        .with_check_intersection(true);

    let served = served_tiles(&filter, &subset, 2);
    // Columns 3..=6 and rows 1..=3, edge contact included
    assert_eq!(served.len(), 12);
    assert!(served
        .iter()
        .all(|i| (3..=6).contains(&i.x) && (1..=3).contains(&i.y)));
}

#[test]
fn test_mask_outside_world_blanks_everything() {
    let subset = world_subset();
    let filter = GeometryFilter::default()
        .with_crs("EPSG:4326")
        .unwrap()
        .with_bounds(&BoundingBox::new(200.0, 0.0, 210.0, 10.0))
        .with_check_intersection(true);

    assert!(served_tiles(&filter, &subset, 1).is_empty());
}

// =============================================================================
// Polygon Masks
// =============================================================================

#[test]
fn test_triangle_containment() {
    let subset = world_subset();
    let filter = GeometryFilter::default()
        .with_crs("EPSG:4326")
        .unwrap()
        .with_geometry(triangle());

    let request = |x, y| TileRequest::new("roads", subset.clone(), TileIndex::new(x, y, 2));

    // (0, 0) .. (45, 45) touches the hypotenuse only at a corner
    assert!(filter.apply(&request(4, 2)).is_ok());
    // (45, 45) .. (90, 90) lies outside apart from one point
    assert!(filter.apply(&request(5, 3)).is_err());
}

#[test]
fn test_triangle_point_contact_counts_as_intersection() {
    let subset = world_subset();
    let filter = GeometryFilter::default()
        .with_crs("EPSG:4326")
        .unwrap()
        .with_geometry(triangle())
        .with_check_intersection(true);

    let request = TileRequest::new("roads", subset, TileIndex::new(5, 3, 2));
    assert!(filter.apply(&request).is_ok());
}

// =============================================================================
// Chains and CRS
// =============================================================================

#[test]
fn test_other_crs_bypasses_filter() {
    let mercator = Arc::new(GridSubset::full(Arc::new(GridSet::world_epsg3857())).unwrap());
    let filter = GeometryFilter::default()
        .with_crs("EPSG:4326")
        .unwrap()
        .with_bounds(&BoundingBox::new(0.0, 0.0, 1.0, 1.0));

    assert_eq!(served_tiles(&filter, &mercator, 1).len(), 4);
}

#[test]
fn test_first_blanking_filter_wins() {
    let subset = world_subset();
    let filters: Vec<Box<dyn RequestFilter>> = vec![
        Box::new(
            GeometryFilter::new("east")
                .with_crs("EPSG:4326")
                .unwrap()
                .with_bounds(&BoundingBox::new(0.0, -90.0, 180.0, 90.0)),
        ),
        Box::new(
            GeometryFilter::new("north")
                .with_crs("urn:ogc:def:crs:EPSG::4326")
                .unwrap()
                .with_bounds(&BoundingBox::new(-180.0, 0.0, 180.0, 90.0)),
        ),
    ];

    let apply_all = |index: TileIndex| -> Result<(), FilterError> {
        let request = TileRequest::new("roads", subset.clone(), index);
        filters.iter().try_for_each(|f| f.apply(&request))
    };

    assert!(apply_all(TileIndex::new(3, 1, 1)).is_ok());
    match apply_all(TileIndex::new(0, 1, 1)) {
        Err(FilterError::BlankTile { filter }) => assert_eq!(filter, "east"),
        other => panic!("expected a blank tile, got {:?}", other),
    }
    match apply_all(TileIndex::new(3, 0, 1)) {
        Err(FilterError::BlankTile { filter }) => assert_eq!(filter, "north"),
        other => panic!("expected a blank tile, got {:?}", other),
    }
}
