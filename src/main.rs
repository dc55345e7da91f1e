//! tilestore - tile addressing and cache inspection tool.

use std::collections::BTreeMap;
use std::process::ExitCode;
use std::sync::Arc;

use bytes::Bytes;
use clap::Parser;
use serde::Serialize;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tilestore::{
    builtin_gridset,
    config::{BoundsConfig, Cli, Command, CoverageConfig, SimulateConfig},
    BlobStore, ByteArrayResource, GeometryFilter, GridSubset, LruCacheProvider, MemoryBlobStore,
    RequestFilter, TileIndex, TileObject, TileRequest, TransientBlobStore,
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.into_command() {
        Command::Coverage(config) => run_coverage(config),
        Command::Bounds(config) => run_bounds(config),
        Command::Simulate(config) => run_simulate(config).await,
    }
}

/// Initialize the tracing/logging subsystem. Logs go to stderr so JSON
/// output stays clean.
fn init_logging(verbose: bool) {
    let env_filter = if verbose { "tilestore=debug" } else { "tilestore=info" };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn print_json<T: Serialize>(value: &T) -> ExitCode {
    match serde_json::to_string_pretty(value) {
        Ok(json) => {
            println!("{}", json);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Failed to serialize output: {}", e);
            ExitCode::FAILURE
        }
    }
}

// =============================================================================
// Coverage Command
// =============================================================================

#[derive(Serialize)]
struct CoverageRow {
    z: u32,
    level: String,
    min_x: i64,
    min_y: i64,
    max_x: i64,
    max_y: i64,
    tiles: u64,
}

fn run_coverage(config: CoverageConfig) -> ExitCode {
    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let subset = match builtin_gridset(&config.gridset).and_then(|gridset| {
        GridSubset::new(
            Arc::new(gridset),
            config.bbox,
            config.zoom_start,
            config.zoom_stop,
        )
    }) {
        Ok(subset) => subset,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let names = subset.grid_names();
    let rows: Vec<CoverageRow> = if config.wmts {
        subset
            .wmts_coverages()
            .into_iter()
            .zip(subset.coverages())
            .zip(names)
            .map(|((rect, coverage), level)| CoverageRow {
                z: coverage.z,
                level,
                min_x: rect[0],
                min_y: rect[1],
                max_x: rect[2],
                max_y: rect[3],
                tiles: coverage.tile_count(),
            })
            .collect()
    } else {
        subset
            .coverages()
            .iter()
            .zip(names)
            .map(|(coverage, level)| CoverageRow {
                z: coverage.z,
                level,
                min_x: coverage.min_x,
                min_y: coverage.min_y,
                max_x: coverage.max_x,
                max_y: coverage.max_y,
                tiles: coverage.tile_count(),
            })
            .collect()
    };

    if config.json {
        return print_json(&rows);
    }

    println!(
        "Grid set {} ({}), extent {}",
        subset.name(),
        subset.srs(),
        subset.original_extent()
    );
    println!(
        "{:>4}  {:<16} {:>10} {:>10} {:>10} {:>10} {:>12}",
        "z", "level", "min_x", "min_y", "max_x", "max_y", "tiles"
    );
    for row in &rows {
        println!(
            "{:>4}  {:<16} {:>10} {:>10} {:>10} {:>10} {:>12}",
            row.z, row.level, row.min_x, row.min_y, row.max_x, row.max_y, row.tiles
        );
    }
    ExitCode::SUCCESS
}

// =============================================================================
// Bounds Command
// =============================================================================

#[derive(Serialize)]
struct BoundsReport {
    gridset: String,
    index: TileIndex,
    min_x: f64,
    min_y: f64,
    max_x: f64,
    max_y: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    served: Option<bool>,
}

fn run_bounds(config: BoundsConfig) -> ExitCode {
    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let subset = match builtin_gridset(&config.gridset)
        .and_then(|gridset| GridSubset::full(Arc::new(gridset)))
    {
        Ok(subset) => Arc::new(subset),
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let index = TileIndex::new(config.x, config.y, config.z);
    if !subset.covers(&index) {
        error!("Tile {} is outside grid set {}", index, subset.name());
        return ExitCode::FAILURE;
    }
    let bounds = match subset.bounds_from_index(&index) {
        Ok(bounds) => bounds,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let served = match config.mask {
        Some(ref mask) => {
            // The mask defaults to the CRS of the grid set
            let filter = match config.mask_crs {
                Some(ref crs) => GeometryFilter::default().with_crs(crs),
                None => Ok(GeometryFilter::default().with_srs(subset.srs())),
            };
            let filter = match filter {
                Ok(filter) => filter
                    .with_bounds(mask)
                    .with_check_intersection(config.intersects)
                    .with_axis_order_north_east(config.north_east),
                Err(e) => {
                    error!("Configuration error: {}", e);
                    return ExitCode::FAILURE;
                }
            };
            let request = TileRequest::new("cli", subset.clone(), index);
            match filter.apply(&request) {
                Ok(()) => Some(true),
                Err(e) if e.is_blank_tile() => Some(false),
                Err(e) => {
                    error!("{}", e);
                    return ExitCode::FAILURE;
                }
            }
        }
        None => None,
    };

    let report = BoundsReport {
        gridset: subset.name().to_string(),
        index,
        min_x: bounds.min_x,
        min_y: bounds.min_y,
        max_x: bounds.max_x,
        max_y: bounds.max_y,
        served,
    };

    if config.json {
        return print_json(&report);
    }

    println!("Tile {} of {}", report.index, report.gridset);
    println!("  bounds: {}", bounds);
    match report.served {
        Some(true) => println!("  mask:   served"),
        Some(false) => println!("  mask:   blank"),
        None => {}
    }
    ExitCode::SUCCESS
}

// =============================================================================
// Simulate Command
// =============================================================================

#[derive(Serialize)]
struct SimulationReport {
    tiles_written: u64,
    reads: u64,
    reads_found: u64,
    reads_after_external_delete: u64,
    found_after_external_delete: u64,
    cache: tilestore::CacheStatistics,
}

async fn run_simulate(config: SimulateConfig) -> ExitCode {
    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let subset = match builtin_gridset(&config.gridset).and_then(|gridset| {
        let stop = config.max_zoom.min(gridset.num_levels().saturating_sub(1));
        GridSubset::new(Arc::new(gridset), None, Some(0), Some(stop))
    }) {
        Ok(subset) => subset,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let backend = Arc::new(TransientBlobStore::new());
    let provider = Arc::new(LruCacheProvider::from_config(&config.cache));
    let store = MemoryBlobStore::with_cache_provider(backend.clone(), provider);

    info!(
        layer = %config.layer,
        gridset = subset.name(),
        zoom_stop = subset.zoom_stop(),
        budget_mb = config.cache.hard_memory_limit_mb,
        "Starting simulation"
    );

    let payload = Bytes::from(vec![0xA5u8; config.tile_bytes]);
    let tile = |index: TileIndex| {
        TileObject::complete(
            &config.layer,
            index,
            subset.name(),
            "image/png",
            BTreeMap::new(),
            Arc::new(ByteArrayResource::new(payload.clone())),
        )
    };
    let indices: Vec<TileIndex> = subset
        .coverages()
        .iter()
        .flat_map(|coverage| coverage.indices().collect::<Vec<_>>())
        .collect();

    for index in &indices {
        if let Err(e) = store.put(&tile(*index)).await {
            error!("Failed to store tile {}: {}", index, e);
            return ExitCode::FAILURE;
        }
    }

    let mut reads = 0;
    let mut reads_found = 0;
    for _ in 0..config.read_passes {
        for index in &indices {
            let mut query = TileObject::from_key(tile(*index).key().clone());
            reads += 1;
            match store.get(&mut query).await {
                Ok(true) => reads_found += 1,
                Ok(false) => {}
                Err(e) => {
                    error!("Failed to read tile {}: {}", index, e);
                    return ExitCode::FAILURE;
                }
            }
        }
    }

    // Delete on the backend directly; the cache must follow
    if let Err(e) = backend.delete_by_grid_set(&config.layer, subset.name()).await {
        error!("Failed to delete grid set: {}", e);
        return ExitCode::FAILURE;
    }
    let mut found_after_delete = 0;
    for index in &indices {
        let mut query = TileObject::from_key(tile(*index).key().clone());
        if matches!(store.get(&mut query).await, Ok(true)) {
            found_after_delete += 1;
        }
    }

    let report = SimulationReport {
        tiles_written: indices.len() as u64,
        reads,
        reads_found,
        reads_after_external_delete: indices.len() as u64,
        found_after_external_delete: found_after_delete,
        cache: store.cache_statistics().await,
    };

    if config.json {
        return print_json(&report);
    }

    let stats = &report.cache;
    println!("Simulation on layer '{}' ({})", config.layer, subset.name());
    println!("  tiles written:              {}", report.tiles_written);
    println!("  reads:                      {} ({} found)", report.reads, report.reads_found);
    println!(
        "  found after backend delete: {} of {}",
        report.found_after_external_delete, report.reads_after_external_delete
    );
    println!("Cache:");
    println!("  hits / misses:              {} / {}", stats.hit_count, stats.miss_count);
    println!("  hit rate:                   {:.1}%", stats.hit_rate);
    println!("  evictions:                  {}", stats.eviction_count);
    println!(
        "  memory:                     {} of {} bytes ({:.1}%)",
        stats.actual_size, stats.total_size, stats.memory_occupation
    );
    ExitCode::SUCCESS
}
