//! Configuration for the tilestore command line tool and the cache layer.
//!
//! Every option can be given on the command line or through an environment
//! variable with the `TILESTORE_` prefix:
//!
//! - `TILESTORE_GRIDSET` - Grid set name (default: EPSG:4326)
//! - `TILESTORE_CACHE_MEMORY_MB` - Cache byte budget in MB (default: 16)
//! - `TILESTORE_CACHE_MAX_ENTRIES` - Maximum cached tiles (default: 100000)
//! - `TILESTORE_CACHE_EVICTION_POLICY` - `lru`, `expire-after-write` or
//!   `expire-after-access` (default: lru)
//! - `TILESTORE_CACHE_EVICTION_TIME` - Expiry time in seconds (default: 120)
//!
//! [`CacheConfig`] can also be loaded from JSON by hosts embedding the
//! library.

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};

use crate::cache::{
    BYTES_PER_MB, DEFAULT_EVICTION_TIME_SECS, DEFAULT_HARD_MEMORY_LIMIT_MB, DEFAULT_MAX_ENTRIES,
};
use crate::error::ConfigError;
use crate::grid::BoundingBox;

/// Default grid set for commands taking one.
pub const DEFAULT_GRIDSET: &str = "EPSG:4326";

/// Default layer name used by the simulation.
pub const DEFAULT_LAYER: &str = "demo";

// =============================================================================
// CLI Arguments
// =============================================================================

/// Tile addressing and cache inspection tool.
#[derive(Parser, Debug, Clone)]
#[command(name = "tilestore")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

impl Cli {
    pub fn into_command(self) -> Command {
        self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Print the tile coverage of an area at each zoom level.
    Coverage(CoverageConfig),

    /// Print the bounds of one tile, optionally checking it against a mask.
    Bounds(BoundsConfig),

    /// Write and read tiles through the cache and print its statistics.
    Simulate(SimulateConfig),
}

// =============================================================================
// Cache Configuration
// =============================================================================

/// How the built-in cache provider drops entries besides its size bound.
#[derive(ValueEnum, Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum EvictionPolicy {
    /// Least recently used first, no expiry
    #[default]
    Lru,
    /// Entries expire a fixed time after they were written
    ExpireAfterWrite,
    /// Entries expire a fixed time after they were last read
    ExpireAfterAccess,
}

/// Settings of the built-in cache provider.
#[derive(Args, Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct CacheConfig {
    /// Cache byte budget in megabytes.
    #[arg(long = "cache-memory-mb", default_value_t = DEFAULT_HARD_MEMORY_LIMIT_MB, env = "TILESTORE_CACHE_MEMORY_MB")]
    pub hard_memory_limit_mb: u64,

    /// Maximum number of cached tiles.
    #[arg(long = "cache-max-entries", default_value_t = DEFAULT_MAX_ENTRIES, env = "TILESTORE_CACHE_MAX_ENTRIES")]
    pub max_entries: usize,

    /// Eviction policy.
    #[arg(long = "cache-eviction-policy", value_enum, default_value_t = EvictionPolicy::Lru, env = "TILESTORE_CACHE_EVICTION_POLICY")]
    pub eviction_policy: EvictionPolicy,

    /// Expiry time in seconds for the expiring policies.
    #[arg(long = "cache-eviction-time", default_value_t = DEFAULT_EVICTION_TIME_SECS, env = "TILESTORE_CACHE_EVICTION_TIME")]
    pub eviction_time_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            hard_memory_limit_mb: DEFAULT_HARD_MEMORY_LIMIT_MB,
            max_entries: DEFAULT_MAX_ENTRIES,
            eviction_policy: EvictionPolicy::Lru,
            eviction_time_secs: DEFAULT_EVICTION_TIME_SECS,
        }
    }
}

impl CacheConfig {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.hard_memory_limit_mb == 0 {
            return Err("hard_memory_limit_mb must be greater than 0".to_string());
        }
        if self.hard_memory_limit_mb > u64::MAX / BYTES_PER_MB {
            return Err(format!(
                "hard_memory_limit_mb must be at most {}",
                u64::MAX / BYTES_PER_MB
            ));
        }
        if self.max_entries == 0 {
            return Err("max_entries must be greater than 0".to_string());
        }
        if self.eviction_policy != EvictionPolicy::Lru && self.eviction_time_secs == 0 {
            return Err(
                "eviction_time_secs must be greater than 0 with an expiring eviction policy"
                    .to_string(),
            );
        }
        Ok(())
    }

    /// Parse and validate a JSON document. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: CacheConfig =
            serde_json::from_str(json).map_err(|e| ConfigError::InvalidCacheConfig(e.to_string()))?;
        config.validate().map_err(ConfigError::InvalidCacheConfig)?;
        Ok(config)
    }
}

// =============================================================================
// Command Configurations
// =============================================================================

#[derive(Args, Debug, Clone)]
pub struct CoverageConfig {
    /// Built-in grid set name (EPSG:4326 or EPSG:900913).
    #[arg(long, default_value = DEFAULT_GRIDSET, env = "TILESTORE_GRIDSET")]
    pub gridset: String,

    /// Area as minx,miny,maxx,maxy. Defaults to the whole grid set extent.
    #[arg(long, allow_hyphen_values = true)]
    pub bbox: Option<BoundingBox>,

    /// First zoom level.
    #[arg(long)]
    pub zoom_start: Option<u32>,

    /// Last zoom level.
    #[arg(long)]
    pub zoom_stop: Option<u32>,

    /// Print rows counted from the top, as WMTS tile matrices do.
    #[arg(long, default_value_t = false)]
    pub wmts: bool,

    /// Print JSON instead of text.
    #[arg(long, default_value_t = false)]
    pub json: bool,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl CoverageConfig {
    pub fn validate(&self) -> Result<(), String> {
        if let (Some(start), Some(stop)) = (self.zoom_start, self.zoom_stop) {
            if start > stop {
                return Err(format!(
                    "zoom_start ({}) must not exceed zoom_stop ({})",
                    start, stop
                ));
            }
        }
        Ok(())
    }
}

#[derive(Args, Debug, Clone)]
pub struct BoundsConfig {
    /// Built-in grid set name (EPSG:4326 or EPSG:900913).
    #[arg(long, default_value = DEFAULT_GRIDSET, env = "TILESTORE_GRIDSET")]
    pub gridset: String,

    /// Zoom level.
    pub z: u32,

    /// Column.
    pub x: i64,

    /// Row, counted from the bottom of the grid.
    pub y: i64,

    /// Mask rectangle as minx,miny,maxx,maxy; reports whether the tile
    /// would be served or blanked.
    #[arg(long, allow_hyphen_values = true)]
    pub mask: Option<BoundingBox>,

    /// CRS of the mask. Defaults to the grid set CRS.
    #[arg(long)]
    pub mask_crs: Option<String>,

    /// Accept tiles touching the mask instead of requiring containment.
    #[arg(long, default_value_t = false)]
    pub intersects: bool,

    /// Mask coordinates are given north/east (y, x).
    #[arg(long, default_value_t = false)]
    pub north_east: bool,

    /// Print JSON instead of text.
    #[arg(long, default_value_t = false)]
    pub json: bool,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl BoundsConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.x < 0 || self.y < 0 {
            return Err("tile column and row must not be negative".to_string());
        }
        if self.mask.is_none() && (self.mask_crs.is_some() || self.intersects || self.north_east) {
            return Err("--mask-crs, --intersects and --north-east require --mask".to_string());
        }
        Ok(())
    }
}

#[derive(Args, Debug, Clone)]
pub struct SimulateConfig {
    #[command(flatten)]
    pub cache: CacheConfig,

    /// Built-in grid set name (EPSG:4326 or EPSG:900913).
    #[arg(long, default_value = DEFAULT_GRIDSET, env = "TILESTORE_GRIDSET")]
    pub gridset: String,

    /// Layer name.
    #[arg(long, default_value = DEFAULT_LAYER)]
    pub layer: String,

    /// Highest zoom level written.
    #[arg(long, default_value_t = 3)]
    pub max_zoom: u32,

    /// Payload size of every generated tile, in bytes.
    #[arg(long, default_value_t = 4096)]
    pub tile_bytes: usize,

    /// Number of passes reading every tile back.
    #[arg(long, default_value_t = 3)]
    pub read_passes: u32,

    /// Print JSON instead of text.
    #[arg(long, default_value_t = false)]
    pub json: bool,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl SimulateConfig {
    pub fn validate(&self) -> Result<(), String> {
        self.cache.validate()?;
        if self.layer.is_empty() {
            return Err("layer name must not be empty".to_string());
        }
        if self.tile_bytes == 0 {
            return Err("tile_bytes must be greater than 0".to_string());
        }
        if self.max_zoom > 10 {
            return Err("max_zoom must not exceed 10".to_string());
        }
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
