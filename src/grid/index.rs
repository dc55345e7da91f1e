use std::fmt;

use serde::{Deserialize, Serialize};

/// Position of a tile in a grid: column, row (counted from the bottom) and
/// zoom level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileIndex {
    pub x: i64,
    pub y: i64,
    pub z: u32,
}

impl TileIndex {
    pub fn new(x: i64, y: i64, z: u32) -> Self {
        Self { x, y, z }
    }
}

impl fmt::Display for TileIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.z, self.x, self.y)
    }
}

/// Inclusive rectangle of tile indices at one zoom level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Coverage {
    pub min_x: i64,
    pub min_y: i64,
    pub max_x: i64,
    pub max_y: i64,
    pub z: u32,
}

impl Coverage {
    pub fn new(min_x: i64, min_y: i64, max_x: i64, max_y: i64, z: u32) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
            z,
        }
    }

    /// Whether the index lies in this rectangle (zoom included).
    pub fn contains(&self, index: &TileIndex) -> bool {
        index.z == self.z
            && index.x >= self.min_x
            && index.x <= self.max_x
            && index.y >= self.min_y
            && index.y <= self.max_y
    }

    pub fn tiles_wide(&self) -> i64 {
        self.max_x - self.min_x + 1
    }

    pub fn tiles_high(&self) -> i64 {
        self.max_y - self.min_y + 1
    }

    /// Number of tiles in the rectangle.
    pub fn tile_count(&self) -> u64 {
        (self.tiles_wide().max(0) as u64) * (self.tiles_high().max(0) as u64)
    }

    /// The rectangle as `[min_x, min_y, max_x, max_y]`.
    pub fn as_array(&self) -> [i64; 4] {
        [self.min_x, self.min_y, self.max_x, self.max_y]
    }

    /// Iterate over every index in the rectangle, row by row.
    pub fn indices(&self) -> impl Iterator<Item = TileIndex> + '_ {
        (self.min_y..=self.max_y)
            .flat_map(move |y| (self.min_x..=self.max_x).map(move |x| TileIndex::new(x, y, self.z)))
    }
}

impl fmt::Display for Coverage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "z{} [{}, {}] .. [{}, {}]",
            self.z, self.min_x, self.min_y, self.max_x, self.max_y
        )
    }
}
