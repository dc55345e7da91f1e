//! Spatial reference system identifiers.
//!
//! Only EPSG codes are understood. Web Mercator is known under several codes
//! over the years (900913, 3857, 102113, 102100); they all compare equal.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Codes that all denote spherical Web Mercator.
const WEB_MERCATOR_ALIASES: [u32; 4] = [900913, 3857, 102113, 102100];

/// An EPSG coordinate reference system.
#[derive(Debug, Clone, Copy, Eq, Serialize, Deserialize)]
pub struct Srs {
    number: u32,
}

impl Srs {
    pub const fn epsg(number: u32) -> Self {
        Self { number }
    }

    pub fn wgs84() -> Self {
        Self::epsg(4326)
    }

    pub fn web_mercator() -> Self {
        Self::epsg(900913)
    }

    pub fn number(&self) -> u32 {
        self.number
    }

    /// Resolve an identifier such as `EPSG:4326`, `4326` or
    /// `urn:ogc:def:crs:EPSG::4326`.
    pub fn from_identifier(identifier: &str) -> Result<Self, ConfigError> {
        let trimmed = identifier.trim();
        let lower = trimmed.to_ascii_lowercase();

        let code = if let Some(rest) = lower.strip_prefix("epsg:") {
            rest
        } else if let Some(rest) = lower.strip_prefix("urn:ogc:def:crs:epsg:") {
            // Optional version segment: urn:ogc:def:crs:EPSG:6.6:4326
            rest.rsplit(':').next().unwrap_or(rest)
        } else if let Some(rest) = lower.strip_prefix("urn:x-ogc:def:crs:epsg:") {
            rest.rsplit(':').next().unwrap_or(rest)
        } else if let Some(rest) = lower.strip_prefix("http://www.opengis.net/gml/srs/epsg.xml#") {
            rest
        } else {
            lower.as_str()
        };

        code.parse::<u32>()
            .ok()
            .filter(|n| *n > 0)
            .map(Srs::epsg)
            .ok_or_else(|| ConfigError::UnknownCrs(identifier.to_string()))
    }

    fn canonical(&self) -> u32 {
        if WEB_MERCATOR_ALIASES.contains(&self.number) {
            WEB_MERCATOR_ALIASES[0]
        } else {
            self.number
        }
    }
}

impl PartialEq for Srs {
    fn eq(&self, other: &Self) -> bool {
        self.canonical() == other.canonical()
    }
}

impl std::hash::Hash for Srs {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.canonical().hash(state);
    }
}

impl fmt::Display for Srs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EPSG:{}", self.number)
    }
}

impl FromStr for Srs {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Srs::from_identifier(s)
    }
}
