//! Geographic area bounds.

use serde::{Deserialize, Serialize};

use crate::error::{GridError, GridResult};
use crate::numeric::{same, NORTH_POLE, SOUTH_POLE};

/// A latitude/longitude area in degrees.
///
/// Follows the MARS ordering convention `north/west/south/east`, so an area
/// covering the whole globe is `90/0/-90/360`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Area {
    pub north: f64,
    pub west: f64,
    pub south: f64,
    pub east: f64,
}

impl Area {
    /// Create a new area from its four bounds.
    pub fn new(north: f64, west: f64, south: f64, east: f64) -> Self {
        Self {
            north,
            west,
            south,
            east,
        }
    }

    /// The whole globe.
    pub fn global() -> Self {
        Self::new(NORTH_POLE, 0.0, SOUTH_POLE, 360.0)
    }

    /// Parse a MARS style AREA string: "north/west/south/east"
    pub fn from_mars_string(s: &str) -> GridResult<Self> {
        let parts: Vec<&str> = s.split('/').map(str::trim).collect();
        if parts.len() != 4 {
            return Err(GridError::InvalidFormat(s.to_string()));
        }

        let parse = |part: &str| {
            part.parse::<f64>()
                .map_err(|_| GridError::InvalidNumber(part.to_string()))
        };

        let area = Self {
            north: parse(parts[0])?,
            west: parse(parts[1])?,
            south: parse(parts[2])?,
            east: parse(parts[3])?,
        };

        if area.north < area.south {
            return Err(GridError::invalid_grid(format!(
                "north {} is south of south {}",
                area.north, area.south
            )));
        }

        Ok(area)
    }

    /// Latitudinal extent in degrees.
    pub fn height(&self) -> f64 {
        self.north - self.south
    }

    /// Longitudinal extent in degrees.
    pub fn width(&self) -> f64 {
        self.east - self.west
    }

    /// True when the area spans pole to pole.
    pub fn is_global_north_south(&self) -> bool {
        same(self.north, NORTH_POLE) && same(self.south, SOUTH_POLE)
    }

    /// True when the area lies entirely in the northern hemisphere
    /// (the equator counts as northern).
    pub fn is_northern_only(&self) -> bool {
        self.south > 0.0 || same(self.south, 0.0)
    }

    /// True when the area lies entirely in the southern hemisphere.
    pub fn is_southern_only(&self) -> bool {
        self.north < 0.0
    }

    /// Check if a latitude lies within the north/south bounds (inclusive, tolerant).
    pub fn contains_latitude(&self, latitude: f64) -> bool {
        (latitude < self.north || same(latitude, self.north))
            && (latitude > self.south || same(latitude, self.south))
    }
}

impl Default for Area {
    fn default() -> Self {
        Self::global()
    }
}

impl std::fmt::Display for Area {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}/{}", self.north, self.west, self.south, self.east)
    }
}
