//! Common test fixtures for coefficient and transform tests.
//!
//! This module provides pre-defined grids, truncations and latitude sets
//! used across the test suite.

use regrid_common::{Area, RegularGaussian, RegularLatLon};

/// Truncations exercised by loader tests: the degenerate case, odd and even
/// small values and a common operational one.
pub const TRUNCATIONS: [usize; 5] = [0, 1, 4, 7, 21];

/// Truncations small enough for exact round trips on [`small_gaussian`].
pub const ROUND_TRIP_TRUNCATIONS: [usize; 4] = [0, 1, 3, 4];

/// Northern latitudes that avoid the poles and the equator.
pub const SAMPLE_LATITUDES: [f64; 6] = [89.5, 75.0, 45.0, 33.3, 10.0, 0.25];

/// N32 regular Gaussian grid: 64 latitudes, 32 coefficient rows.
pub fn gaussian_n32() -> RegularGaussian {
    RegularGaussian::new(32).unwrap_or_else(|e| panic!("N32 grid: {}", e))
}

/// N8 regular Gaussian grid: 16 latitudes by 32 longitudes.
pub fn small_gaussian() -> RegularGaussian {
    RegularGaussian::new(8).unwrap_or_else(|e| panic!("N8 grid: {}", e))
}

/// Global 1.5 degree lat/lon grid, poles and equator included.
pub fn latlon_1_5() -> RegularLatLon {
    RegularLatLon::new(1.5, 1.5).unwrap_or_else(|e| panic!("1.5 degree grid: {}", e))
}

/// Global 10 degree lat/lon grid.
pub fn coarse_latlon() -> RegularLatLon {
    RegularLatLon::new(10.0, 10.0).unwrap_or_else(|e| panic!("10 degree grid: {}", e))
}

/// Common area definitions, MARS ordered (north, west, south, east).
pub mod area {
    use super::Area;

    pub fn global() -> Area {
        Area::global()
    }

    pub fn northern_band() -> Area {
        Area::new(60.0, 0.0, 30.0, 360.0)
    }

    pub fn southern_band() -> Area {
        Area::new(-20.0, 0.0, -70.0, 360.0)
    }

    pub fn straddling_equator() -> Area {
        Area::new(30.0, 0.0, -60.0, 360.0)
    }
}
