//! Selection of the latitude rows a partial-band synthesis must compute and emit.
//!
//! Coefficient rows only exist for the northern hemisphere; southern rows are
//! derived from them. A requested north/south band is therefore mapped onto a
//! "virtual" northern band first, and each computed row is then kept as a
//! northern row, a southern row, both or neither.
//!
//! The equator and pole boundary cases below are kept exactly as the
//! operational regridding has always resolved them.

use regrid_common::{is_zero, north_index_in, same, south_index_in};

use crate::error::Result;

/// Northern band of rows to compute for the requested `north`/`south` bounds.
///
/// Returns `(virtual_north, virtual_south)`, both at or north of the equator.
pub fn virtual_band(north: f64, south: f64) -> (f64, f64) {
    if north < 0.0 || (is_zero(north) && south < 0.0) {
        return (south.abs(), north.abs());
    }
    if north > 0.0 && south < 0.0 {
        let virtual_north = if south.abs() > north { south.abs() } else { north };
        return (virtual_north, 0.0);
    }
    (north, south)
}

/// Indices into `latitudes` (north to south) of the first and last row to compute.
pub fn band_indices(latitudes: &[f64], north: f64, south: f64) -> Result<(usize, usize)> {
    let (virtual_north, virtual_south) = virtual_band(north, south);
    let first = north_index_in(latitudes, virtual_north)?;
    let last = south_index_in(latitudes, virtual_south)?;
    Ok((first, last))
}

/// Latitude a computed northern row is emitted at.
pub fn north_row_latitude(north: f64, latitude: f64) -> f64 {
    if north < 0.0 {
        -latitude
    } else {
        latitude
    }
}

/// Latitude the mirrored row is emitted at.
pub fn south_row_latitude(south: f64, latitude: f64) -> f64 {
    if south < 0.0 {
        -latitude
    } else {
        latitude
    }
}

/// Whether the row computed at `latitude` is emitted with the sum combination.
pub fn keep_north_row(north: f64, south: f64, latitude: f64) -> bool {
    let north_latitude = north_row_latitude(north, latitude);
    if (north < 0.0 || same(north, 0.0)) && south < 0.0 {
        return false;
    }
    north > north_latitude || same(north, north_latitude)
}

/// Whether the row computed at `latitude` is emitted with the difference combination.
pub fn keep_south_row(north: f64, south: f64, latitude: f64) -> bool {
    let north_latitude = north_row_latitude(north, latitude);
    let south_latitude = south_row_latitude(south, latitude);
    if north > 0.0 && (south > 0.0 || same(south, 0.0)) {
        return false;
    }
    if is_zero(north_latitude) && is_zero(south_latitude) {
        return false;
    }
    south < south_latitude || same(south, south_latitude)
}

/// Which wind pole rows (north, south) are emitted. The bounds must equal the
/// poles exactly.
pub fn pole_rows(north: f64, south: f64) -> (bool, bool) {
    (north == 90.0, south == -90.0)
}

/// South bound actually used for a field with parameter code `parameter`.
///
/// Six-character ocean wave parameters (`140xxx`) reaching 78°S or further
/// are synthesised down to the pole.
pub fn wave_parameter_south_bound(parameter: &str, south: f64) -> f64 {
    if parameter.len() == 6 && parameter.starts_with("140") && south <= -78.0 {
        -90.0
    } else {
        south
    }
}
