//! Tolerances used when comparing latitudes and area bounds.

/// Two values closer than this are considered equal.
pub const ROUNDING_FACTOR: f64 = 1.0e-10;

/// GRIB stores area bounds with three decimals, so bounds are widened by
/// this amount before being matched against computed latitudes.
pub const AREA_FACTOR: f64 = 1.0e-3;

pub const NORTH_POLE: f64 = 90.0;
pub const SOUTH_POLE: f64 = -90.0;

/// Length of a full latitude circle in degrees.
pub const EQUATOR_LENGTH: f64 = 360.0;

#[inline]
pub fn is_zero(value: f64) -> bool {
    value.abs() < ROUNDING_FACTOR
}

#[inline]
pub fn same(a: f64, b: f64) -> bool {
    is_zero(a - b)
}
