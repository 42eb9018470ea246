//! Common grid types shared across the regridding workspace.
//!
//! The Legendre machinery only needs a narrow view of a grid: a signature
//! used to name coefficient files, the global grid it belongs to and that
//! grid's latitude table. This crate provides that boundary as the [`Grid`]
//! trait together with the two global grid families the transforms are
//! exercised against.

pub mod area;
pub mod error;
pub mod gaussian;
pub mod grid;
pub mod numeric;

pub use area::Area;
pub use error::{GridError, GridResult};
pub use gaussian::{gaussian_latitudes, gaussian_quadrature, GaussianPoint};
pub use grid::{north_index_in, south_index_in, Grid, RegularGaussian, RegularLatLon};
pub use numeric::{is_zero, same, AREA_FACTOR, EQUATOR_LENGTH, NORTH_POLE, ROUNDING_FACTOR, SOUTH_POLE};
