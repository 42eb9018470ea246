//! Grid specifications consumed by the spectral transforms.

use std::fmt;
use std::sync::Arc;

use crate::area::Area;
use crate::error::{GridError, GridResult};
use crate::gaussian::{gaussian_quadrature, GaussianPoint};
use crate::numeric::{is_zero, same, AREA_FACTOR, EQUATOR_LENGTH, NORTH_POLE, SOUTH_POLE};

/// The view of an output grid needed to build and use Legendre coefficients.
///
/// Latitude tables are always ordered north to south.
pub trait Grid: Send + Sync + fmt::Debug {
    /// Short signature naming the grid family and resolution, e.g. `N80` or `R1.5`.
    /// Used in coefficient file names and cache keys.
    fn coeff_info(&self) -> String;

    /// The global grid this grid is a sub-area of (or a copy of itself).
    fn global_grid(&self) -> Box<dyn Grid>;

    fn area(&self) -> Area;

    fn north_south_number_of_points(&self) -> usize;

    fn west_east_number_of_points(&self) -> usize;

    /// Spacing between consecutive longitudes in degrees.
    fn west_east_increment(&self) -> f64;

    /// Longitudes of this grid from the western bound eastwards.
    fn longitudes(&self) -> Vec<f64> {
        let west = self.area().west;
        let increment = self.west_east_increment();
        (0..self.west_east_number_of_points())
            .map(|i| west + i as f64 * increment)
            .collect()
    }

    /// Latitudes of this grid, restricted to its area.
    fn latitudes(&self) -> Vec<f64>;

    /// Latitudes of the global grid from the north pole down to and
    /// including the equator.
    fn north_hemisphere_latitudes(&self) -> Vec<f64>;

    /// Quadrature weights aligned with [`Grid::latitudes`], normalised so
    /// that they sum to one over the whole sphere. `None` for grids without
    /// an exact quadrature.
    fn quadrature_weights(&self) -> Option<Vec<f64>> {
        None
    }

    /// Latitudes of the global grid.
    fn global_latitudes(&self) -> Vec<f64> {
        self.global_grid().latitudes()
    }

    /// Number of northern-hemisphere latitudes (equator included) of the
    /// global grid; the number of rows in a coefficient file.
    fn nshalf(&self) -> usize {
        (1 + self.global_grid().north_south_number_of_points()) / 2
    }

    /// Index of the first global latitude at or south of `north`.
    fn north_index(&self, north: f64) -> GridResult<usize> {
        north_index_in(&self.global_latitudes(), north)
    }

    /// Index of the last global latitude at or north of `south`.
    fn south_index(&self, south: f64) -> GridResult<usize> {
        south_index_in(&self.global_latitudes(), south)
    }
}

/// Round a north bound to the nearest latitude southwards.
pub fn north_index_in(latitudes: &[f64], north: f64) -> GridResult<usize> {
    let bound = north + AREA_FACTOR;
    latitudes
        .iter()
        .position(|&lat| bound > lat || same(bound, lat))
        .ok_or_else(|| GridError::outside_area("north", north))
}

/// Round a south bound to the nearest latitude northwards.
pub fn south_index_in(latitudes: &[f64], south: f64) -> GridResult<usize> {
    for (i, &lat) in latitudes.iter().enumerate() {
        if same(south, lat) {
            return Ok(i);
        }
        if south > lat {
            return i
                .checked_sub(1)
                .ok_or_else(|| GridError::outside_area("south", south));
        }
    }
    Err(GridError::outside_area("south", south))
}

fn restrict_to_area(latitudes: &[f64], area: &Area) -> Vec<f64> {
    let north = match north_index_in(latitudes, area.north) {
        Ok(i) => i,
        Err(_) => return Vec::new(),
    };
    let south = south_index_in(latitudes, area.south).unwrap_or(latitudes.len().saturating_sub(1));
    if south < north {
        return Vec::new();
    }
    latitudes[north..=south].to_vec()
}

fn points_along(width: f64, increment: f64) -> usize {
    let circle = width + increment + AREA_FACTOR;
    if circle > EQUATOR_LENGTH || same(circle, EQUATOR_LENGTH) {
        return (EQUATOR_LENGTH / increment).round() as usize;
    }
    (width / increment + AREA_FACTOR).floor() as usize + 1
}

// ============================================================================
// Regular Gaussian
// ============================================================================

/// Regular Gaussian grid with 2N latitudes and 4N longitudes per latitude.
#[derive(Clone)]
pub struct RegularGaussian {
    number: usize,
    area: Area,
    points: Arc<Vec<GaussianPoint>>,
}

impl RegularGaussian {
    /// Global regular Gaussian grid of number `number`.
    pub fn new(number: usize) -> GridResult<Self> {
        if number == 0 {
            return Err(GridError::invalid_grid("Gaussian number must be > 0"));
        }
        Ok(Self {
            number,
            area: Area::global(),
            points: Arc::new(gaussian_quadrature(number)),
        })
    }

    /// Regular Gaussian grid restricted to `area`.
    pub fn with_area(number: usize, area: Area) -> GridResult<Self> {
        if area.north < area.south {
            return Err(GridError::invalid_grid(format!("inverted area {}", area)));
        }
        let mut grid = Self::new(number)?;
        grid.area = area;
        Ok(grid)
    }

    pub fn number(&self) -> usize {
        self.number
    }

    fn all_latitudes(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.latitude).collect()
    }

    fn increment(&self) -> f64 {
        90.0 / self.number as f64
    }
}

impl fmt::Debug for RegularGaussian {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegularGaussian")
            .field("number", &self.number)
            .field("area", &self.area)
            .finish()
    }
}

impl Grid for RegularGaussian {
    fn coeff_info(&self) -> String {
        format!("N{}", self.number)
    }

    fn global_grid(&self) -> Box<dyn Grid> {
        Box::new(Self {
            number: self.number,
            area: Area::global(),
            points: Arc::clone(&self.points),
        })
    }

    fn area(&self) -> Area {
        self.area
    }

    fn north_south_number_of_points(&self) -> usize {
        self.latitudes().len()
    }

    fn west_east_number_of_points(&self) -> usize {
        points_along(self.area.width(), self.increment())
    }

    fn west_east_increment(&self) -> f64 {
        self.increment()
    }

    fn latitudes(&self) -> Vec<f64> {
        restrict_to_area(&self.all_latitudes(), &self.area)
    }

    fn north_hemisphere_latitudes(&self) -> Vec<f64> {
        self.points
            .iter()
            .map(|p| p.latitude)
            .take_while(|&lat| lat > 0.0 || is_zero(lat))
            .collect()
    }

    fn quadrature_weights(&self) -> Option<Vec<f64>> {
        let latitudes = self.latitudes();
        let first = latitudes
            .first()
            .and_then(|&lat| self.points.iter().position(|p| same(p.latitude, lat)))?;
        Some(
            self.points[first..first + latitudes.len()]
                .iter()
                .map(|p| p.weight / 2.0)
                .collect(),
        )
    }

    fn global_latitudes(&self) -> Vec<f64> {
        self.all_latitudes()
    }
}

// ============================================================================
// Regular lat/lon
// ============================================================================

/// Regular latitude/longitude grid anchored at the poles.
#[derive(Debug, Clone, Copy)]
pub struct RegularLatLon {
    ns_increment: f64,
    we_increment: f64,
    area: Area,
}

impl RegularLatLon {
    /// Global grid with the given increments in degrees.
    pub fn new(ns_increment: f64, we_increment: f64) -> GridResult<Self> {
        if ns_increment <= 0.0 || we_increment <= 0.0 {
            return Err(GridError::invalid_grid(format!(
                "increments must be > 0, got {}/{}",
                ns_increment, we_increment
            )));
        }
        Ok(Self {
            ns_increment,
            we_increment,
            area: Area::global(),
        })
    }

    pub fn with_area(ns_increment: f64, we_increment: f64, area: Area) -> GridResult<Self> {
        if area.north < area.south {
            return Err(GridError::invalid_grid(format!("inverted area {}", area)));
        }
        let mut grid = Self::new(ns_increment, we_increment)?;
        grid.area = area;
        Ok(grid)
    }

    fn all_latitudes(&self) -> Vec<f64> {
        let count = ((NORTH_POLE - SOUTH_POLE) / self.ns_increment + AREA_FACTOR).floor() as usize + 1;
        (0..count)
            .map(|i| NORTH_POLE - i as f64 * self.ns_increment)
            .collect()
    }
}

impl Grid for RegularLatLon {
    fn coeff_info(&self) -> String {
        format!("R{}", self.ns_increment)
    }

    fn global_grid(&self) -> Box<dyn Grid> {
        Box::new(Self {
            area: Area::global(),
            ..*self
        })
    }

    fn area(&self) -> Area {
        self.area
    }

    fn north_south_number_of_points(&self) -> usize {
        self.latitudes().len()
    }

    fn west_east_number_of_points(&self) -> usize {
        points_along(self.area.width(), self.we_increment)
    }

    fn west_east_increment(&self) -> f64 {
        self.we_increment
    }

    fn latitudes(&self) -> Vec<f64> {
        restrict_to_area(&self.all_latitudes(), &self.area)
    }

    fn north_hemisphere_latitudes(&self) -> Vec<f64> {
        self.all_latitudes()
            .into_iter()
            .take_while(|&lat| lat > 0.0 || is_zero(lat))
            .collect()
    }

    fn global_latitudes(&self) -> Vec<f64> {
        self.all_latitudes()
    }
}
