//! Spectral ⇄ grid-point transforms built on a [`LegendreLoader`].
//!
//! ```text
//!  spectral coefficients a(n,m)          grid-point values f(lat, lon)
//!            │                                       ▲
//!            ▼  SpectralToGrid (Legendre)            │  fourier_synthesis
//!   Fourier coefficients F_m(lat) ──────────────────┘
//!            ▲                                       │
//!            │  GridToSpectral (Legendre)            ▼  fourier_analysis
//!   Fourier coefficients F_m(lat) ◄──────── grid-point values f(lat, lon)
//! ```
//!
//! Spectral coefficients are stored m-major with n = m..=T, as
//! [`Complex<f64>`] or interleaved real/imaginary `f64` pairs.

mod analysis;
mod bounds;
mod fourier;
mod pole;
mod synthesis;

use std::time::Instant;

use nalgebra::Complex;
use regrid_common::{same, Grid};
use tracing::debug;

use crate::error::{LegendreError, Result};
use crate::generator::spectral_length;
use crate::loader::LegendreLoader;

pub use analysis::GridToSpectral;
pub use bounds::{
    band_indices, keep_north_row, keep_south_row, north_row_latitude, pole_rows,
    south_row_latitude, virtual_band, wave_parameter_south_bound,
};
pub use fourier::{fourier_analysis, fourier_synthesis};
pub use pole::{first_harmonic, pole_row};
pub use synthesis::SpectralToGrid;

/// Fourier coefficients of one latitude circle, interleaved real/imaginary
/// for wavenumbers m = 0..=T.
#[derive(Debug, Clone, PartialEq)]
pub struct LatitudeRow {
    pub latitude: f64,
    pub values: Vec<f64>,
}

impl LatitudeRow {
    pub fn new(latitude: f64, values: Vec<f64>) -> Self {
        Self { latitude, values }
    }

    /// Coefficient of wavenumber `m`, zero beyond the stored range.
    pub fn coefficient(&self, m: usize) -> Complex<f64> {
        match (self.values.get(2 * m), self.values.get(2 * m + 1)) {
            (Some(&re), Some(&im)) => Complex::new(re, im),
            _ => Complex::new(0.0, 0.0),
        }
    }
}

/// Start of wavenumber `m` in an m-major spectral array of truncation `truncation`.
pub const fn spectral_offset(truncation: usize, m: usize) -> usize {
    m * (truncation + 1) - m * m.saturating_sub(1) / 2
}

pub fn to_complex(interleaved: &[f64]) -> Vec<Complex<f64>> {
    interleaved
        .chunks_exact(2)
        .map(|pair| Complex::new(pair[0], pair[1]))
        .collect()
}

pub fn to_interleaved(values: &[Complex<f64>]) -> Vec<f64> {
    values.iter().flat_map(|c| [c.re, c.im]).collect()
}

/// Synthesise grid-point values for `grid` from spectral coefficients.
///
/// Values are returned row by row, north to south, each row running east
/// from the grid's western bound.
pub fn spectral_to_grid(
    loader: &dyn LegendreLoader,
    grid: &dyn Grid,
    data: &[Complex<f64>],
    wind: bool,
    parameter: Option<&str>,
) -> Result<Vec<f64>> {
    let start = Instant::now();
    let area = grid.area();
    let south = parameter.map_or(area.south, |p| wave_parameter_south_bound(p, area.south));
    let global = grid.global_latitudes();

    let rows = SpectralToGrid::new(loader, &global, wind, area.north, south).execute(data)?;

    let longitudes = grid.longitudes();
    let latitudes = grid.latitudes();
    let mut values = vec![0.0; latitudes.len() * longitudes.len()];
    for (&latitude, out) in latitudes
        .iter()
        .zip(values.chunks_exact_mut(longitudes.len().max(1)))
    {
        let row = rows
            .iter()
            .find(|r| same(r.latitude, latitude))
            .ok_or_else(|| {
                LegendreError::wrong_value(format!(
                    "no Fourier coefficients computed for latitude {}",
                    latitude
                ))
            })?;
        fourier_synthesis(&row.values, &longitudes, out);
    }

    debug!(
        truncation = loader.truncation(),
        grid = %grid.coeff_info(),
        points = values.len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Spectral to grid"
    );
    Ok(values)
}

/// Analyse grid-point values on a global grid with quadrature weights into
/// spectral coefficients of the loader's truncation.
pub fn grid_to_spectral(
    loader: &dyn LegendreLoader,
    grid: &dyn Grid,
    values: &[f64],
) -> Result<Vec<Complex<f64>>> {
    let start = Instant::now();
    let truncation = loader.truncation();
    let latitudes = grid.latitudes();
    let longitudes = grid.longitudes();

    let weights = grid.quadrature_weights().ok_or_else(|| {
        LegendreError::wrong_value(format!("grid {} has no quadrature weights", grid.coeff_info()))
    })?;
    if values.len() != latitudes.len() * longitudes.len() {
        return Err(LegendreError::wrong_value(format!(
            "expected {} grid values, got {}",
            latitudes.len() * longitudes.len(),
            values.len()
        )));
    }
    if longitudes.len() <= 2 * truncation {
        return Err(LegendreError::wrong_value(format!(
            "{} longitudes cannot resolve truncation {}",
            longitudes.len(),
            truncation
        )));
    }

    let rows: Vec<LatitudeRow> = latitudes
        .iter()
        .zip(values.chunks_exact(longitudes.len()))
        .map(|(&latitude, row)| {
            LatitudeRow::new(latitude, fourier_analysis(row, &longitudes, truncation))
        })
        .collect();

    let global = grid.global_latitudes();
    let mut output = vec![Complex::new(0.0, 0.0); spectral_length(truncation)];
    GridToSpectral::new(loader, &global).execute(&rows, &weights, &mut output)?;

    debug!(
        truncation,
        grid = %grid.coeff_info(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Grid to spectral"
    );
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spectral_offsets() {
        assert_eq!(spectral_offset(21, 0), 0);
        assert_eq!(spectral_offset(21, 1), 22);
        assert_eq!(spectral_offset(21, 2), 43);
        assert_eq!(spectral_offset(4, 4), spectral_length(4) - 1);
    }

    #[test]
    fn test_complex_interleaving() {
        let values = [1.0, -2.0, 3.5, 0.25];
        let complex = to_complex(&values);
        assert_eq!(complex, vec![Complex::new(1.0, -2.0), Complex::new(3.5, 0.25)]);
        assert_eq!(to_interleaved(&complex), values.to_vec());
    }

    #[test]
    fn test_row_coefficient_out_of_range_is_zero() {
        let row = LatitudeRow::new(10.0, vec![1.0, 2.0]);
        assert_eq!(row.coefficient(0), Complex::new(1.0, 2.0));
        assert_eq!(row.coefficient(1), Complex::new(0.0, 0.0));
    }
}
