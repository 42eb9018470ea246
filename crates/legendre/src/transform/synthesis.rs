use std::time::Instant;

use nalgebra::Complex;
use regrid_common::same;
use tracing::debug;

use super::bounds::{
    band_indices, keep_north_row, keep_south_row, north_row_latitude, pole_rows,
    south_row_latitude,
};
use super::pole::{first_harmonic, pole_row};
use super::LatitudeRow;
use crate::error::{LegendreError, Result};
use crate::generator::spectral_length;
use crate::loader::LegendreLoader;

/// Legendre synthesis: spectral coefficients to Fourier coefficients per latitude.
///
/// Each northern coefficient row yields both the northern row and its
/// mirror in the southern hemisphere: even (n - m) terms are symmetric about
/// the equator and odd ones antisymmetric, so the two rows are the sum and the
/// difference of the even and odd partial sums.
#[derive(Debug)]
pub struct SpectralToGrid<'a> {
    loader: &'a dyn LegendreLoader,
    latitudes: &'a [f64],
    wind: bool,
    north: f64,
    south: f64,
}

impl<'a> SpectralToGrid<'a> {
    /// `latitudes` is the global latitude table (north to south) whose
    /// northern part indexes the loader's rows.
    pub fn new(
        loader: &'a dyn LegendreLoader,
        latitudes: &'a [f64],
        wind: bool,
        north: f64,
        south: f64,
    ) -> Self {
        Self {
            loader,
            latitudes,
            wind,
            north,
            south,
        }
    }

    /// Fourier coefficients for every latitude in the north/south band,
    /// ordered north to south.
    pub fn execute(&self, data: &[Complex<f64>]) -> Result<Vec<LatitudeRow>> {
        let truncation = self.loader.truncation();
        if data.len() != spectral_length(truncation) {
            return Err(LegendreError::wrong_value(format!(
                "truncation {} needs {} spectral coefficients, got {}",
                truncation,
                spectral_length(truncation),
                data.len()
            )));
        }

        let start = Instant::now();
        let (first, last) = band_indices(self.latitudes, self.north, self.south)?;
        let mut rows = Vec::with_capacity(2 * (last + 1).saturating_sub(first));
        let mut sums = vec![Complex::new(0.0, 0.0); truncation + 1];
        let mut diffs = vec![Complex::new(0.0, 0.0); truncation + 1];

        for (row_index, &latitude) in self.latitudes.iter().enumerate().take(last + 1).skip(first) {
            if self.wind && same(latitude, 90.0) {
                self.push_pole_rows(data, truncation, &mut rows);
                continue;
            }

            {
                let polynomials = self.loader.row_at(latitude, row_index)?;
                accumulate(&polynomials, data, truncation, &mut sums, &mut diffs);
            }

            if keep_north_row(self.north, self.south, latitude) {
                let values = sums
                    .iter()
                    .zip(&diffs)
                    .flat_map(|(s, d)| [s.re + d.re, s.im + d.im])
                    .collect();
                rows.push(LatitudeRow::new(north_row_latitude(self.north, latitude), values));
            }
            if keep_south_row(self.north, self.south, latitude) {
                let values = sums
                    .iter()
                    .zip(&diffs)
                    .flat_map(|(s, d)| [s.re - d.re, s.im - d.im])
                    .collect();
                rows.push(LatitudeRow::new(south_row_latitude(self.south, latitude), values));
            }
        }

        // First row computed for a latitude wins
        rows.sort_by(|a, b| b.latitude.total_cmp(&a.latitude));
        rows.dedup_by(|later, earlier| same(later.latitude, earlier.latitude));

        debug!(
            truncation,
            first,
            last,
            rows = rows.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Legendre synthesis"
        );
        Ok(rows)
    }

    fn push_pole_rows(&self, data: &[Complex<f64>], truncation: usize, rows: &mut Vec<LatitudeRow>) {
        let (north_pole, south_pole) = pole_rows(self.north, self.south);
        if north_pole {
            let harmonic = first_harmonic(data, truncation, true);
            rows.push(LatitudeRow::new(90.0, pole_row(truncation, harmonic)));
        }
        if south_pole {
            let harmonic = first_harmonic(data, truncation, false);
            rows.push(LatitudeRow::new(-90.0, pole_row(truncation, harmonic)));
        }
    }
}

/// Even and odd (n - m) partial sums of P(n,m) * a(n,m) for each m.
fn accumulate(
    polynomials: &[f64],
    data: &[Complex<f64>],
    truncation: usize,
    sums: &mut [Complex<f64>],
    diffs: &mut [Complex<f64>],
) {
    let mut poly_offset = 0;
    let mut data_offset = 0;
    for m in 0..=truncation {
        let degrees = truncation - m + 1;
        let poly = &polynomials[poly_offset..poly_offset + degrees];
        let coeffs = &data[data_offset..data_offset + degrees];

        let mut even = Complex::new(0.0, 0.0);
        let mut odd = Complex::new(0.0, 0.0);
        for (k, (&p, &a)) in poly.iter().zip(coeffs).enumerate() {
            if k % 2 == 0 {
                even += a * p;
            } else {
                odd += a * p;
            }
        }
        sums[m] = even;
        diffs[m] = odd;

        // Rows carry one extra degree (T + 1) per wavenumber
        poly_offset += degrees + 1;
        data_offset += degrees;
    }
}
