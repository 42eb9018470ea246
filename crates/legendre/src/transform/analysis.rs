use std::time::Instant;

use nalgebra::Complex;
use regrid_common::{is_zero, same};
use tracing::debug;

use super::LatitudeRow;
use crate::error::{LegendreError, Result};
use crate::generator::{row_offset, spectral_length};
use crate::loader::LegendreLoader;

/// Legendre analysis: Fourier coefficients per latitude to spectral coefficients.
///
/// The adjoint of [`SpectralToGrid`](super::SpectralToGrid). Output is
/// accumulated, so latitudes can be fed in several batches.
#[derive(Debug)]
pub struct GridToSpectral<'a> {
    loader: &'a dyn LegendreLoader,
    latitudes: &'a [f64],
}

impl<'a> GridToSpectral<'a> {
    /// `latitudes` is the global latitude table (north to south) whose
    /// northern part indexes the loader's rows.
    pub fn new(loader: &'a dyn LegendreLoader, latitudes: &'a [f64]) -> Self {
        Self { loader, latitudes }
    }

    fn row_index(&self, latitude: f64) -> Result<usize> {
        let northern = latitude.abs();
        self.latitudes
            .iter()
            .take(self.loader.rows())
            .position(|&lat| same(lat, northern))
            .ok_or_else(|| {
                LegendreError::wrong_value(format!(
                    "latitude {} has no coefficient row in {}",
                    latitude,
                    self.loader.path().display()
                ))
            })
    }

    /// Add `weight * P(n,m)(latitude) * F_m(latitude)` for every row to `output`.
    pub fn execute(
        &self,
        rows: &[LatitudeRow],
        weights: &[f64],
        output: &mut [Complex<f64>],
    ) -> Result<()> {
        let truncation = self.loader.truncation();
        if output.len() != spectral_length(truncation) {
            return Err(LegendreError::wrong_value(format!(
                "truncation {} needs {} spectral coefficients, got {}",
                truncation,
                spectral_length(truncation),
                output.len()
            )));
        }
        if weights.len() != rows.len() {
            return Err(LegendreError::wrong_value(format!(
                "{} weights for {} latitude rows",
                weights.len(),
                rows.len()
            )));
        }

        let start = Instant::now();
        for (row, &weight) in rows.iter().zip(weights) {
            let southern = row.latitude < 0.0 && !is_zero(row.latitude);
            let polynomials = self
                .loader
                .row_at(row.latitude.abs(), self.row_index(row.latitude)?)?;

            let mut index = 0;
            for m in 0..=truncation {
                let fourier = row.coefficient(m) * weight;
                let block = &polynomials[row_offset(truncation, m)..];
                for (k, &p) in block.iter().take(truncation - m + 1).enumerate() {
                    let p = if southern && k % 2 == 1 { -p } else { p };
                    output[index] += fourier * p;
                    index += 1;
                }
            }
        }

        debug!(
            truncation,
            rows = rows.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Legendre analysis"
        );
        Ok(())
    }
}
