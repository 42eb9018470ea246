//! Associated Legendre function rows.
//!
//! A row holds every P(n,m) for one latitude, zonal wavenumber major:
//! for m = 0..=T the degrees n = m..=T+1, so wavenumber m occupies
//! `T - m + 2` consecutive values starting at [`row_offset`]. The extra
//! degree T+1 is needed by the wind pole formula and by callers deriving
//! meridional derivatives.
//!
//! Functions are normalised so that the integral of P(n,m)^2 over
//! sin(latitude) in [-1, 1] is 2 for every n and m.

use rayon::prelude::*;

/// Number of values in one coefficient row: `(T+1)(T+4)/2`.
#[inline]
pub const fn row_length(truncation: usize) -> usize {
    (truncation + 1) * (truncation + 4) / 2
}

/// Minimum scratch length required by [`generate_row`].
#[inline]
pub const fn work_length(truncation: usize) -> usize {
    3 * (truncation + 1)
}

/// Number of complex spectral coefficients for truncation T.
#[inline]
pub const fn spectral_length(truncation: usize) -> usize {
    (truncation + 1) * (truncation + 2) / 2
}

/// Offset of wavenumber `m` inside a coefficient row.
#[inline]
pub const fn row_offset(truncation: usize, m: usize) -> usize {
    m * (truncation + 2) - m * m.saturating_sub(1) / 2
}

/// Fill `row` with the Legendre functions at `latitude` (degrees).
///
/// `row` must hold at least [`row_length`] values and `work` at least
/// [`work_length`]. Neither is checked in release builds.
pub fn generate_row(truncation: usize, latitude: f64, row: &mut [f64], work: &mut [f64]) {
    debug_assert!(row.len() >= row_length(truncation));
    debug_assert!(work.len() >= work_length(truncation));

    let t = truncation;
    let phi = latitude.to_radians();
    let mu = phi.sin();
    let cos_phi = phi.cos();

    let (diagonal, factors) = work.split_at_mut(t + 1);
    let (sub_diagonal, diagonal_step) = factors.split_at_mut(t + 1);

    // Diagonal P(m,m) from the product of sqrt((2m+1)/(2m)) cos(lat)
    diagonal[0] = 1.0;
    for m in 1..=t {
        let m_f = m as f64;
        diagonal_step[m] = ((2.0 * m_f + 1.0) / (2.0 * m_f)).sqrt();
        diagonal[m] = diagonal_step[m] * cos_phi * diagonal[m - 1];
    }
    for m in 0..=t {
        sub_diagonal[m] = (2.0 * m as f64 + 3.0).sqrt();
    }

    let mut offset = 0;
    for m in 0..=t {
        let block = &mut row[offset..offset + t - m + 2];
        block[0] = diagonal[m];
        block[1] = sub_diagonal[m] * mu * diagonal[m];

        let m2 = (m * m) as f64;
        let mut c1_prev = (2.0 * m as f64 + 3.0).sqrt();
        for (k, n) in (m + 2..=t + 1).enumerate() {
            let n2 = (n * n) as f64;
            let c1 = ((4.0 * n2 - 1.0) / (n2 - m2)).sqrt();
            let c2 = 1.0 / c1_prev;
            block[k + 2] = c1 * (mu * block[k + 1] - c2 * block[k]);
            c1_prev = c1;
        }

        offset += t - m + 2;
    }
}

/// Generate rows for several latitudes in parallel, concatenated in input order.
pub fn generate_rows(truncation: usize, latitudes: &[f64]) -> Vec<f64> {
    let len = row_length(truncation);
    let mut rows = vec![0.0; len * latitudes.len()];
    rows.par_chunks_mut(len)
        .zip(latitudes.par_iter())
        .for_each_init(
            || vec![0.0; work_length(truncation)],
            |work, (row, &latitude)| generate_row(truncation, latitude, row, work),
        );
    rows
}
