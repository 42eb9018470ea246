//! Test data generators for spectral and grid-point fields.
//!
//! These generators create predictable, verifiable test data patterns
//! that can be used across the test suite.

use nalgebra::Complex;

/// Number of complex spectral coefficients for truncation `truncation`.
pub fn spectral_count(truncation: usize) -> usize {
    (truncation + 1) * (truncation + 2) / 2
}

/// Creates a deterministic spectral field of truncation `truncation`.
///
/// Coefficients are stored m-major (n = m..=T). Zonal (m = 0) coefficients
/// are real, as they are for any real field, so the field survives a
/// spectral → grid → spectral round trip unchanged.
///
/// # Example
///
/// ```
/// use test_utils::spectral_field;
///
/// let field = spectral_field(4, 1);
/// assert_eq!(field.len(), 15);
/// assert_eq!(field[0].im, 0.0);
/// assert_eq!(field, spectral_field(4, 1));
/// ```
pub fn spectral_field(truncation: usize, seed: u64) -> Vec<Complex<f64>> {
    let mut data = Vec::with_capacity(spectral_count(truncation));
    for m in 0..=truncation {
        for n in m..=truncation {
            let phase = (seed as f64 + 1.0) * 0.7 + n as f64 * 1.3 + m as f64 * 0.37;
            let amplitude = 1.0 / (1.0 + n as f64);
            let re = amplitude * phase.sin();
            let im = if m == 0 { 0.0 } else { amplitude * (1.7 * phase).cos() };
            data.push(Complex::new(re, im));
        }
    }
    data
}

/// Creates a spectral field with a single non-zero coefficient (n, m).
pub fn single_harmonic(truncation: usize, n: usize, m: usize, value: Complex<f64>) -> Vec<Complex<f64>> {
    let mut data = vec![Complex::new(0.0, 0.0); spectral_count(truncation)];
    if m <= n && n <= truncation {
        let offset = m * (truncation + 1) - m * m.saturating_sub(1) / 2;
        data[offset + n - m] = value;
    }
    data
}

/// Flattens complex coefficients into interleaved real/imaginary pairs.
pub fn interleave(values: &[Complex<f64>]) -> Vec<f64> {
    values.iter().flat_map(|c| [c.re, c.im]).collect()
}
