//! Fourier stage along a latitude circle.
//!
//! A real field on a latitude circle is `f(λ) = Re F_0 + 2 Σ Re(F_m e^{imλ})`
//! for m = 1..=T. Coefficients are interleaved real/imaginary pairs.

use nalgebra::Complex;

/// Evaluate the Fourier series `coefficients` at `longitudes` (degrees) into `out`.
pub fn fourier_synthesis(coefficients: &[f64], longitudes: &[f64], out: &mut [f64]) {
    let harmonics: Vec<Complex<f64>> = coefficients
        .chunks_exact(2)
        .map(|pair| Complex::new(pair[0], pair[1]))
        .collect();

    for (value, &longitude) in out.iter_mut().zip(longitudes) {
        let lambda = longitude.to_radians();
        *value = harmonics.iter().enumerate().fold(0.0, |acc, (m, f)| {
            let term = (f * Complex::from_polar(1.0, m as f64 * lambda)).re;
            if m == 0 {
                acc + term
            } else {
                acc + 2.0 * term
            }
        });
    }
}

/// Fourier coefficients up to wavenumber `truncation` of `values` sampled at
/// equally spaced `longitudes` covering the whole circle.
///
/// Exact inverse of [`fourier_synthesis`] when there are more than
/// `2 * truncation` longitudes.
pub fn fourier_analysis(values: &[f64], longitudes: &[f64], truncation: usize) -> Vec<f64> {
    let count = values.len().min(longitudes.len());
    let scale = if count == 0 { 0.0 } else { 1.0 / count as f64 };

    (0..=truncation)
        .flat_map(|m| {
            let sum: Complex<f64> = values
                .iter()
                .zip(longitudes)
                .map(|(&v, &longitude)| {
                    Complex::from_polar(v, -(m as f64) * longitude.to_radians())
                })
                .sum();
            let coefficient = sum * scale;
            [coefficient.re, coefficient.im]
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn circle(count: usize, west: f64) -> Vec<f64> {
        (0..count).map(|i| west + i as f64 * 360.0 / count as f64).collect()
    }

    #[test]
    fn test_constant_and_first_harmonic() {
        let lons = circle(8, 0.0);
        let mut out = vec![0.0; 8];
        fourier_synthesis(&[2.0, 0.0, 0.5, 0.0], &lons, &mut out);
        // 2 + cos(λ)
        for (v, lon) in out.iter().zip(&lons) {
            assert!((v - (2.0 + lon.to_radians().cos())).abs() < 1e-12);
        }
    }

    #[test]
    fn test_analysis_inverts_synthesis() {
        let truncation = 3;
        let coefficients = [1.5, 0.0, -0.5, 0.25, 0.125, -1.0, 0.75, 0.5];
        for west in [0.0, -180.0, 12.5] {
            let lons = circle(2 * truncation + 1, west);
            let mut values = vec![0.0; lons.len()];
            fourier_synthesis(&coefficients, &lons, &mut values);
            let back = fourier_analysis(&values, &lons, truncation);
            for (a, b) in back.iter().zip(&coefficients) {
                assert!((a - b).abs() < 1e-12, "{} vs {}", a, b);
            }
        }
    }

    #[test]
    fn test_empty_circle() {
        assert_eq!(fourier_analysis(&[], &[], 1), vec![0.0; 4]);
    }
}
