use nalgebra::Complex;

/// Fourier coefficient of the first harmonic of a wind component at a pole.
///
/// Regular synthesis of U/V is singular at ±90°, so only wavenumber 1 is
/// evaluated there, from the m = 1 coefficients with a closed form.
pub fn first_harmonic(data: &[Complex<f64>], truncation: usize, north_pole: bool) -> Complex<f64> {
    let zero = Complex::new(0.0, 0.0);
    let pole_sign = if north_pole { 1.0 } else { -1.0 };
    let norm = -std::f64::consts::SQRT_2;

    let mut factor_odd = -1.0;
    let mut factor_even = -3.0 * pole_sign;
    // m = 1 coefficients start right after the T + 1 zonal ones
    let mut index = truncation + 1;
    let mut harmonic = zero;

    for i in (0..truncation).step_by(2) {
        let n = (i + 1) as f64;
        let z1 = ((2.0 * n + 1.0) / (2.0 * n * (n + 1.0))).sqrt();
        let z2 = if i + 1 == truncation {
            0.0
        } else {
            ((2.0 * (n + 1.0) + 1.0) / (2.0 * (n + 1.0) * (n + 2.0))).sqrt()
        };

        let a = data.get(index).copied().unwrap_or(zero);
        let b = data.get(index + 1).copied().unwrap_or(zero);
        harmonic += (a * (z1 * factor_odd) + b * (z2 * factor_even)) * norm;

        factor_odd -= 2.0 * (n + 1.0) + 1.0;
        factor_even -= (2.0 * (n + 2.0) + 1.0) * pole_sign;
        index += 2;
    }
    harmonic
}

/// Fourier row at a pole for a wind component: only the first harmonic is set.
pub fn pole_row(truncation: usize, harmonic: Complex<f64>) -> Vec<f64> {
    let mut row = vec![0.0; 2 * (truncation + 1)];
    if let Some(slot) = row.get_mut(2..4) {
        slot[0] = harmonic.re;
        slot[1] = harmonic.im;
    }
    row
}
