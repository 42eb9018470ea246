//! Gaussian latitudes and quadrature weights.
//!
//! The latitudes of a Gaussian grid of number N are the arcsines of the 2N
//! roots of the ordinary Legendre polynomial of degree 2N. Roots are found
//! by Newton iteration from the usual asymptotic first guess, one per
//! northern latitude, and mirrored into the southern hemisphere.

use std::f64::consts::PI;

const MAX_ITERATIONS: usize = 100;
const CONVERGENCE: f64 = 1.0e-15;

/// One Gaussian latitude with its quadrature weight.
///
/// Weights over all 2N latitudes of a grid sum to 2, the length of the
/// interval [-1, 1] in sin(latitude).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GaussianPoint {
    /// Latitude in degrees.
    pub latitude: f64,
    pub weight: f64,
}

/// Compute the 2N Gaussian latitudes and weights, ordered north to south.
pub fn gaussian_quadrature(number: usize) -> Vec<GaussianPoint> {
    let nlat = 2 * number;
    let mut points = Vec::with_capacity(nlat);

    for i in 0..number {
        let mut mu = (PI * (i as f64 + 0.75) / (nlat as f64 + 0.5)).cos();

        for _ in 0..MAX_ITERATIONS {
            let (p, dp) = legendre_and_derivative(nlat, mu);
            let delta = p / dp;
            mu -= delta;
            if delta.abs() < CONVERGENCE {
                break;
            }
        }

        let (_, dp) = legendre_and_derivative(nlat, mu);
        let weight = 2.0 / ((1.0 - mu * mu) * dp * dp);

        points.push(GaussianPoint {
            latitude: mu.asin().to_degrees(),
            weight,
        });
    }

    for i in (0..number).rev() {
        let north = points[i];
        points.push(GaussianPoint {
            latitude: -north.latitude,
            weight: north.weight,
        });
    }

    points
}

/// Compute the 2N Gaussian latitudes in degrees, ordered north to south.
pub fn gaussian_latitudes(number: usize) -> Vec<f64> {
    gaussian_quadrature(number)
        .into_iter()
        .map(|p| p.latitude)
        .collect()
}

/// Ordinary Legendre polynomial P_n(x) and its derivative, for n >= 1.
fn legendre_and_derivative(n: usize, x: f64) -> (f64, f64) {
    let mut p_prev = 1.0;
    let mut p = x;
    for k in 2..=n {
        let k = k as f64;
        let next = ((2.0 * k - 1.0) * x * p - (k - 1.0) * p_prev) / k;
        p_prev = p;
        p = next;
    }
    let dp = n as f64 * (x * p - p_prev) / (x * x - 1.0);
    (p, dp)
}
