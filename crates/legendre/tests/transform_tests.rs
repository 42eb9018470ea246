//! Integration tests for the spectral ⇄ grid transforms.

use legendre::transform::{
    band_indices, fourier_analysis, fourier_synthesis, keep_south_row, to_complex,
    to_interleaved, wave_parameter_south_bound, GridToSpectral, LatitudeRow, SpectralToGrid,
};
use legendre::{
    grid_to_spectral, open_loader, spectral_length, spectral_to_grid, LegendreConfig,
    LoaderHandle, LoaderKind, PersistentStore,
};
use nalgebra::Complex;
use regrid_common::{Area, Grid, RegularGaussian, RegularLatLon};
use test_utils::{
    assert_approx_eq, assert_slices_approx_eq, coarse_latlon, init_test_tracing, single_harmonic,
    small_gaussian, spectral_field, TempDataDir, ROUND_TRIP_TRUNCATIONS,
};

fn mapped_loader(dir: &TempDataDir, truncation: usize, grid: &dyn Grid) -> LoaderHandle {
    let store = PersistentStore::new(dir.path());
    let path = store.ensure_exists(truncation, grid).unwrap();
    let config = LegendreConfig::with_data_dir(dir.path());
    open_loader(LoaderKind::MemoryMap, truncation, grid.nshalf(), &path, &config).unwrap()
}

// =============================================================================
// Round trips
// =============================================================================

#[test]
fn test_gaussian_round_trip_reproduces_field() {
    init_test_tracing();
    let dir = TempDataDir::new();
    let grid = small_gaussian();

    for &truncation in &ROUND_TRIP_TRUNCATIONS {
        let loader = mapped_loader(&dir, truncation, &grid);
        let field = spectral_field(truncation, truncation as u64);

        let values = spectral_to_grid(loader.as_ref(), &grid, &field, false, None).unwrap();
        assert_eq!(
            values.len(),
            grid.north_south_number_of_points() * grid.west_east_number_of_points()
        );

        let back = grid_to_spectral(loader.as_ref(), &grid, &values).unwrap();
        for (a, b) in back.iter().zip(&field) {
            assert_approx_eq!(a.re, b.re, 1e-10);
            assert_approx_eq!(a.im, b.im, 1e-10);
        }
    }
}

#[test]
fn test_single_latitude_round_trip_t0() {
    let dir = TempDataDir::new();
    let grid = coarse_latlon();
    let loader = mapped_loader(&dir, 0, &grid);
    let latitudes = grid.global_latitudes();
    let x = vec![Complex::new(-3.25, 0.0)];

    let rows = SpectralToGrid::new(loader.as_ref(), &latitudes, false, 40.0, 40.0)
        .execute(&x)
        .unwrap();
    assert_eq!(rows.len(), 1);

    let mut out = vec![Complex::new(0.0, 0.0)];
    GridToSpectral::new(loader.as_ref(), &latitudes)
        .execute(&rows, &[1.0], &mut out)
        .unwrap();
    assert_approx_eq!(out[0].re, x[0].re, 1e-12);
}

#[test]
fn test_adjoint_identity_at_single_latitudes() {
    let dir = TempDataDir::new();
    let grid = coarse_latlon();
    let truncation = 4;
    let loader = mapped_loader(&dir, truncation, &grid);
    let latitudes = grid.global_latitudes();
    let x = spectral_field(truncation, 11);

    for latitude in [80.0, 30.0, -50.0] {
        let sx = SpectralToGrid::new(loader.as_ref(), &latitudes, false, latitude, latitude)
            .execute(&x)
            .unwrap();
        assert_eq!(sx.len(), 1);
        assert_eq!(sx[0].latitude, latitude);

        let y = LatitudeRow::new(
            latitude,
            (0..2 * (truncation + 1)).map(|i| (i as f64 * 0.9).cos()).collect(),
        );
        let mut ay = vec![Complex::new(0.0, 0.0); spectral_length(truncation)];
        GridToSpectral::new(loader.as_ref(), &latitudes)
            .execute(&[y.clone()], &[1.0], &mut ay)
            .unwrap();

        let lhs: Complex<f64> = (0..=truncation)
            .map(|m| sx[0].coefficient(m) * y.coefficient(m).conj())
            .sum();
        let rhs: Complex<f64> = x.iter().zip(&ay).map(|(a, b)| a * b.conj()).sum();
        assert_approx_eq!(lhs.re, rhs.re, 1e-10);
        assert_approx_eq!(lhs.im, rhs.im, 1e-10);
    }
}

// =============================================================================
// Wind at the poles
// =============================================================================

#[test]
fn test_wind_pole_row_has_only_first_harmonic() {
    let dir = TempDataDir::new();
    let grid = coarse_latlon();
    let truncation = 6;
    let loader = mapped_loader(&dir, truncation, &grid);
    let latitudes = grid.global_latitudes();
    let field = spectral_field(truncation, 5);

    let rows = SpectralToGrid::new(loader.as_ref(), &latitudes, true, 90.0, 0.0)
        .execute(&field)
        .unwrap();
    let pole = &rows[0];
    assert_eq!(pole.latitude, 90.0);
    assert_eq!(pole.values.len(), 2 * (truncation + 1));
    for (i, value) in pole.values.iter().enumerate() {
        if i == 2 || i == 3 {
            assert!(value.abs() > 1e-6, "first harmonic component {} is zero", i);
        } else {
            assert_eq!(*value, 0.0, "index {} should be zero", i);
        }
    }
    // No southern rows for a northern band
    assert!(rows.iter().all(|r| r.latitude >= 0.0));
}

#[test]
fn test_scalar_field_at_pole_uses_regular_synthesis() {
    let dir = TempDataDir::new();
    let grid = coarse_latlon();
    let loader = mapped_loader(&dir, 3, &grid);
    let latitudes = grid.global_latitudes();
    let field = single_harmonic(3, 1, 0, Complex::new(1.0, 0.0));

    let rows = SpectralToGrid::new(loader.as_ref(), &latitudes, false, 90.0, -90.0)
        .execute(&field)
        .unwrap();
    // P(1,0) = sqrt(3) sin(lat)
    assert_approx_eq!(rows[0].coefficient(0).re, 3f64.sqrt(), 1e-12);
    assert_approx_eq!(rows.last().unwrap().coefficient(0).re, -(3f64.sqrt()), 1e-12);
}

// =============================================================================
// Partial bands
// =============================================================================

#[test]
fn test_sub_area_grid_matches_global_rows() {
    let dir = TempDataDir::new();
    let truncation = 5;
    let global = RegularLatLon::new(10.0, 10.0).unwrap();
    let loader = mapped_loader(&dir, truncation, &global);
    let field = spectral_field(truncation, 2);

    let all = spectral_to_grid(loader.as_ref(), &global, &field, false, None).unwrap();
    let columns = global.west_east_number_of_points();

    for area in [
        Area::new(60.0, 0.0, 30.0, 350.0),
        Area::new(-20.0, 0.0, -70.0, 350.0),
        Area::new(30.0, 0.0, -60.0, 350.0),
    ] {
        let sub = RegularLatLon::with_area(10.0, 10.0, area).unwrap();
        let values = spectral_to_grid(loader.as_ref(), &sub, &field, false, None).unwrap();
        let first_row = global
            .latitudes()
            .iter()
            .position(|&lat| lat == sub.latitudes()[0])
            .unwrap();
        let expected = &all[first_row * columns..(first_row + sub.latitudes().len()) * columns];
        assert_slices_approx_eq!(&values[..], expected, 1e-12);
    }
}

#[test]
fn test_wave_parameter_extends_band_to_pole() {
    let dir = TempDataDir::new();
    let grid = small_gaussian();
    let truncation = 4;
    let loader = mapped_loader(&dir, truncation, &grid);
    let latitudes = grid.global_latitudes();
    let southernmost = latitudes[latitudes.len() - 1];
    let field = spectral_field(truncation, 9);

    let south = wave_parameter_south_bound("140229", -80.0);
    assert_eq!(south, -90.0);
    for (parameter, bound) in [
        ("130229", -80.0),
        ("14022", -80.0),
        ("1402290", -80.0),
        ("140229", -77.5),
    ] {
        assert_eq!(wave_parameter_south_bound(parameter, bound), bound, "{}", parameter);
    }

    // The first coefficient row, mirrored, is the southernmost latitude
    assert_eq!(band_indices(&latitudes, -60.0, south).unwrap(), (0, 1));
    assert_eq!(band_indices(&latitudes, -60.0, -80.0).unwrap(), (1, 1));
    assert!(keep_south_row(-60.0, south, latitudes[0]));
    assert!(!keep_south_row(-60.0, -80.0, latitudes[0]));

    let extended = SpectralToGrid::new(loader.as_ref(), &latitudes, false, -60.0, south)
        .execute(&field)
        .unwrap();
    let plain = SpectralToGrid::new(loader.as_ref(), &latitudes, false, -60.0, -80.0)
        .execute(&field)
        .unwrap();
    assert_eq!(extended.len(), plain.len() + 1);
    assert_eq!(extended[extended.len() - 1].latitude, southernmost);
    assert!(plain.iter().all(|row| row.latitude > southernmost));
    for (a, b) in extended.iter().zip(&plain) {
        assert_eq!(a.latitude, b.latitude);
        assert_slices_approx_eq!(&a.values, &b.values, 1e-12);
    }

    // Points inside the area are unchanged by the wider band
    let sub = RegularLatLon::with_area(10.0, 10.0, Area::new(-60.0, 0.0, -80.0, 350.0)).unwrap();
    let latlon = coarse_latlon();
    let loader = mapped_loader(&dir, truncation, &latlon);
    let plain = spectral_to_grid(loader.as_ref(), &sub, &field, false, Some("130")).unwrap();
    let wave = spectral_to_grid(loader.as_ref(), &sub, &field, false, Some("140229")).unwrap();
    assert_slices_approx_eq!(&wave, &plain, 1e-12);
}

#[test]
fn test_analysis_requires_quadrature() {
    let dir = TempDataDir::new();
    let grid = coarse_latlon();
    let loader = mapped_loader(&dir, 2, &grid);
    let values = vec![0.0; grid.north_south_number_of_points() * grid.west_east_number_of_points()];
    assert!(grid_to_spectral(loader.as_ref(), &grid, &values).is_err());

    let gaussian = RegularGaussian::new(2).unwrap();
    let loader = mapped_loader(&dir, 4, &gaussian);
    let values = vec![0.0; 4 * 8];
    // 8 longitudes cannot resolve wavenumber 4
    assert!(grid_to_spectral(loader.as_ref(), &gaussian, &values).is_err());
}

// =============================================================================
// Fourier helpers
// =============================================================================

#[test]
fn test_fourier_round_trip_from_interleaved() {
    let coefficients = vec![Complex::new(0.5, 0.0), Complex::new(0.25, -0.5), Complex::new(-1.0, 0.1)];
    let interleaved = to_interleaved(&coefficients);
    let longitudes: Vec<f64> = (0..7).map(|i| -180.0 + i as f64 * 360.0 / 7.0).collect();

    let mut values = vec![0.0; longitudes.len()];
    fourier_synthesis(&interleaved, &longitudes, &mut values);
    let back = to_complex(&fourier_analysis(&values, &longitudes, 2));
    for (a, b) in back.iter().zip(&coefficients) {
        assert_approx_eq!((a - b).norm(), 0.0, 1e-12);
    }
}
