//! Wavenumber-frequency spectral score.
//!
//! For every latitude the `(time, lon)` error and reference slices are
//! linearly detrended, tapered with a Hann window on both axes and
//! transformed with a 2D FFT. Spectra are averaged over latitude, restricted
//! to strictly positive frequencies, and compared as `1 - psd_err / psd_signal`.

use std::f64::consts::PI;

use ndarray::{Array1, Array2, ArrayView2, Axis};
use rustfft::num_complex::Complex;
use rustfft::FftPlanner;

use crate::error::OiError;
use crate::structs::field::GriddedField;

/// Score level separating resolved from unresolved scales.
pub const RESOLVED_LEVEL: f64 = 0.5;

/// PSD-based scores; matrices are indexed `(freq_time, freq_lon)`.
#[derive(Debug, Clone)]
pub struct PsdScores {
    /// Positive temporal frequencies, cycles per day
    pub freq_time: Array1<f64>,
    /// Positive zonal frequencies, cycles per degree
    pub freq_lon: Array1<f64>,
    pub psd_err: Array2<f64>,
    pub psd_signal: Array2<f64>,
    pub score: Array2<f64>,
    /// Shortest zonal wavelength with a score of at least [RESOLVED_LEVEL], degrees
    pub shortest_spatial_wavelength: Option<f64>,
    /// Shortest period with a score of at least [RESOLVED_LEVEL], days
    pub shortest_temporal_wavelength: Option<f64>,
}

pub fn psd_based_scores(
    reconstruction: &GriddedField,
    reference: &GriddedField,
) -> Result<PsdScores, OiError> {
    tracing::info!("Compute PSD-based scores...");
    reconstruction.ensure_same_grid(reference)?;

    let dt = uniform_step(reference.time(), "time")?;
    let dx = uniform_step(reference.lon(), "lon")?;

    let err = reconstruction.values() - reference.values();
    if err.iter().any(|v| !v.is_finite()) {
        return Err(OiError::NonFiniteField {
            field: "reconstruction error",
        });
    }
    if reference.values().iter().any(|v| !v.is_finite()) {
        return Err(OiError::NonFiniteField { field: "reference" });
    }

    let (nt, ny, nx) = err.dim();
    let spectrum = Spectrum2d::new(nt, nx, dt, dx);
    let mut sum_err = Array2::<f64>::zeros((nt, nx));
    let mut sum_signal = Array2::<f64>::zeros((nt, nx));
    for j in 0..ny {
        sum_err += &spectrum.power(err.index_axis(Axis(1), j));
        sum_signal += &spectrum.power(reference.values().index_axis(Axis(1), j));
    }

    let kt = (nt - 1) / 2;
    let kx = (nx - 1) / 2;
    if kt == 0 || kx == 0 {
        return Err(OiError::incompatible(format!(
            "{} time steps x {} longitudes leave no positive frequency",
            nt, nx
        )));
    }
    let freq_time = Array1::from_shape_fn(kt, |k| (k + 1) as f64 / (nt as f64 * dt));
    let freq_lon = Array1::from_shape_fn(kx, |k| (k + 1) as f64 / (nx as f64 * dx));
    let psd_err = Array2::from_shape_fn((kt, kx), |(a, b)| sum_err[[a + 1, b + 1]] / ny as f64);
    let psd_signal =
        Array2::from_shape_fn((kt, kx), |(a, b)| sum_signal[[a + 1, b + 1]] / ny as f64);
    let score = Array2::from_shape_fn((kt, kx), |ij| 1.0 - psd_err[ij] / psd_signal[ij]);

    let (spatial, temporal) = shortest_resolved_wavelengths(&score, &freq_time, &freq_lon);
    match spatial {
        Some(l) => tracing::info!("=> Leaderboard Spectral score = {:.2} (degree lon)", l),
        None => tracing::warn!("No spatial scale is resolved"),
    }
    match temporal {
        Some(l) => tracing::info!("=> shortest temporal wavelength resolved = {:.2} (days)", l),
        None => tracing::warn!("No temporal scale is resolved"),
    }

    Ok(PsdScores {
        freq_time,
        freq_lon,
        psd_err,
        psd_signal,
        score,
        shortest_spatial_wavelength: spatial,
        shortest_temporal_wavelength: temporal,
    })
}

/// Shortest wavelengths, along lon then time, among cells scoring at least [RESOLVED_LEVEL].
///
/// Along each axis, the highest frequency with at least one resolved cell wins.
pub fn shortest_resolved_wavelengths(
    score: &Array2<f64>,
    freq_time: &Array1<f64>,
    freq_lon: &Array1<f64>,
) -> (Option<f64>, Option<f64>) {
    let resolved = score.mapv(|s| s >= RESOLVED_LEVEL);
    let lon_index = resolved
        .axis_iter(Axis(1))
        .enumerate()
        .filter(|(_, column)| column.iter().any(|&r| r))
        .map(|(i, _)| i)
        .last();
    let time_index = resolved
        .axis_iter(Axis(0))
        .enumerate()
        .filter(|(_, row)| row.iter().any(|&r| r))
        .map(|(i, _)| i)
        .last();
    (
        lon_index.map(|i| 1.0 / freq_lon[i]),
        time_index.map(|i| 1.0 / freq_time[i]),
    )
}

/// Spacing of a regularly spaced, increasing axis.
pub fn uniform_step(axis: &Array1<f64>, name: &str) -> Result<f64, OiError> {
    if axis.len() < 2 {
        return Err(OiError::incompatible(format!(
            "{name} axis needs at least 2 points for a spectrum"
        )));
    }
    let step = axis[1] - axis[0];
    let regular = step > 0.0
        && axis
            .windows(2)
            .into_iter()
            .all(|w| ((w[1] - w[0]) - step).abs() <= 1e-6 * step);
    if !regular {
        return Err(OiError::incompatible(format!(
            "{name} axis is not regularly spaced"
        )));
    }
    Ok(step)
}

/// Reusable FFT plans and window for `(nt, nx)` slices.
struct Spectrum2d {
    nt: usize,
    nx: usize,
    dt: f64,
    dx: f64,
    fft_time: std::sync::Arc<dyn rustfft::Fft<f64>>,
    fft_lon: std::sync::Arc<dyn rustfft::Fft<f64>>,
    window: Array2<f64>,
}

impl Spectrum2d {
    fn new(nt: usize, nx: usize, dt: f64, dx: f64) -> Self {
        let mut planner = FftPlanner::<f64>::new();
        let wt = hann(nt);
        let wx = hann(nx);
        Spectrum2d {
            nt,
            nx,
            dt,
            dx,
            fft_time: planner.plan_fft_forward(nt),
            fft_lon: planner.plan_fft_forward(nx),
            window: Array2::from_shape_fn((nt, nx), |(a, b)| wt[a] * wx[b]),
        }
    }

    /// Density-scaled power spectrum, unshifted FFT ordering.
    fn power(&self, slice: ArrayView2<'_, f64>) -> Array2<f64> {
        let (nt, nx) = (self.nt, self.nx);
        let detrended = detrend_plane(slice);

        let mut rows: Vec<Complex<f64>> = detrended
            .iter()
            .zip(self.window.iter())
            .map(|(v, w)| Complex::new(v * w, 0.0))
            .collect();
        // along lon: rows are contiguous
        self.fft_lon.process(&mut rows);

        let mut columns: Vec<Complex<f64>> = (0..nx)
            .flat_map(|b| (0..nt).map(move |a| (a, b)))
            .map(|(a, b)| rows[a * nx + b])
            .collect();
        self.fft_time.process(&mut columns);

        let window_power = self.window.iter().map(|w| w * w).sum::<f64>() / (nt * nx) as f64;
        let scale = self.dt * self.dx / ((nt * nx) as f64 * window_power);
        Array2::from_shape_fn((nt, nx), |(a, b)| columns[b * nt + a].norm_sqr() * scale)
    }
}

/// Periodic Hann window.
fn hann(n: usize) -> Array1<f64> {
    Array1::from_shape_fn(n, |k| 0.5 - 0.5 * (2.0 * PI * k as f64 / n as f64).cos())
}

/// Remove the least-squares plane `a + b·t + c·x` from a `(nt, nx)` slice.
///
/// On a full rectangular lattice the centred index coordinates are
/// orthogonal, so the three coefficients decouple.
fn detrend_plane(slice: ArrayView2<'_, f64>) -> Array2<f64> {
    let (nt, nx) = slice.dim();
    let tc = |a: usize| a as f64 - (nt as f64 - 1.0) / 2.0;
    let xc = |b: usize| b as f64 - (nx as f64 - 1.0) / 2.0;

    let mean = slice.sum() / (nt * nx) as f64;
    let (mut st, mut stt, mut sx, mut sxx) = (0.0, 0.0, 0.0, 0.0);
    for ((a, b), v) in slice.indexed_iter() {
        st += v * tc(a);
        stt += tc(a) * tc(a);
        sx += v * xc(b);
        sxx += xc(b) * xc(b);
    }
    let slope_t = if stt > 0.0 { st / stt } else { 0.0 };
    let slope_x = if sxx > 0.0 { sx / sxx } else { 0.0 };

    Array2::from_shape_fn((nt, nx), |(a, b)| {
        slice[[a, b]] - mean - slope_t * tc(a) - slope_x * xc(b)
    })
}
