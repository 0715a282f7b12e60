//! Separable Gaussian covariance used by the optimal interpolation.
//!
//! The kernel is `exp(-(dt/Lt)² - (dlon/Lx)² - (dlat/Ly)²)`. It is not
//! normalized and carries no factor 2 in the exponent; every estimate depends
//! on this exact form.

use ndarray::{Array1, Array2};

use crate::structs::parameters::OiParameters;

/// Covariance between two points separated by `(dt, dlon, dlat)`.
#[inline]
pub fn covariance(dt: f64, dlon: f64, dlat: f64, params: &OiParameters) -> f64 {
    (-(dt / params.lt()).powi(2) - (dlon / params.lx()).powi(2) - (dlat / params.ly()).powi(2))
        .exp()
}

/// Coordinates of the observations selected for one step.
#[derive(Debug, Clone)]
pub struct SelectedObservations {
    pub lon: Array1<f64>,
    pub lat: Array1<f64>,
    pub time: Array1<f64>,
    pub value: Array1<f64>,
}

impl SelectedObservations {
    pub fn len(&self) -> usize {
        self.value.len()
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }
}

/// Grid-to-observation covariance `BHᵗ`, shape `(ng, m)`, at time `t`.
pub fn grid_covariance(
    t: f64,
    flat_lon: &Array1<f64>,
    flat_lat: &Array1<f64>,
    obs: &SelectedObservations,
    params: &OiParameters,
) -> Array2<f64> {
    Array2::from_shape_fn((flat_lon.len(), obs.len()), |(g, i)| {
        covariance(
            t - obs.time[i],
            flat_lon[g] - obs.lon[i],
            flat_lat[g] - obs.lat[i],
            params,
        )
    })
}

/// Observation-to-observation covariance `HBHᵗ`, shape `(m, m)`.
///
/// Only the upper triangle is evaluated and mirrored, so the result is
/// symmetric bit for bit, with a unit diagonal.
pub fn observation_covariance(obs: &SelectedObservations, params: &OiParameters) -> Array2<f64> {
    let m = obs.len();
    let mut hbht = Array2::<f64>::eye(m);
    for i in 0..m {
        for j in (i + 1)..m {
            let c = covariance(
                obs.time[i] - obs.time[j],
                obs.lon[i] - obs.lon[j],
                obs.lat[i] - obs.lat[j],
                params,
            );
            hbht[[i, j]] = c;
            hbht[[j, i]] = c;
        }
    }
    hbht
}
