use std::time::{Duration, Instant};

use ndarray::{Array1, Array2};

use crate::error::OiError;
use crate::routines::estimation::kernel::{
    grid_covariance, observation_covariance, SelectedObservations,
};
use crate::routines::estimation::linalg::CovarianceSolver;
use crate::structs::grid::{GridCoordinates, StepStatus};
use crate::structs::observations::ObservationSet;
use crate::structs::parameters::OiParameters;

/// Outcome of the interpolation of one output time step.
#[derive(Debug, Clone)]
pub struct StepResult {
    pub index: usize,
    pub nobs: usize,
    pub status: StepStatus,
    /// Estimated field, shape `(ny, nx)`; all-NaN unless `status` is `Solved`.
    pub field: Array2<f64>,
    pub elapsed: Duration,
}

/// Gather the observations used for the step centered on `t`.
pub fn select_observations(
    obs: &ObservationSet,
    t: f64,
    params: &OiParameters,
) -> SelectedObservations {
    let indices = obs.select_window(t, params.time_window());
    SelectedObservations {
        lon: indices.iter().map(|&i| obs.lon()[i]).collect(),
        lat: indices.iter().map(|&i| obs.lat()[i]).collect(),
        time: indices.iter().map(|&i| obs.time()[i]).collect(),
        value: indices.iter().map(|&i| obs.value()[i]).collect(),
    }
}

/// Estimate the flattened field (length `ng`) at step `index`.
///
/// Returns `EmptyObservationWindow` when no observation is selected and
/// `SingularMatrix` when `HBHᵗ + R` cannot be solved. The count of selected
/// observations is returned alongside so that a failed solve still reports it.
pub fn estimate(
    index: usize,
    coords: &GridCoordinates<'_>,
    obs: &ObservationSet,
    params: &OiParameters,
    solver: &dyn CovarianceSolver,
) -> (usize, Result<Array1<f64>, OiError>) {
    let t = coords.vtime[index];
    let selected = select_observations(obs, t, params);
    let nobs = selected.len();
    if selected.is_empty() {
        return (nobs, Err(OiError::EmptyObservationWindow { step: index }));
    }

    let bht = grid_covariance(t, coords.flat_lon, coords.flat_lat, &selected, params);
    let mut coo = observation_covariance(&selected, params);
    let r = params.noise().powi(2);
    coo.diag_mut().mapv_inplace(|c| c + r);

    // B · Coo⁻¹ · y, evaluated as B · w with Coo · w = y
    let sol = solver
        .solve(&coo, &selected.value)
        .map(|w| bht.dot(&w))
        .map_err(|source| OiError::SingularMatrix {
            step: index,
            source,
        });
    (nobs, sol)
}

/// Run one step end to end. Never fails: degenerate steps come back all-NaN.
pub fn solve_step(
    index: usize,
    coords: &GridCoordinates<'_>,
    obs: &ObservationSet,
    params: &OiParameters,
    solver: &dyn CovarianceSolver,
) -> StepResult {
    let now = Instant::now();
    let shape = (coords.ny, coords.nx);
    let (nobs, estimate) = estimate(index, coords, obs, params, solver);

    let (status, field) = match estimate {
        Ok(sol) => match sol.into_shape(shape) {
            Ok(field) => (StepStatus::Solved, field),
            Err(e) => {
                tracing::warn!("Step {}: cannot reshape solution: {}", index, e);
                (StepStatus::Singular, Array2::from_elem(shape, f64::NAN))
            }
        },
        Err(OiError::EmptyObservationWindow { .. }) => {
            (StepStatus::NoObservations, Array2::from_elem(shape, f64::NAN))
        }
        Err(e) => {
            tracing::warn!("{}; step {} left undefined", e, index);
            (StepStatus::Singular, Array2::from_elem(shape, f64::NAN))
        }
    };

    StepResult {
        index,
        nobs,
        status,
        field,
        elapsed: now.elapsed(),
    }
}
