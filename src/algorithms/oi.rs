use std::time::{Duration, Instant};

use eyre::{Result, WrapErr};
use ndarray::parallel::prelude::*;
use ndarray::Axis;
use serde::Serialize;

use crate::algorithms::observer::{StepObserver, StepReport};
use crate::routines::estimation::linalg::{CovarianceSolver, SolverKind};
use crate::routines::estimation::step::solve_step;
use crate::structs::grid::{Grid, StepStatus};
use crate::structs::observations::ObservationSet;
use crate::structs::parameters::OiParameters;

/// Per-status tally of an interpolation run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunSummary {
    pub steps: usize,
    pub solved: usize,
    pub no_observations: usize,
    pub singular: usize,
    pub pending: usize,
    pub max_nobs: usize,
    pub mean_nobs: f64,
    #[serde(skip)]
    pub elapsed: Duration,
}

impl RunSummary {
    pub fn from_grid(grid: &Grid, elapsed: Duration) -> Self {
        let mut summary = RunSummary {
            steps: grid.nt(),
            elapsed,
            ..Default::default()
        };
        for status in grid.status() {
            match status {
                StepStatus::Solved => summary.solved += 1,
                StepStatus::NoObservations => summary.no_observations += 1,
                StepStatus::Singular => summary.singular += 1,
                StepStatus::Pending => summary.pending += 1,
            }
        }
        summary.max_nobs = grid.nobs().iter().cloned().max().unwrap_or(0);
        summary.mean_nobs = grid.nobs().iter().sum::<usize>() as f64 / grid.nt().max(1) as f64;
        summary
    }
}

/// Optimal interpolation of an observation set onto every step of a [Grid].
///
/// Steps are independent: they run in parallel on a dedicated rayon pool and
/// each writes only its own `ssh` slice, `nobs` entry and status.
pub struct OptimalInterpolation {
    params: OiParameters,
    solver: Box<dyn CovarianceSolver>,
    threads: usize,
    deadline: Option<Duration>,
}

impl OptimalInterpolation {
    pub fn new(params: OiParameters) -> Self {
        OptimalInterpolation {
            params,
            solver: SolverKind::default().build(),
            threads: 0,
            deadline: None,
        }
    }

    pub fn with_solver(mut self, solver: Box<dyn CovarianceSolver>) -> Self {
        self.solver = solver;
        self
    }

    /// Number of worker threads; 0 lets rayon use every core.
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    /// Steps that have not started once `deadline` has elapsed are left `Pending`.
    pub fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn params(&self) -> &OiParameters {
        &self.params
    }

    /// Fill `grid` with the interpolated field and per-step observation counts.
    pub fn run(
        &self,
        grid: &mut Grid,
        obs: &ObservationSet,
        observer: &dyn StepObserver,
    ) -> Result<RunSummary> {
        let now = Instant::now();
        tracing::info!(
            "Optimal interpolation of {} observations on {} time-steps x {} grid points ({} solver)",
            obs.len(),
            grid.nt(),
            grid.ng(),
            self.solver.name()
        );

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.threads)
            .build()
            .wrap_err("Failed to build the worker pool")?;

        let (coords, ssh, nobs, status) = grid.split_mut();
        let params = &self.params;
        let solver = self.solver.as_ref();
        let deadline = self.deadline;

        let outcomes: Vec<(usize, StepStatus)> = pool.install(|| {
            ssh.axis_iter_mut(Axis(0))
                .into_par_iter()
                .enumerate()
                .map(|(index, mut slice)| {
                    if deadline.map_or(false, |d| now.elapsed() >= d) {
                        slice.fill(f64::NAN);
                        observer.step_completed(&StepReport {
                            index,
                            nobs: 0,
                            status: StepStatus::Pending,
                            elapsed: Duration::ZERO,
                        });
                        return (0, StepStatus::Pending);
                    }
                    let result = solve_step(index, &coords, obs, params, solver);
                    slice.assign(&result.field);
                    observer.step_completed(&StepReport::from(&result));
                    (result.nobs, result.status)
                })
                .collect()
        });

        for (index, (count, state)) in outcomes.into_iter().enumerate() {
            nobs[index] = count;
            status[index] = state;
        }

        let summary = RunSummary::from_grid(grid, now.elapsed());
        tracing::info!(
            "Interpolation done in {:.2?}: {} solved, {} without observations, {} singular, {} pending",
            summary.elapsed,
            summary.solved,
            summary.no_observations,
            summary.singular,
            summary.pending
        );
        Ok(summary)
    }
}
