//! Optimal interpolation of sea-surface height from along-track altimetry.
//!
//! `oicore` estimates SSH on a regular `(time, lat, lon)` grid from sparse
//! observations, one independent linear solve per output time step, and
//! scores a reconstruction against a reference field (RMSE and spectral
//! scores, with regridding when the two grids differ).
//!
//! The usual entry point is [entrypoints::run], driven by a TOML settings
//! file; the building blocks are re-exported in [prelude].

/// Provides the interpolation driver and its progress observers
pub mod algorithms;

/// Entry points for running a reconstruction and its evaluation
pub mod entrypoints;

/// Error type shared by the numerical routines
pub mod error;

/// Routines for input, estimation, scoring, regridding and output
pub mod routines;

/// Grid, observation and field types
pub mod structs;

/// A collection of commonly used items to simplify imports.
pub mod prelude {
    pub use crate::algorithms;
    pub use crate::algorithms::observer::{
        ChannelObserver, Silent, StepObserver, StepReport, TracingObserver,
    };
    pub use crate::algorithms::oi::{OptimalInterpolation, RunSummary};
    pub use crate::entrypoints::{evaluate, interpolate, run};
    pub use crate::error::OiError;
    pub use crate::routines;
    pub use crate::routines::estimation::linalg::{
        CholeskySolver, CovarianceSolver, LuSolver, SolverKind,
    };
    pub use crate::routines::evaluation::psd::{psd_based_scores, PsdScores};
    pub use crate::routines::evaluation::rmse::{rmse_based_scores, RmseScores};
    pub use crate::routines::output::{OiResult, ScoreSummary};
    pub use crate::routines::regrid::fill::FillSettings;
    pub use crate::routines::regrid::regrid;
    pub use crate::routines::settings::{read_settings, Settings};
    pub use crate::structs::field::GriddedField;
    pub use crate::structs::grid::{Grid, StepStatus};
    pub use crate::structs::observations::{Observation, ObservationSet};
    pub use crate::structs::parameters::OiParameters;
}
