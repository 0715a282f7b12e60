//! Error types for the OI engine and its collaborators.

use crate::routines::estimation::linalg::LinalgError;

/// Error type for the fallible operations of the crate.
///
/// `EmptyObservationWindow` and `SingularMatrix` are raised per time step and
/// recovered by the solver as an all-NaN step; every other variant is fatal
/// to the run.
#[derive(Debug, Clone, thiserror::Error)]
pub enum OiError {
    /// A length scale is not strictly positive, or the noise is negative.
    #[error("invalid parameter {name}: {value} ({reason})")]
    InvalidParameter {
        name: &'static str,
        value: f64,
        reason: &'static str,
    },

    /// A time reference could not be parsed or converted to days.
    #[error("invalid epoch or timestamp {value:?}")]
    InvalidEpoch { value: String },

    /// A grid axis has no coordinates.
    #[error("grid axis {axis} is empty")]
    EmptyAxis { axis: &'static str },

    /// Observation columns do not have matching lengths.
    #[error("observation column {column} has length {len}, expected {expected}")]
    ObservationShape {
        column: &'static str,
        len: usize,
        expected: usize,
    },

    /// No observation falls inside the selection window of a step.
    #[error("no observation within the time window of step {step}")]
    EmptyObservationWindow { step: usize },

    /// The observation covariance of a step could not be solved.
    #[error("singular observation covariance at step {step}: {source}")]
    SingularMatrix {
        step: usize,
        #[source]
        source: LinalgError,
    },

    /// Two fields cannot be compared or resampled onto each other.
    #[error("incompatible grids: {reason}")]
    IncompatibleGrid { reason: String },

    /// A field that must be finite contains NaN or infinity.
    #[error("non-finite value in {field}")]
    NonFiniteField { field: &'static str },
}

impl OiError {
    pub(crate) fn incompatible(reason: impl Into<String>) -> Self {
        OiError::IncompatibleGrid {
            reason: reason.into(),
        }
    }

    /// True for the per-step errors the solver recovers from.
    pub fn is_step_local(&self) -> bool {
        matches!(
            self,
            OiError::EmptyObservationWindow { .. } | OiError::SingularMatrix { .. }
        )
    }
}
