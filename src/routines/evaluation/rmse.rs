use ndarray::{Array1, Array2, Array3, Axis};
use ndarray_stats::QuantileExt;

use crate::error::OiError;
use crate::routines::math::{nanmean, nanstd};
use crate::structs::field::GriddedField;

/// RMSE-based scores of a reconstruction against a reference.
#[derive(Debug, Clone)]
pub struct RmseScores {
    /// `1 - RMSE(t) / RMS(reference)(t)`, one value per time step
    pub rmse_t: Array1<f64>,
    /// Time-averaged RMSE at each `(lat, lon)`
    pub rmse_xy: Array2<f64>,
    /// Same normalized score averaged over every dimension
    pub leaderboard: f64,
    /// Standard deviation of `rmse_t`, the temporal stability of the error
    pub stability: f64,
}

/// Compare two fields on the same grid. NaN cells are skipped in every mean.
pub fn rmse_based_scores(
    reconstruction: &GriddedField,
    reference: &GriddedField,
) -> Result<RmseScores, OiError> {
    tracing::info!("Compute RMSE-based scores...");
    reconstruction.ensure_same_grid(reference)?;

    let err2: Array3<f64> = (reconstruction.values() - reference.values()).mapv(|e| e * e);
    let ref2: Array3<f64> = reference.values().mapv(|r| r * r);

    let rmse_t: Array1<f64> = err2
        .outer_iter()
        .zip(ref2.outer_iter())
        .map(|(e, r)| 1.0 - nanmean(e.iter()).sqrt() / nanmean(r.iter()).sqrt())
        .collect();

    let (_, ny, nx) = err2.dim();
    let rmse_xy = Array2::from_shape_fn((ny, nx), |(j, i)| {
        let lane = err2.index_axis(Axis(2), i);
        nanmean(lane.index_axis(Axis(1), j).iter()).sqrt()
    });

    let leaderboard = 1.0 - nanmean(err2.iter()).sqrt() / nanmean(ref2.iter()).sqrt();
    let stability = nanstd(rmse_t.iter());

    tracing::info!("=> Leaderboard SSH RMSE score = {:.2}", leaderboard);
    tracing::info!(
        "Error variability = {:.2} (temporal stability of the mapping error)",
        stability
    );
    let (min, max) = (*rmse_t.min_skipnan(), *rmse_t.max_skipnan());
    if !min.is_nan() {
        tracing::debug!("RMSE score over time ranges from {:.3} to {:.3}", min, max);
    }

    Ok(RmseScores {
        rmse_t,
        rmse_xy,
        leaderboard,
        stability,
    })
}
