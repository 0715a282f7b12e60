use std::time::Instant;

use eyre::{eyre, Result};

use crate::algorithms::observer::TracingObserver;
use crate::algorithms::oi::OptimalInterpolation;
use crate::routines::datafile::{read_field, read_observations};
use crate::routines::evaluation::psd::psd_based_scores;
use crate::routines::evaluation::rmse::rmse_based_scores;
use crate::routines::logger;
use crate::routines::output::{write_scores, OiResult, ScoreSummary};
use crate::routines::regrid::regrid;
use crate::routines::settings::{write_settings_to_file, Settings};

/// Reconstruct the SSH field described by `settings`
///
/// Reads the observations, runs the optimal interpolation on the configured
/// grid and writes `ssh.csv` and `nobs.csv` to the output folder.
pub fn interpolate(settings: &Settings) -> Result<OiResult> {
    let now = Instant::now();
    let params = settings.parameters()?;
    let epoch = settings.epoch()?;
    let mut grid = settings.build_grid()?;

    let observations = read_observations(&settings.paths.observations, epoch)?;
    if let Some((first, last)) = observations.time_range() {
        tracing::info!(
            "Observations span days {:.2} to {:.2} since {}",
            first,
            last,
            epoch
        );
    }

    let oi = OptimalInterpolation::new(params)
        .with_solver(settings.oi.solver.build())
        .with_threads(settings.oi.threads)
        .with_deadline(settings.deadline());
    let observer = TracingObserver::new(grid.nt());

    let summary = match oi.run(&mut grid, &observations, &observer) {
        Ok(summary) => summary,
        Err(err) => {
            tracing::error!("An error has occurred during the interpolation: {}", err);
            return Err(err);
        }
    };

    tracing::info!(
        "{} of {} steps solved, {} without observations, {} singular, {} pending",
        summary.solved,
        summary.steps,
        summary.no_observations,
        summary.singular,
        summary.pending
    );
    if summary.singular > 0 {
        tracing::warn!(
            "{} steps have a singular observation covariance; consider a larger noise",
            summary.singular
        );
    }
    if summary.pending > 0 {
        tracing::warn!(
            "The deadline stopped the run before {} steps could start",
            summary.pending
        );
    }

    let result = OiResult::new(grid, params, summary);
    result.write_outputs(&settings.paths.output)?;
    tracing::info!("Interpolation complete after {:.2?}", now.elapsed());
    Ok(result)
}

/// Score a reconstruction against the configured reference field
///
/// The reference is cropped to the evaluation window; the reconstruction is
/// regridded onto it unless `evaluation.regrid` is off, in which case both
/// grids must already match.
pub fn evaluate(settings: &Settings, result: &OiResult) -> Result<ScoreSummary> {
    let path = settings
        .paths
        .reference
        .as_ref()
        .ok_or_else(|| eyre!("No reference field configured in paths.reference"))?;
    let epoch = settings.epoch()?;
    let (time_min, time_max) = settings.evaluation_window()?;

    let reference = read_field(path, epoch)?.select_time(time_min, time_max)?;
    let reconstruction = if settings.evaluation.regrid {
        regrid(
            &result.field(),
            reference.time(),
            reference.lat(),
            reference.lon(),
            &settings.fill(),
        )?
    } else {
        result.field().select_time(time_min, time_max)?
    };

    let rmse = rmse_based_scores(&reconstruction, &reference)?;
    let psd = match psd_based_scores(&reconstruction, &reference) {
        Ok(psd) => Some(psd),
        Err(err) => {
            tracing::warn!("Spectral scores skipped: {}", err);
            None
        }
    };

    let summary = ScoreSummary {
        leaderboard_rmse: rmse.leaderboard,
        error_stability: rmse.stability,
        shortest_spatial_wavelength: psd.as_ref().and_then(|p| p.shortest_spatial_wavelength),
        shortest_temporal_wavelength: psd.as_ref().and_then(|p| p.shortest_temporal_wavelength),
        interpolation: result.summary.clone(),
    };
    write_scores(
        &settings.paths.output,
        &reference,
        epoch,
        &rmse,
        psd.as_ref(),
        &summary,
    )?;
    Ok(summary)
}

/// Primary entrypoint for oicore
///
/// Sets up logging, records the effective settings, reconstructs the field
/// and, when a reference is configured, evaluates it.
pub fn run(settings: Settings) -> Result<(OiResult, Option<ScoreSummary>)> {
    let now = Instant::now();
    logger::setup_log(&settings)?;
    tracing::info!("Starting oicore");
    tracing::info!("Output files will be written to {}", settings.paths.output);
    write_settings_to_file(&settings)?;

    let result = interpolate(&settings)?;
    let scores = match settings.paths.reference {
        Some(_) => Some(evaluate(&settings, &result)?),
        None => {
            tracing::info!("No reference field configured, skipping the evaluation");
            None
        }
    };

    tracing::info!("Program complete after {:.2?}", now.elapsed());
    Ok((result, scores))
}
