//! Resampling of a gridded field onto another rectilinear grid.

pub mod fill;

use ndarray::{Array1, Array3, Axis};
use rayon::prelude::*;

use crate::error::OiError;
use crate::structs::field::GriddedField;
use fill::{gauss_seidel, FillSettings};

/// Interpolate `source` linearly onto `(time, lat, lon)` and fill the gaps.
///
/// Points outside the source bounds, or next to a NaN source cell, start as
/// gaps; each time slice is then completed by [gauss_seidel].
pub fn regrid(
    source: &GriddedField,
    time: &Array1<f64>,
    lat: &Array1<f64>,
    lon: &Array1<f64>,
    fill: &FillSettings,
) -> Result<GriddedField, OiError> {
    let axes = [
        ("time", source.time()),
        ("lat", source.lat()),
        ("lon", source.lon()),
    ];
    for (name, axis) in axes {
        ensure_increasing(name, axis)?;
    }
    let (t0, t1) = (source.time()[0], source.time()[source.time().len() - 1]);
    if !time.iter().any(|t| *t >= t0 && *t <= t1) {
        return Err(OiError::incompatible(format!(
            "target time axis does not overlap the source range [{t0}, {t1}]"
        )));
    }

    let (nt, ny, nx) = (time.len(), lat.len(), lon.len());
    tracing::debug!(
        "Regridding {:?} onto {} x {} x {} points",
        source.dim(),
        nt,
        ny,
        nx
    );

    let mut obs_t = Vec::with_capacity(nt * ny * nx);
    let mut obs_lat = Vec::with_capacity(nt * ny * nx);
    let mut obs_lon = Vec::with_capacity(nt * ny * nx);
    for t in time.iter() {
        for y in lat.iter() {
            for x in lon.iter() {
                obs_t.push(*t);
                obs_lat.push(*y);
                obs_lon.push(*x);
            }
        }
    }

    let axes_owned: Vec<Vec<f64>> = axes.iter().map(|(_, a)| a.to_vec()).collect();
    let grids = [&axes_owned[0][..], &axes_owned[1][..], &axes_owned[2][..]];
    let values: Vec<f64> = source.values().iter().copied().collect();
    let mut out = vec![f64::NAN; nt * ny * nx];
    interpn::multilinear::rectilinear::interpn(
        &grids,
        &values,
        &[&obs_t[..], &obs_lat[..], &obs_lon[..]],
        &mut out,
    )
    .map_err(|e| OiError::incompatible(format!("interpolation failed: {e}")))?;

    // no extrapolation
    for (k, v) in out.iter_mut().enumerate() {
        let inside = within(grids[0], obs_t[k])
            && within(grids[1], obs_lat[k])
            && within(grids[2], obs_lon[k]);
        if !inside {
            *v = f64::NAN;
        }
    }

    let mut values = Array3::from_shape_vec((nt, ny, nx), out)
        .map_err(|e| OiError::incompatible(e.to_string()))?;

    let outcomes: Vec<_> = values
        .axis_iter_mut(Axis(0))
        .into_par_iter()
        .map(|slice| gauss_seidel(slice, fill))
        .collect();
    for (k, outcome) in outcomes.iter().enumerate() {
        if outcome.filled == 0 && !outcome.converged {
            tracing::warn!("Time slice {} has no valid value after interpolation", k);
        } else if !outcome.converged {
            tracing::warn!(
                "Gap filling of slice {} stopped after {} iterations without converging",
                k,
                outcome.iterations
            );
        }
    }

    GriddedField::new(time.clone(), lat.clone(), lon.clone(), values)
}

fn ensure_increasing(name: &str, axis: &Array1<f64>) -> Result<(), OiError> {
    if axis.len() < 2 {
        return Err(OiError::incompatible(format!(
            "source {name} axis needs at least 2 points"
        )));
    }
    if !axis.windows(2).into_iter().all(|w| w[1] > w[0]) {
        return Err(OiError::incompatible(format!(
            "source {name} axis is not strictly increasing"
        )));
    }
    Ok(())
}

fn within(axis: &[f64], value: f64) -> bool {
    value >= axis[0] && value <= axis[axis.len() - 1]
}
