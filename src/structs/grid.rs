use chrono::NaiveDateTime;
use ndarray::{Array1, Array2, Array3, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

use crate::error::OiError;
use crate::routines::time::{days_since, from_days, parse_datetime};

/// State of one output time step in the [Grid] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    /// The solver has not visited the step (not run yet, or skipped at the deadline).
    Pending,
    /// Field estimated from `nobs` observations.
    Solved,
    /// No observation inside the time window; the slice is all-NaN.
    NoObservations,
    /// The observation covariance was singular; the slice is all-NaN.
    Singular,
}

impl StepStatus {
    /// True when the slice carries no estimate.
    pub fn is_undefined(&self) -> bool {
        !matches!(self, StepStatus::Solved)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StepStatus::Pending => "pending",
            StepStatus::Solved => "solved",
            StepStatus::NoObservations => "no_observations",
            StepStatus::Singular => "singular",
        }
    }
}

/// Target space-time lattice of the interpolation, and the arena the solver writes into.
///
/// `ssh` has shape `(nt, ny, nx)`. Grid points are flattened row-major over
/// `(lat, lon)`, so point `g = j * nx + i` sits at `(lat[j], lon[i])`.
#[derive(Debug, Clone)]
pub struct Grid {
    lon: Array1<f64>,
    lat: Array1<f64>,
    vtime: Array1<f64>,
    epoch: NaiveDateTime,
    flat_lon: Array1<f64>,
    flat_lat: Array1<f64>,
    ssh: Array3<f64>,
    nobs: Array1<usize>,
    status: Vec<StepStatus>,
}

impl Grid {
    /// Build a grid from timestamps, expressed in days since `epoch`.
    pub fn new(
        lon: Vec<f64>,
        lat: Vec<f64>,
        time: &[NaiveDateTime],
        epoch: &str,
    ) -> Result<Self, OiError> {
        let epoch = parse_datetime(epoch)?;
        let vtime = time.iter().map(|&t| days_since(epoch, t)).collect();
        Self::from_days(lon, lat, vtime, epoch)
    }

    /// Build a grid whose time axis is already numeric (days since `epoch`).
    pub fn from_days(
        lon: Vec<f64>,
        lat: Vec<f64>,
        vtime: Vec<f64>,
        epoch: NaiveDateTime,
    ) -> Result<Self, OiError> {
        if lon.is_empty() {
            return Err(OiError::EmptyAxis { axis: "lon" });
        }
        if lat.is_empty() {
            return Err(OiError::EmptyAxis { axis: "lat" });
        }
        if vtime.is_empty() {
            return Err(OiError::EmptyAxis { axis: "time" });
        }
        if let Some(bad) = vtime.iter().find(|t| !t.is_finite()) {
            return Err(OiError::InvalidEpoch {
                value: bad.to_string(),
            });
        }

        let (nx, ny, nt) = (lon.len(), lat.len(), vtime.len());
        let flat_lon = Array1::from_shape_fn(nx * ny, |g| lon[g % nx]);
        let flat_lat = Array1::from_shape_fn(nx * ny, |g| lat[g / nx]);

        tracing::debug!("OI grid: nt = {}, ny = {}, nx = {}", nt, ny, nx);

        Ok(Grid {
            lon: Array1::from(lon),
            lat: Array1::from(lat),
            vtime: Array1::from(vtime),
            epoch,
            flat_lon,
            flat_lat,
            ssh: Array3::from_elem((nt, ny, nx), f64::NAN),
            nobs: Array1::zeros(nt),
            status: vec![StepStatus::Pending; nt],
        })
    }

    pub fn lon(&self) -> &Array1<f64> {
        &self.lon
    }

    pub fn lat(&self) -> &Array1<f64> {
        &self.lat
    }

    /// Numeric time axis, in days since [Grid::epoch].
    pub fn vtime(&self) -> &Array1<f64> {
        &self.vtime
    }

    pub fn epoch(&self) -> NaiveDateTime {
        self.epoch
    }

    pub fn flat_lon(&self) -> &Array1<f64> {
        &self.flat_lon
    }

    pub fn flat_lat(&self) -> &Array1<f64> {
        &self.flat_lat
    }

    pub fn nx(&self) -> usize {
        self.lon.len()
    }

    pub fn ny(&self) -> usize {
        self.lat.len()
    }

    pub fn nt(&self) -> usize {
        self.vtime.len()
    }

    /// Number of spatial grid points.
    pub fn ng(&self) -> usize {
        self.flat_lon.len()
    }

    pub fn ssh(&self) -> &Array3<f64> {
        &self.ssh
    }

    pub fn ssh_at(&self, step: usize) -> ArrayView2<'_, f64> {
        self.ssh.index_axis(Axis(0), step)
    }

    pub fn nobs(&self) -> &Array1<usize> {
        &self.nobs
    }

    pub fn status(&self) -> &[StepStatus] {
        &self.status
    }

    /// Timestamp of a step.
    pub fn time_at(&self, step: usize) -> Result<NaiveDateTime, OiError> {
        from_days(self.epoch, self.vtime[step])
    }

    /// Coordinate views and the three output slots, borrowed disjointly for the solver.
    pub(crate) fn split_mut(
        &mut self,
    ) -> (
        GridCoordinates<'_>,
        &mut Array3<f64>,
        &mut Array1<usize>,
        &mut [StepStatus],
    ) {
        let Grid {
            lon,
            lat,
            vtime,
            flat_lon,
            flat_lat,
            ssh,
            nobs,
            status,
            ..
        } = self;
        (
            GridCoordinates::borrow(vtime, flat_lon, flat_lat, lat.len(), lon.len()),
            ssh,
            nobs,
            status,
        )
    }

    /// Read-only coordinate view used by the per-step computation.
    pub fn coordinates(&self) -> GridCoordinates<'_> {
        GridCoordinates::borrow(
            &self.vtime,
            &self.flat_lon,
            &self.flat_lat,
            self.ny(),
            self.nx(),
        )
    }

    /// 2D longitude and latitude of every grid point, each of shape `(ny, nx)`.
    pub fn meshgrid(&self) -> (Array2<f64>, Array2<f64>) {
        let shape = (self.ny(), self.nx());
        let lon2 = Array2::from_shape_fn(shape, |(_, i)| self.lon[i]);
        let lat2 = Array2::from_shape_fn(shape, |(j, _)| self.lat[j]);
        (lon2, lat2)
    }
}

/// Borrowed coordinates of a [Grid].
#[derive(Debug, Clone, Copy)]
pub struct GridCoordinates<'a> {
    pub vtime: &'a Array1<f64>,
    pub flat_lon: &'a Array1<f64>,
    pub flat_lat: &'a Array1<f64>,
    pub ny: usize,
    pub nx: usize,
}

impl<'a> GridCoordinates<'a> {
    fn borrow(
        vtime: &'a Array1<f64>,
        flat_lon: &'a Array1<f64>,
        flat_lat: &'a Array1<f64>,
        ny: usize,
        nx: usize,
    ) -> Self {
        GridCoordinates {
            vtime,
            flat_lon,
            flat_lat,
            ny,
            nx,
        }
    }
}

/// Upper bound on the length of an axis built by [axis_range].
pub const MAX_AXIS_LEN: usize = 10_000_000;

/// Regularly spaced axis `min, min + step, ...` up to and including `max`.
///
/// A relative tolerance absorbs floating point drift at the upper bound.
pub fn axis_range(min: f64, max: f64, step: f64) -> Result<Vec<f64>, OiError> {
    if !(step > 0.0) || !step.is_finite() {
        return Err(OiError::InvalidParameter {
            name: "step",
            value: step,
            reason: "must be finite and > 0",
        });
    }
    if !(max >= min) {
        return Err(OiError::InvalidParameter {
            name: "max",
            value: max,
            reason: "must be >= min",
        });
    }
    let n = ((max - min) / step * (1.0 + 1e-9)).floor() + 1.0;
    if !n.is_finite() || n > MAX_AXIS_LEN as f64 {
        return Err(OiError::InvalidParameter {
            name: "step",
            value: step,
            reason: "yields too many points between min and max",
        });
    }
    Ok((0..n as usize).map(|i| min + i as f64 * step).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn epoch() -> NaiveDateTime {
        parse_datetime("2012-10-01").unwrap()
    }

    #[test]
    fn flattening_is_row_major_over_lat_lon() {
        let grid = Grid::from_days(vec![0.0, 1.0, 2.0], vec![10.0, 11.0], vec![0.0], epoch())
            .unwrap();
        assert_eq!(grid.ng(), 6);
        assert_eq!(grid.flat_lon().to_vec(), vec![0.0, 1.0, 2.0, 0.0, 1.0, 2.0]);
        assert_eq!(grid.flat_lat().to_vec(), vec![10.0, 10.0, 10.0, 11.0, 11.0, 11.0]);
        let (lon2, lat2) = grid.meshgrid();
        assert_eq!(lon2[[1, 2]], 2.0);
        assert_eq!(lat2[[1, 2]], 11.0);
    }

    #[test]
    fn arena_starts_pending() {
        let grid = Grid::from_days(vec![0.0], vec![0.0], vec![0.0, 1.0], epoch()).unwrap();
        assert!(grid.ssh().iter().all(|v| v.is_nan()));
        assert_eq!(grid.nobs().to_vec(), vec![0, 0]);
        assert!(grid.status().iter().all(|s| *s == StepStatus::Pending));
    }

    #[test]
    fn timestamps_become_days() {
        let times = vec![
            parse_datetime("2012-10-01").unwrap(),
            parse_datetime("2012-10-03T12:00:00").unwrap(),
        ];
        let grid = Grid::new(vec![0.0], vec![0.0], &times, "2012-10-01").unwrap();
        assert_eq!(grid.vtime().to_vec(), vec![0.0, 2.5]);
        assert_eq!(grid.time_at(1).unwrap(), times[1]);
    }

    #[test]
    fn bad_epoch_is_rejected() {
        let times = vec![epoch()];
        let err = Grid::new(vec![0.0], vec![0.0], &times, "not-a-date").unwrap_err();
        assert!(matches!(err, OiError::InvalidEpoch { .. }));
    }

    #[test]
    fn empty_axis_is_rejected() {
        let err = Grid::from_days(vec![], vec![0.0], vec![0.0], epoch()).unwrap_err();
        assert!(matches!(err, OiError::EmptyAxis { axis: "lon" }));
    }

    #[test]
    fn axis_range_includes_upper_bound() {
        let axis = axis_range(295.0, 296.0, 0.2).unwrap();
        assert_eq!(axis.len(), 6);
        assert!((axis[5] - 296.0).abs() < 1e-9);
        assert!(axis_range(0.0, 1.0, 0.0).is_err());
        assert_eq!(axis_range(0.0, 1.0, 0.6).unwrap(), vec![0.0, 0.6]);
    }

    #[test]
    fn oversized_axis_range_is_rejected() {
        let err = axis_range(0.0, 1e300, 1e-300).unwrap_err();
        assert!(matches!(err, OiError::InvalidParameter { name: "step", .. }));
        assert!(axis_range(0.0, f64::INFINITY, 1.0).is_err());
        assert!(axis_range(0.0, 1e9, 1.0).is_err());
    }
}
