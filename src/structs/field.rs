use ndarray::{s, Array1, Array3};

use crate::error::OiError;
use crate::structs::grid::Grid;

/// A labelled `(time, lat, lon)` SSH field; time in days since a shared epoch.
#[derive(Debug, Clone, PartialEq)]
pub struct GriddedField {
    time: Array1<f64>,
    lat: Array1<f64>,
    lon: Array1<f64>,
    values: Array3<f64>,
}

impl GriddedField {
    pub fn new(
        time: Array1<f64>,
        lat: Array1<f64>,
        lon: Array1<f64>,
        values: Array3<f64>,
    ) -> Result<Self, OiError> {
        let expected = (time.len(), lat.len(), lon.len());
        if values.dim() != expected {
            return Err(OiError::incompatible(format!(
                "values have shape {:?}, axes describe {:?}",
                values.dim(),
                expected
            )));
        }
        Ok(GriddedField {
            time,
            lat,
            lon,
            values,
        })
    }

    /// The field estimated on an OI grid.
    pub fn from_grid(grid: &Grid) -> Self {
        GriddedField {
            time: grid.vtime().clone(),
            lat: grid.lat().clone(),
            lon: grid.lon().clone(),
            values: grid.ssh().clone(),
        }
    }

    pub fn time(&self) -> &Array1<f64> {
        &self.time
    }

    pub fn lat(&self) -> &Array1<f64> {
        &self.lat
    }

    pub fn lon(&self) -> &Array1<f64> {
        &self.lon
    }

    pub fn values(&self) -> &Array3<f64> {
        &self.values
    }

    pub fn dim(&self) -> (usize, usize, usize) {
        self.values.dim()
    }

    /// Keep the steps with `min <= time <= max`.
    pub fn select_time(&self, min: Option<f64>, max: Option<f64>) -> Result<Self, OiError> {
        let min = min.unwrap_or(f64::NEG_INFINITY);
        let max = max.unwrap_or(f64::INFINITY);
        let keep: Vec<usize> = self
            .time
            .iter()
            .enumerate()
            .filter(|(_, t)| **t >= min && **t <= max)
            .map(|(i, _)| i)
            .collect();
        let (first, last) = match (keep.first(), keep.last()) {
            (Some(&first), Some(&last)) => (first, last),
            _ => {
                return Err(OiError::incompatible(format!(
                    "no time step within [{min}, {max}]"
                )))
            }
        };
        if last - first + 1 != keep.len() {
            return Err(OiError::incompatible("time axis is not sorted"));
        }
        Ok(GriddedField {
            time: self.time.slice(s![first..=last]).to_owned(),
            lat: self.lat.clone(),
            lon: self.lon.clone(),
            values: self.values.slice(s![first..=last, .., ..]).to_owned(),
        })
    }

    /// Fails unless `other` lives on exactly the same axes.
    pub fn ensure_same_grid(&self, other: &GriddedField) -> Result<(), OiError> {
        if self.dim() != other.dim() {
            return Err(OiError::incompatible(format!(
                "shape {:?} differs from {:?}",
                self.dim(),
                other.dim()
            )));
        }
        for (name, a, b) in [
            ("time", &self.time, &other.time),
            ("lat", &self.lat, &other.lat),
            ("lon", &self.lon, &other.lon),
        ] {
            let scale = a.iter().fold(1.0_f64, |acc, v| acc.max(v.abs()));
            if a.iter().zip(b.iter()).any(|(x, y)| (x - y).abs() > 1e-9 * scale) {
                return Err(OiError::incompatible(format!("{name} coordinates differ")));
            }
        }
        Ok(())
    }
}
