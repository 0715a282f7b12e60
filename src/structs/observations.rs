use ndarray::Array1;

use crate::error::OiError;

/// A single along-track measurement. `time` is in days since the grid epoch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation {
    pub lon: f64,
    pub lat: f64,
    pub time: f64,
    pub value: f64,
}

/// Column-oriented, read-only set of observations.
///
/// Order carries no meaning and duplicates are allowed.
#[derive(Debug, Clone, Default)]
pub struct ObservationSet {
    lon: Array1<f64>,
    lat: Array1<f64>,
    time: Array1<f64>,
    value: Array1<f64>,
}

impl ObservationSet {
    pub fn new(
        lon: Vec<f64>,
        lat: Vec<f64>,
        time: Vec<f64>,
        value: Vec<f64>,
    ) -> Result<Self, OiError> {
        let expected = value.len();
        for (column, len) in [("lon", lon.len()), ("lat", lat.len()), ("time", time.len())] {
            if len != expected {
                return Err(OiError::ObservationShape {
                    column,
                    len,
                    expected,
                });
            }
        }
        Ok(ObservationSet {
            lon: Array1::from(lon),
            lat: Array1::from(lat),
            time: Array1::from(time),
            value: Array1::from(value),
        })
    }

    pub fn from_records(records: &[Observation]) -> Self {
        ObservationSet {
            lon: records.iter().map(|o| o.lon).collect(),
            lat: records.iter().map(|o| o.lat).collect(),
            time: records.iter().map(|o| o.time).collect(),
            value: records.iter().map(|o| o.value).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.value.len()
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    pub fn lon(&self) -> &Array1<f64> {
        &self.lon
    }

    pub fn lat(&self) -> &Array1<f64> {
        &self.lat
    }

    pub fn time(&self) -> &Array1<f64> {
        &self.time
    }

    pub fn value(&self) -> &Array1<f64> {
        &self.value
    }

    pub fn get(&self, index: usize) -> Option<Observation> {
        (index < self.len()).then(|| Observation {
            lon: self.lon[index],
            lat: self.lat[index],
            time: self.time[index],
            value: self.value[index],
        })
    }

    /// Indices of the observations with `|time - center| < half_width`.
    pub fn select_window(&self, center: f64, half_width: f64) -> Vec<usize> {
        self.time
            .iter()
            .enumerate()
            .filter(|(_, t)| (**t - center).abs() < half_width)
            .map(|(i, _)| i)
            .collect()
    }

    /// Observation times span, or `None` for an empty set.
    pub fn time_range(&self) -> Option<(f64, f64)> {
        if self.is_empty() {
            return None;
        }
        let min = self.time.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = self.time.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        Some((min, max))
    }
}
