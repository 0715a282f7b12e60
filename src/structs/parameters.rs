use serde::{Deserialize, Serialize};

use crate::error::OiError;

/// Covariance length scales and observation noise of the interpolation.
///
/// Length scales share the units of the grid coordinates (`lx`, `ly`) and of
/// the numeric time axis in days (`lt`). `noise` is the standard deviation of
/// the observation error; the observation error covariance is `noise²·I`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OiParameters {
    lx: f64,
    ly: f64,
    lt: f64,
    noise: f64,
}

impl OiParameters {
    pub fn new(lx: f64, ly: f64, lt: f64, noise: f64) -> Result<Self, OiError> {
        for (name, value) in [("lx", lx), ("ly", ly), ("lt", lt)] {
            if !(value > 0.0) || !value.is_finite() {
                return Err(OiError::InvalidParameter {
                    name,
                    value,
                    reason: "length scale must be finite and > 0",
                });
            }
        }
        if !(noise >= 0.0) || !noise.is_finite() {
            return Err(OiError::InvalidParameter {
                name: "noise",
                value: noise,
                reason: "noise must be finite and >= 0",
            });
        }
        tracing::debug!(
            "OI parameters: Lx = {}, Ly = {}, Lt = {}, noise = {}",
            lx,
            ly,
            lt,
            noise
        );
        Ok(OiParameters { lx, ly, lt, noise })
    }

    pub fn lx(&self) -> f64 {
        self.lx
    }

    pub fn ly(&self) -> f64 {
        self.ly
    }

    pub fn lt(&self) -> f64 {
        self.lt
    }

    pub fn noise(&self) -> f64 {
        self.noise
    }

    /// Observations strictly closer than this to a step, in days, are used for that step.
    pub fn time_window(&self) -> f64 {
        2.0 * self.lt
    }
}

impl<'de> Deserialize<'de> for OiParameters {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Raw {
            lx: f64,
            ly: f64,
            lt: f64,
            noise: f64,
        }
        let raw = Raw::deserialize(deserializer)?;
        OiParameters::new(raw.lx, raw.ly, raw.lt, raw.noise).map_err(serde::de::Error::custom)
    }
}
