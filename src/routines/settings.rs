use std::time::Duration;

use chrono::NaiveDateTime;
use config::Config as eConfig;
use eyre::{Result, WrapErr};
use serde::Deserialize;
use serde_derive::Serialize;

use crate::error::OiError;
use crate::routines::estimation::linalg::SolverKind;
use crate::routines::output::OutputFile;
use crate::routines::regrid::fill::FillSettings;
use crate::routines::time::{from_days, parse_datetime};
use crate::structs::grid::{axis_range, Grid};
use crate::structs::parameters::OiParameters;

/// Settings used for a reconstruction and evaluation run
///
/// Read from a TOML file by [read_settings]; any value can be overridden by
/// an environment variable such as `OICORE__OI__LT=10`
/// (prefix and nesting are both separated by `__`).
#[derive(Debug, Deserialize, Clone, Serialize)]
pub struct Settings {
    pub paths: Paths,
    pub grid: GridSettings,
    pub oi: OiSettings,
    #[serde(default)]
    pub evaluation: EvaluationSettings,
    #[serde(default)]
    pub log: Log,
}

#[derive(Debug, Deserialize, Clone, Serialize)]
pub struct Paths {
    /// Along-track observations, `time,lat,lon,ssh`
    pub observations: String,
    /// Reference field for the evaluation, same layout
    pub reference: Option<String>,
    /// Folder receiving every output file, including the log
    #[serde(default = "default_output")]
    pub output: String,
}

#[derive(Debug, Deserialize, Clone, Serialize)]
pub struct AxisRange {
    pub min: f64,
    pub max: f64,
    pub step: f64,
}

#[derive(Debug, Deserialize, Clone, Serialize)]
pub struct TimeRange {
    pub start: String,
    pub end: String,
    /// Days between two output steps
    #[serde(default = "default_time_step")]
    pub step: f64,
}

#[derive(Debug, Deserialize, Clone, Serialize)]
pub struct GridSettings {
    /// Reference date of the numeric time axis
    pub epoch: String,
    pub lon: AxisRange,
    pub lat: AxisRange,
    pub time: TimeRange,
}

#[derive(Debug, Deserialize, Clone, Serialize)]
pub struct OiSettings {
    pub lx: f64,
    pub ly: f64,
    pub lt: f64,
    pub noise: f64,
    #[serde(default)]
    pub solver: SolverKind,
    /// Worker threads, 0 for all cores
    #[serde(default)]
    pub threads: usize,
    /// Wall-clock budget in seconds for the step loop
    pub deadline: Option<f64>,
}

#[derive(Debug, Deserialize, Clone, Serialize)]
pub struct EvaluationSettings {
    /// Resample the reconstruction onto the reference grid before scoring
    #[serde(default = "default_true")]
    pub regrid: bool,
    pub time_min: Option<String>,
    pub time_max: Option<String>,
    #[serde(default = "default_fill_iterations")]
    pub fill_max_iterations: usize,
    #[serde(default = "default_fill_epsilon")]
    pub fill_epsilon: f64,
    #[serde(default = "default_relaxation")]
    pub fill_relaxation: f64,
}

#[derive(Debug, Deserialize, Clone, Serialize)]
pub struct Log {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_file")]
    pub file: String,
}

impl Settings {
    pub fn epoch(&self) -> Result<NaiveDateTime, OiError> {
        parse_datetime(&self.grid.epoch)
    }

    pub fn parameters(&self) -> Result<OiParameters, OiError> {
        OiParameters::new(self.oi.lx, self.oi.ly, self.oi.lt, self.oi.noise)
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.oi
            .deadline
            .filter(|s| s.is_finite() && *s >= 0.0)
            .map(Duration::from_secs_f64)
    }

    /// Output grid: regular lon/lat axes and a time axis every `time.step` days.
    pub fn build_grid(&self) -> Result<Grid, OiError> {
        let lon = axis_range(self.grid.lon.min, self.grid.lon.max, self.grid.lon.step)?;
        let lat = axis_range(self.grid.lat.min, self.grid.lat.max, self.grid.lat.step)?;
        let start = parse_datetime(&self.grid.time.start)?;
        let end = parse_datetime(&self.grid.time.end)?;
        let span = (end - start).num_seconds() as f64 / 86_400.0;
        let times = axis_range(0.0, span, self.grid.time.step)?
            .into_iter()
            .map(|days| from_days(start, days))
            .collect::<Result<Vec<_>, _>>()?;
        Grid::new(lon, lat, &times, &self.grid.epoch)
    }

    /// Bounds of the evaluation period, in days since the epoch.
    pub fn evaluation_window(&self) -> Result<(Option<f64>, Option<f64>), OiError> {
        let epoch = self.epoch()?;
        let convert = |value: &Option<String>| -> Result<Option<f64>, OiError> {
            value
                .as_deref()
                .map(|v| parse_datetime(v).map(|t| crate::routines::time::days_since(epoch, t)))
                .transpose()
        };
        Ok((
            convert(&self.evaluation.time_min)?,
            convert(&self.evaluation.time_max)?,
        ))
    }

    pub fn fill(&self) -> FillSettings {
        FillSettings {
            max_iterations: self.evaluation.fill_max_iterations,
            epsilon: self.evaluation.fill_epsilon,
            relaxation: self.evaluation.fill_relaxation,
        }
    }
}

pub fn read_settings(path: String) -> Result<Settings, config::ConfigError> {
    let settings_path = path;

    let parsed = eConfig::builder()
        .add_source(config::File::with_name(&settings_path).format(config::FileFormat::Toml))
        .add_source(config::Environment::with_prefix("OICORE").separator("__"))
        .build()?;

    let settings: Settings = parsed.try_deserialize()?;

    Ok(settings)
}

/// Write the effective settings as `settings.json` in the output folder
pub fn write_settings_to_file(settings: &Settings) -> Result<()> {
    let serialized =
        serde_json::to_string_pretty(settings).wrap_err("Could not serialize settings")?;

    let outputfile = OutputFile::new(&settings.paths.output, "settings.json")?;
    std::io::Write::write_all(&mut outputfile.file_owned(), serialized.as_bytes())
        .wrap_err("Could not write settings to file")?;
    Ok(())
}

// *********************************
// Default values for deserializing
// *********************************
fn default_true() -> bool {
    true
}

fn default_output() -> String {
    "outputs/".to_string()
}

fn default_time_step() -> f64 {
    1.0
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> String {
    "log.txt".to_string()
}

fn default_fill_iterations() -> usize {
    2000
}

fn default_fill_epsilon() -> f64 {
    1e-4
}

fn default_relaxation() -> f64 {
    1.0
}

impl Default for EvaluationSettings {
    fn default() -> Self {
        EvaluationSettings {
            regrid: default_true(),
            time_min: None,
            time_max: None,
            fill_max_iterations: default_fill_iterations(),
            fill_epsilon: default_fill_epsilon(),
            fill_relaxation: default_relaxation(),
        }
    }
}

impl Default for Log {
    fn default() -> Self {
        Log {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}
