use std::fs::{create_dir_all, File, OpenOptions};
use std::path::{Path, PathBuf};

use csv::WriterBuilder;
use eyre::{Result, WrapErr};
use ndarray::Array2;
use ndarray_csv::Array2Writer;
use serde::Serialize;

use crate::algorithms::oi::RunSummary;
use crate::routines::evaluation::psd::PsdScores;
use crate::routines::evaluation::rmse::RmseScores;
use crate::routines::time::from_days;
use crate::structs::field::GriddedField;
use crate::structs::grid::Grid;
use crate::structs::parameters::OiParameters;

const TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Defines the result of an interpolation run
/// An [OiResult] owns the filled grid together with the parameters that produced it
#[derive(Debug)]
pub struct OiResult {
    pub grid: Grid,
    pub params: OiParameters,
    pub summary: RunSummary,
}

impl OiResult {
    pub fn new(grid: Grid, params: OiParameters, summary: RunSummary) -> Self {
        Self {
            grid,
            params,
            summary,
        }
    }

    /// The reconstruction as a labelled field.
    pub fn field(&self) -> GriddedField {
        GriddedField::from_grid(&self.grid)
    }

    pub fn write_outputs(&self, folder: &str) -> Result<()> {
        tracing::debug!("Writing interpolation outputs to {}", folder);
        self.write_ssh(folder)?;
        self.write_nobs(folder)?;
        Ok(())
    }

    /// Writes the reconstructed field in long format, one row per grid node and step
    pub fn write_ssh(&self, folder: &str) -> Result<()> {
        let outputfile = OutputFile::new(folder, "ssh.csv")?;
        let mut writer = WriterBuilder::new()
            .has_headers(true)
            .from_writer(&outputfile.file);
        writer.write_record(["time", "lat", "lon", "ssh"])?;

        let grid = &self.grid;
        for step in 0..grid.nt() {
            let time = grid.time_at(step)?.format(TIME_FORMAT).to_string();
            let slice = grid.ssh_at(step);
            for (j, lat) in grid.lat().iter().enumerate() {
                for (i, lon) in grid.lon().iter().enumerate() {
                    writer.write_record(&[
                        time.clone(),
                        lat.to_string(),
                        lon.to_string(),
                        slice[[j, i]].to_string(),
                    ])?;
                }
            }
        }
        writer.flush()?;
        tracing::debug!("Reconstruction written to {:?}", outputfile.relative_path());
        Ok(())
    }

    /// Writes the number of observations and the status of each step
    pub fn write_nobs(&self, folder: &str) -> Result<()> {
        let outputfile = OutputFile::new(folder, "nobs.csv")?;
        let mut writer = WriterBuilder::new()
            .has_headers(true)
            .from_writer(&outputfile.file);
        writer.write_record(["step", "time", "nobs", "status"])?;

        let grid = &self.grid;
        for (step, (nobs, status)) in grid.nobs().iter().zip(grid.status()).enumerate() {
            writer.write_record(&[
                step.to_string(),
                grid.time_at(step)?.format(TIME_FORMAT).to_string(),
                nobs.to_string(),
                status.as_str().to_string(),
            ])?;
        }
        writer.flush()?;
        tracing::debug!("Observation counts written to {:?}", outputfile.relative_path());
        Ok(())
    }
}

/// Scalar metrics of an evaluation, written as `scores.json`
#[derive(Debug, Clone, Serialize)]
pub struct ScoreSummary {
    pub leaderboard_rmse: f64,
    pub error_stability: f64,
    pub shortest_spatial_wavelength: Option<f64>,
    pub shortest_temporal_wavelength: Option<f64>,
    pub interpolation: RunSummary,
}

/// Writes every score table of an evaluation
pub fn write_scores(
    folder: &str,
    reference: &GriddedField,
    epoch: chrono::NaiveDateTime,
    rmse: &RmseScores,
    psd: Option<&PsdScores>,
    summary: &ScoreSummary,
) -> Result<()> {
    // RMSE score time series
    let outputfile = OutputFile::new(folder, "rmse_t.csv")?;
    let mut writer = WriterBuilder::new()
        .has_headers(true)
        .from_writer(&outputfile.file);
    writer.write_record(["time", "rmse_t"])?;
    for (t, score) in reference.time().iter().zip(rmse.rmse_t.iter()) {
        writer.write_record(&[
            from_days(epoch, *t)?.format(TIME_FORMAT).to_string(),
            score.to_string(),
        ])?;
    }
    writer.flush()?;

    write_matrix(folder, "rmse_xy.csv", &rmse.rmse_xy)?;
    if let Some(psd) = psd {
        write_matrix(folder, "psd_score.csv", &psd.score)?;

        // Frequency axes of the PSD score, rows then columns
        let outputfile = OutputFile::new(folder, "psd_freq.csv")?;
        let mut writer = WriterBuilder::new()
            .has_headers(true)
            .from_writer(&outputfile.file);
        writer.write_record(["axis", "index", "frequency", "wavelength"])?;
        for (axis, freqs) in [("time", &psd.freq_time), ("lon", &psd.freq_lon)] {
            for (index, f) in freqs.iter().enumerate() {
                writer.write_record(&[
                    axis.to_string(),
                    index.to_string(),
                    f.to_string(),
                    (1.0 / f).to_string(),
                ])?;
            }
        }
        writer.flush()?;
    }

    let outputfile = OutputFile::new(folder, "scores.json")?;
    serde_json::to_writer_pretty(outputfile.file(), summary)
        .wrap_err("Failed to write scores.json")?;
    tracing::debug!("Scores written to {}", folder);
    Ok(())
}

/// Writes a 2D array without header, one matrix row per CSV line
pub fn write_matrix(folder: &str, file_name: &str, matrix: &Array2<f64>) -> Result<()> {
    let outputfile = OutputFile::new(folder, file_name)?;
    let mut writer = WriterBuilder::new()
        .has_headers(false)
        .from_writer(&outputfile.file);
    writer
        .serialize_array2(matrix)
        .wrap_err_with(|| format!("Failed to write {}", file_name))?;
    writer.flush()?;
    Ok(())
}

#[derive(Debug)]
pub struct OutputFile {
    file: File,
    relative_path: PathBuf,
}

impl OutputFile {
    pub fn new(folder: &str, file_name: &str) -> Result<Self> {
        let relative_path = Path::new(&folder).join(file_name);

        if let Some(parent) = relative_path.parent() {
            create_dir_all(parent)
                .wrap_err_with(|| format!("Failed to create directories for {:?}", parent))?;
        }

        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&relative_path)
            .wrap_err_with(|| format!("Failed to open file: {:?}", relative_path))?;

        Ok(OutputFile {
            file,
            relative_path,
        })
    }

    pub fn file(&self) -> &File {
        &self.file
    }

    pub fn file_owned(self) -> File {
        self.file
    }

    pub fn relative_path(&self) -> &Path {
        &self.relative_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn output_file_creates_missing_folders() {
        let folder = std::env::temp_dir().join("oicore_output_file_test/nested");
        let folder = folder.to_str().unwrap();
        let outputfile = OutputFile::new(folder, "x.csv").unwrap();
        assert!(outputfile.relative_path().exists());
    }

    #[test]
    fn matrix_is_written_row_by_row() {
        let folder = std::env::temp_dir().join("oicore_matrix_test");
        let folder = folder.to_str().unwrap();
        write_matrix(folder, "m.csv", &array![[1.0, 2.0], [3.0, 4.5]]).unwrap();
        let content = std::fs::read_to_string(Path::new(folder).join("m.csv")).unwrap();
        let rows: Vec<Vec<f64>> = content
            .lines()
            .map(|line| line.split(',').map(|v| v.parse().unwrap()).collect())
            .collect();
        assert_eq!(rows, vec![vec![1.0, 2.0], vec![3.0, 4.5]]);
    }
}
