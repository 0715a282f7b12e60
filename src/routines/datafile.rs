use std::collections::HashMap;
use std::path::Path;

use chrono::NaiveDateTime;
use eyre::{eyre, Result, WrapErr};
use ndarray::{Array1, Array3};
use serde::Deserialize;

use crate::routines::time::parse_time_value;
use crate::structs::field::GriddedField;
use crate::structs::observations::{Observation, ObservationSet};

/// One row of an SSH file, `time,lat,lon,ssh`
#[derive(Debug, Deserialize, Clone)]
struct Record {
    time: String,
    lat: f64,
    lon: f64,
    ssh: Option<f64>,
}

/// A row with its time converted to days since the epoch
#[derive(Debug, Clone, Copy)]
struct Sample {
    time: f64,
    lat: f64,
    lon: f64,
    ssh: f64,
}

fn read_samples(path: &Path, epoch: NaiveDateTime) -> Result<(Vec<Sample>, usize)> {
    let mut reader = csv::ReaderBuilder::new()
        .comment(Some(b'#'))
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .wrap_err_with(|| format!("Unable to open {:?}", path))?;

    let mut samples = Vec::new();
    let mut skipped = 0;
    for (line, result) in reader.deserialize::<Record>().enumerate() {
        let record = result.wrap_err_with(|| format!("Malformed row {} in {:?}", line + 1, path))?;
        let time = parse_time_value(&record.time, epoch)
            .wrap_err_with(|| format!("Row {} in {:?}", line + 1, path))?;
        let sample = Sample {
            time,
            lat: record.lat,
            lon: record.lon,
            ssh: record.ssh.unwrap_or(f64::NAN),
        };
        if [sample.time, sample.lat, sample.lon].iter().all(|v| v.is_finite()) {
            samples.push(sample);
        } else {
            skipped += 1;
        }
    }
    Ok((samples, skipped))
}

/// Read along-track observations; rows without a finite value are dropped
pub fn read_observations(path: impl AsRef<Path>, epoch: NaiveDateTime) -> Result<ObservationSet> {
    let path = path.as_ref();
    let (samples, mut skipped) = read_samples(path, epoch)?;
    let records: Vec<Observation> = samples
        .iter()
        .filter(|s| s.ssh.is_finite())
        .map(|s| Observation {
            lon: s.lon,
            lat: s.lat,
            time: s.time,
            value: s.ssh,
        })
        .collect();
    skipped += samples.len() - records.len();
    if skipped > 0 {
        tracing::warn!("Skipped {} observations with non-finite values", skipped);
    }
    let observations = ObservationSet::from_records(&records);
    tracing::info!(
        "Read {} observations from {:?}",
        observations.len(),
        path
    );
    Ok(observations)
}

/// Read a gridded field stored in long format.
///
/// The axes are the sorted unique coordinates found in the file; cells
/// without a row are NaN.
pub fn read_field(path: impl AsRef<Path>, epoch: NaiveDateTime) -> Result<GriddedField> {
    let path = path.as_ref();
    let (samples, skipped) = read_samples(path, epoch)?;
    if skipped > 0 {
        tracing::warn!("Skipped {} rows with non-finite coordinates", skipped);
    }
    if samples.is_empty() {
        return Err(eyre!("{:?} contains no valid rows", path));
    }

    let time = unique_sorted(samples.iter().map(|s| s.time));
    let lat = unique_sorted(samples.iter().map(|s| s.lat));
    let lon = unique_sorted(samples.iter().map(|s| s.lon));

    let index = |axis: &[f64]| -> HashMap<u64, usize> {
        axis.iter()
            .enumerate()
            .map(|(i, v)| (v.to_bits(), i))
            .collect()
    };
    let (ti, yi, xi) = (index(&time), index(&lat), index(&lon));

    let mut values = Array3::from_elem((time.len(), lat.len(), lon.len()), f64::NAN);
    let mut duplicates = 0;
    for s in &samples {
        let cell = [ti[&s.time.to_bits()], yi[&s.lat.to_bits()], xi[&s.lon.to_bits()]];
        if !values[cell].is_nan() {
            duplicates += 1;
        }
        values[cell] = s.ssh;
    }
    if duplicates > 0 {
        tracing::warn!("{} duplicated cells in {:?}, keeping the last row", duplicates, path);
    }
    let missing = values.iter().filter(|v| v.is_nan()).count();
    tracing::info!(
        "Read field {} x {} x {} from {:?} ({} missing cells)",
        time.len(),
        lat.len(),
        lon.len(),
        path,
        missing
    );

    Ok(GriddedField::new(
        Array1::from(time),
        Array1::from(lat),
        Array1::from(lon),
        values,
    )?)
}

fn unique_sorted(values: impl Iterator<Item = f64>) -> Vec<f64> {
    let mut v: Vec<f64> = values.collect();
    v.sort_by(|a, b| a.total_cmp(b));
    v.dedup();
    v
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routines::time::parse_datetime;
    use std::io::Write;

    fn write(name: &str, content: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join("oicore_datafile_test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn observations_with_dates_and_days() {
        let path = write(
            "obs.csv",
            "time,lat,lon,ssh\n\
             2012-10-02,35.0,-60.0,0.5\n\
             2012-10-01T12:00:00,35.5,-59.5,0.25\n\
             1.5,36.0,-59.0,\n\
             3.0,36.0,-59.0,nan\n",
        );
        let epoch = parse_datetime("2012-10-01").unwrap();
        let obs = read_observations(&path, epoch).unwrap();
        assert_eq!(obs.len(), 2);
        assert_eq!(obs.time().to_vec(), vec![1.0, 0.5]);
        assert_eq!(obs.value().to_vec(), vec![0.5, 0.25]);
    }

    #[test]
    fn field_is_rebuilt_on_sorted_axes() {
        let path = write(
            "field.csv",
            "time,lat,lon,ssh\n\
             1,10,1,4.0\n\
             0,10,0,1.0\n\
             0,10,1,2.0\n\
             1,10,0,3.0\n\
             0,11,0,5.0\n",
        );
        let epoch = parse_datetime("2000-01-01").unwrap();
        let field = read_field(&path, epoch).unwrap();
        assert_eq!(field.dim(), (2, 2, 2));
        assert_eq!(field.time().to_vec(), vec![0.0, 1.0]);
        assert_eq!(field.values()[[0, 0, 1]], 2.0);
        assert_eq!(field.values()[[1, 0, 0]], 3.0);
        assert_eq!(field.values()[[0, 1, 0]], 5.0);
        assert!(field.values()[[1, 1, 1]].is_nan());
    }

    #[test]
    fn missing_file_is_an_error() {
        let epoch = parse_datetime("2000-01-01").unwrap();
        assert!(read_observations("/nonexistent/obs.csv", epoch).is_err());
    }
}
