use std::path::PathBuf;

use eyre::Result;
use oicore::prelude::*;

fn write_config(name: &str, content: &str) -> Result<String> {
    let dir = std::env::temp_dir().join("oicore_settings_tests");
    std::fs::create_dir_all(&dir)?;
    let path: PathBuf = dir.join(name);
    std::fs::write(&path, content)?;
    Ok(path.to_string_lossy().into_owned())
}

const FULL: &str = r#"
[paths]
observations = "data/obs.csv"
reference = "data/ref.csv"
output = "out/"

[grid]
epoch = "2012-10-01"
lon = { min = 295.0, max = 296.0, step = 0.2 }
lat = { min = 33.0, max = 34.0, step = 0.5 }
time = { start = "2012-10-02", end = "2012-10-05", step = 1.0 }

[oi]
lx = 1.0
ly = 1.5
lt = 7.0
noise = 0.05
solver = "lu"
threads = 2
deadline = 60.0

[evaluation]
regrid = false
time_min = "2012-10-03"
fill_max_iterations = 50

[log]
level = "debug"
"#;

/// A complete configuration file is parsed into typed settings
#[test]
fn test_read_full_settings() -> Result<()> {
    let settings = read_settings(write_config("full.toml", FULL)?)?;

    assert_eq!(settings.paths.observations, "data/obs.csv");
    assert_eq!(settings.paths.reference.as_deref(), Some("data/ref.csv"));
    assert_eq!(settings.oi.solver, SolverKind::Lu);
    assert_eq!(settings.oi.threads, 2);
    assert_eq!(settings.deadline(), Some(std::time::Duration::from_secs(60)));
    assert!(!settings.evaluation.regrid);
    assert_eq!(settings.evaluation.fill_max_iterations, 50);
    assert_eq!(settings.fill().epsilon, 1e-4);
    assert_eq!(settings.log.level, "debug");
    assert_eq!(settings.log.file, "log.txt");

    let params = settings.parameters()?;
    assert_eq!((params.lx(), params.ly(), params.lt()), (1.0, 1.5, 7.0));

    let (time_min, time_max) = settings.evaluation_window()?;
    assert_eq!(time_min, Some(2.0));
    assert_eq!(time_max, None);
    Ok(())
}

/// The grid is built from the axis ranges, with time relative to the epoch
#[test]
fn test_build_grid_from_settings() -> Result<()> {
    let settings = read_settings(write_config("grid.toml", FULL)?)?;
    let grid = settings.build_grid()?;

    assert_eq!(grid.nx(), 6);
    assert_eq!(grid.ny(), 3);
    assert_eq!(grid.nt(), 4);
    assert_eq!(grid.vtime().to_vec(), vec![1.0, 2.0, 3.0, 4.0]);
    assert!(grid.status().iter().all(|s| *s == StepStatus::Pending));
    Ok(())
}

/// Optional sections fall back to their defaults
#[test]
fn test_defaults() -> Result<()> {
    let minimal = r#"
[paths]
observations = "obs.csv"

[grid]
epoch = "2012-10-01"
lon = { min = 0.0, max = 1.0, step = 1.0 }
lat = { min = 0.0, max = 1.0, step = 1.0 }
time = { start = "2012-10-01", end = "2012-10-02" }

[oi]
lx = 1.0
ly = 1.0
lt = 1.0
noise = 0.1
"#;
    let settings = read_settings(write_config("minimal.toml", minimal)?)?;

    assert_eq!(settings.paths.output, "outputs/");
    assert_eq!(settings.paths.reference, None);
    assert_eq!(settings.oi.solver, SolverKind::Cholesky);
    assert_eq!(settings.oi.threads, 0);
    assert_eq!(settings.deadline(), None);
    assert!(settings.evaluation.regrid);
    assert_eq!(settings.fill(), FillSettings::default());
    assert_eq!(settings.log.level, "info");
    assert_eq!(settings.grid.time.step, 1.0);
    Ok(())
}

/// Invalid physical parameters are reported as typed errors
#[test]
fn test_invalid_parameters_are_rejected() -> Result<()> {
    let content = FULL.replace("lt = 7.0", "lt = 0.0");
    let settings = read_settings(write_config("invalid.toml", &content)?)?;
    assert!(matches!(
        settings.parameters(),
        Err(OiError::InvalidParameter { name: "lt", .. })
    ));

    let content = FULL.replace("epoch = \"2012-10-01\"", "epoch = \"yesterday\"");
    let settings = read_settings(write_config("epoch.toml", &content)?)?;
    assert!(matches!(settings.epoch(), Err(OiError::InvalidEpoch { .. })));
    Ok(())
}

/// A missing file is an error, not a panic
#[test]
fn test_missing_file() {
    assert!(read_settings("/nonexistent/oicore.toml".to_string()).is_err());
}
