use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use eyre::Result;
use oicore::prelude::*;
use oicore::routines::time::{from_days, parse_datetime};

const EPOCH: &str = "2012-10-01";

fn truth(t: f64, lat: f64, lon: f64) -> f64 {
    (0.8 * lon).sin() * (0.6 * lat).cos() + 0.05 * t
}

/// Observations along synthetic tracks plus a complete reference field
fn write_inputs(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir)?;
    let epoch = parse_datetime(EPOCH)?;

    let mut obs = String::from("time,lat,lon,ssh\n");
    for day in 0..12 {
        for pass in 0..4 {
            let t = day as f64 + 0.25 * pass as f64;
            let lon = (0.7 * pass as f64 + 0.3 * day as f64) % 3.0;
            for k in 0..9 {
                let lat = 0.25 * k as f64;
                writeln!(obs, "{},{},{},{}", t, lat, lon, truth(t, lat, lon))?;
            }
        }
    }
    // a row without value is skipped
    writeln!(obs, "2012-10-03,1.0,1.0,")?;
    std::fs::write(dir.join("obs.csv"), obs)?;

    let mut reference = String::from("time,lat,lon,ssh\n");
    for day in 0..12 {
        let stamp = from_days(epoch, day as f64)?.format("%Y-%m-%d").to_string();
        for j in 0..5 {
            for i in 0..7 {
                let (lat, lon) = (0.5 * j as f64, 0.5 * i as f64);
                writeln!(
                    reference,
                    "{},{},{},{}",
                    stamp,
                    lat,
                    lon,
                    truth(day as f64, lat, lon)
                )?;
            }
        }
    }
    std::fs::write(dir.join("ref.csv"), reference)?;
    Ok(())
}

fn config(dir: &Path) -> String {
    let path = |name: &str| dir.join(name).to_string_lossy().replace('\\', "/");
    format!(
        r#"
[paths]
observations = "{obs}"
reference = "{reference}"
output = "{output}"

[grid]
epoch = "{EPOCH}"
lon = {{ min = 0.0, max = 3.0, step = 0.5 }}
lat = {{ min = 0.0, max = 2.0, step = 0.5 }}
time = {{ start = "2012-10-01", end = "2012-10-12" }}

[oi]
lx = 1.0
ly = 1.0
lt = 1.0
noise = 0.05

[evaluation]
time_min = "2012-10-02"
"#,
        obs = path("obs.csv"),
        reference = path("ref.csv"),
        output = path("outputs"),
    )
}

fn setup(name: &str) -> Result<(PathBuf, Settings)> {
    let dir = std::env::temp_dir().join(name);
    write_inputs(&dir)?;
    let file = dir.join("config.toml");
    std::fs::write(&file, config(&dir))?;
    let settings = read_settings(file.to_string_lossy().into_owned())?;
    Ok((dir, settings))
}

/// The full pipeline writes every output file and scores a good reconstruction
#[test]
fn test_run_end_to_end() -> Result<()> {
    let (dir, settings) = setup("oicore_run_end_to_end")?;
    let (result, scores) = run(settings)?;

    assert_eq!(result.summary.steps, 12);
    assert_eq!(result.summary.solved, 12);
    assert_eq!(result.grid.nobs()[0], 36 + 36);

    let scores = scores.ok_or_else(|| eyre::eyre!("evaluation did not run"))?;
    assert!(scores.leaderboard_rmse > 0.5);
    assert!(scores.error_stability.is_finite());

    let output = dir.join("outputs");
    for file in [
        "settings.json",
        "log.txt",
        "ssh.csv",
        "nobs.csv",
        "rmse_t.csv",
        "rmse_xy.csv",
        "psd_score.csv",
        "psd_freq.csv",
        "scores.json",
    ] {
        assert!(output.join(file).exists(), "{file} is missing");
    }

    let ssh = std::fs::read_to_string(output.join("ssh.csv"))?;
    assert_eq!(ssh.lines().count(), 1 + 12 * 5 * 7);
    // the evaluation window starts one day after the epoch
    let rmse_t = std::fs::read_to_string(output.join("rmse_t.csv"))?;
    assert_eq!(rmse_t.lines().count(), 1 + 11);

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(output.join("scores.json"))?)?;
    assert_eq!(json["interpolation"]["solved"], 12);
    Ok(())
}

/// Without regridding, the reconstruction must live on the reference grid
#[test]
fn test_evaluate_without_regrid_requires_same_grid() -> Result<()> {
    let (_, mut settings) = setup("oicore_run_no_regrid")?;
    settings.evaluation.regrid = false;
    let result = interpolate(&settings)?;
    let scores = evaluate(&settings, &result)?;
    assert!(scores.leaderboard_rmse > 0.5);

    settings.grid.lon.step = 0.25;
    let result = interpolate(&settings)?;
    assert!(evaluate(&settings, &result).is_err());
    Ok(())
}
