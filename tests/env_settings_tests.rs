//! Environment overrides live in their own test binary, since the
//! variables are process-wide and would leak into the other settings tests.

use eyre::Result;
use oicore::prelude::*;

const CONFIG: &str = r#"
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

/// `OICORE__<SECTION>__<KEY>` overrides a value of the configuration file
#[test]
fn test_environment_overrides_file() -> Result<()> {
    let dir = std::env::temp_dir().join("oicore_env_settings_tests");
    std::fs::create_dir_all(&dir)?;
    let path = dir.join("config.toml");
    std::fs::write(&path, CONFIG)?;
    let path = path.to_string_lossy().into_owned();

    std::env::set_var("OICORE__OI__LT", "10");
    std::env::set_var("OICORE__LOG__LEVEL", "debug");
    let settings = read_settings(path.clone());
    std::env::remove_var("OICORE__OI__LT");
    std::env::remove_var("OICORE__LOG__LEVEL");
    let settings = settings?;

    assert_eq!(settings.oi.lt, 10.0);
    assert_eq!(settings.parameters()?.lt(), 10.0);
    assert_eq!(settings.log.level, "debug");
    assert_eq!(settings.oi.lx, 1.0);

    let settings = read_settings(path)?;
    assert_eq!(settings.oi.lt, 1.0);
    Ok(())
}
