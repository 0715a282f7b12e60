use eyre::{eyre, Result};
use oicore::prelude::*;

fn main() -> Result<()> {
    let path = std::env::args()
        .nth(1)
        .ok_or_else(|| eyre!("Usage: oicore <config.toml>"))?;
    let settings = read_settings(path)?;
    let (_, scores) = run(settings)?;
    if let Some(scores) = scores {
        println!("{}", serde_json::to_string_pretty(&scores)?);
    }
    Ok(())
}
