use std::path::Path;

use anyhow::Result;

use super::serve::load_config;

/// Print the configuration the server would run with
pub fn run(config_path: &Path, host: Option<String>, port: Option<u16>) -> Result<()> {
    let config = load_config(config_path, host, port)?;
    print!("{}", config.to_toml()?);
    Ok(())
}
