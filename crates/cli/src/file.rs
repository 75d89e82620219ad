use std::{fs, path::Path};

use crate::{config::Config, error::Error};

/// Loads and validates the configuration file.
pub fn load_config(config_file: &Path) -> Result<Config, Error> {
    let content =
        fs::read_to_string(config_file).map_err(|_| Error::OpenFile(config_file.to_path_buf()))?;
    let config: Config = toml::from_str(&content).map_err(|e| Error::ParseConfig(e.to_string()))?;
    config.validate()?;
    Ok(config)
}
