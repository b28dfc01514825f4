use std::{
    fs, io,
    path::{Path, PathBuf},
};

use color_eyre::{eyre::WrapErr, Result};
use dirs::config_dir;
use serde::{Deserialize, Serialize};

/// User-level configuration from `<config_dir>/filecrypt/config.toml`.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct Config {
    /// Directory holding `keys.json`, instead of `~/.file_encrypter`.
    pub keys_dir: Option<PathBuf>,
}

impl Config {
    /// Read the config at the platform default location.
    pub fn load() -> Result<Self> {
        Self::from_file(&config_path()?)
    }

    /// A missing or blank file yields the defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(err) => {
                return Err(err).wrap_err_with(|| format!("failed to read {}", path.display()))
            }
        };
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        toml::from_str(&contents).wrap_err_with(|| format!("invalid config {}", path.display()))
    }

    /// Write `self` to `path` unless something is already there. Returns
    /// whether a file was created.
    pub fn write_if_missing(&self, path: &Path) -> Result<bool> {
        if path.exists() {
            return Ok(false);
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(true)
    }
}

pub fn config_path() -> Result<PathBuf> {
    let base = config_dir().ok_or_else(|| color_eyre::eyre::eyre!("no config dir available"))?;
    Ok(base.join("filecrypt").join("config.toml"))
}
