use std::path::PathBuf;

use crate::config::Config;
use color_eyre::Result;
use dirs::home_dir;
use filecrypt_storage::json_key_store::{JsonFileKeyStore, KEYS_FILE_NAME};
use tracing::{debug, warn};

/// Directory under `$HOME` used when nothing else is configured.
const DEFAULT_KEYS_DIR: &str = ".file_encrypter";

/// Resolve the default key directory for Filecrypt.
pub fn default_keys_dir() -> Result<PathBuf> {
    let home = home_dir().ok_or_else(|| color_eyre::eyre::eyre!("no home dir available"))?;
    Ok(home.join(DEFAULT_KEYS_DIR))
}

/// Key store location from config, falling back to the default directory.
pub fn keys_path(config: &Config) -> Result<PathBuf> {
    if let Some(dir) = &config.keys_dir {
        return Ok(dir.join(KEYS_FILE_NAME));
    }
    Ok(default_keys_dir()?.join(KEYS_FILE_NAME))
}

/// Open the key store. A store that fails to load is reported and used empty.
pub fn open_store(path: PathBuf) -> JsonFileKeyStore {
    debug!(?path, "opening key store");
    let (store, err) = JsonFileKeyStore::open(path);
    if let Some(err) = err {
        warn!("failed to load key store {}: {err}", store.path().display());
    }
    store
}
