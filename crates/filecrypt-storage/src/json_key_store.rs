use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
};

use filecrypt_core::{
    key_material::KeyMaterial,
    keys::{KeyListing, KeyRing, KeyStore, KeyStoreError},
};
use tempfile::NamedTempFile;
use tracing::{debug, instrument};

/// File name of the key store inside its directory.
pub const KEYS_FILE_NAME: &str = "keys.json";

/// Key store persisted as a single JSON document. Every mutation rewrites the
/// whole file; concurrent writers are not coordinated (last writer wins).
#[derive(Debug)]
pub struct JsonFileKeyStore {
    path: PathBuf,
    ring: KeyRing,
}

impl JsonFileKeyStore {
    /// Empty store bound to `path`. Nothing is read until [`load`](Self::load).
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ring: KeyRing::new(),
        }
    }

    /// Construct and load in one step. A load failure is handed back next to a
    /// store that is still usable (and empty).
    pub fn open(path: impl Into<PathBuf>) -> (Self, Option<KeyStoreError>) {
        let mut store = Self::new(path);
        let err = store.load().err();
        (store, err)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replace the in-memory records with the file contents. A missing file
    /// means an empty store.
    #[instrument(skip_all, fields(path = %self.path.display()))]
    pub fn load(&mut self) -> Result<(), KeyStoreError> {
        self.ring = KeyRing::new();

        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!("no key store file yet");
                return Ok(());
            }
            Err(err) => return Err(err.into()),
        };

        self.ring = serde_json::from_slice(&bytes).map_err(|e| KeyStoreError::Decode {
            reason: e.to_string(),
        })?;
        debug!(keys = self.ring.len(), "key store loaded");
        Ok(())
    }

    /// Rewrite the backing file with the full record set, owner read/write only.
    #[instrument(skip_all, fields(path = %self.path.display()))]
    pub fn save(&self) -> Result<(), KeyStoreError> {
        let parent = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        create_private_dir(parent)?;

        let json = serde_json::to_vec_pretty(&self.ring).map_err(|e| KeyStoreError::Encode {
            reason: e.to_string(),
        })?;

        let mut tmp = NamedTempFile::new_in(parent)?;
        restrict_file_permissions(tmp.as_file())?;
        tmp.write_all(&json)?;
        tmp.flush()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;
        debug!(keys = self.ring.len(), "key store saved");
        Ok(())
    }
}

impl KeyStore for JsonFileKeyStore {
    #[instrument(skip(self, description))]
    fn generate(&mut self, id: &str, description: Option<String>) -> Result<(), KeyStoreError> {
        let snapshot = self.ring.clone();
        self.ring.insert_new(id, description)?;

        if let Err(err) = self.save() {
            self.ring = snapshot;
            return Err(err);
        }
        debug!("key generated");
        Ok(())
    }

    fn get(&self, id: &str) -> Result<KeyMaterial, KeyStoreError> {
        self.ring.key_material(id)
    }

    fn list(&self) -> Vec<KeyListing> {
        self.ring.listings()
    }
}

/// Create missing directories as owner-only. Existing directories are left alone.
fn create_private_dir(dir: &Path) -> io::Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        fs::DirBuilder::new().recursive(true).mode(0o700).create(dir)
    }
    #[cfg(not(unix))]
    {
        fs::create_dir_all(dir)
    }
}

fn restrict_file_permissions(file: &fs::File) -> io::Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(fs::Permissions::from_mode(0o600))
    }
    #[cfg(not(unix))]
    {
        let _ = file;
        Ok(())
    }
}
