use thiserror::Error;

use crate::key_material::{KeyMaterial, KeyMaterialError};

use super::record::{KeyListing, KeyRing};

/// Errors produced by key store implementations.
#[derive(Debug, Error)]
pub enum KeyStoreError {
    /// A record with this id already exists.
    #[error("key with id '{id}' already exists")]
    Duplicate { id: String },
    /// Requested id does not exist.
    #[error("key with id '{id}' not found")]
    NotFound { id: String },
    /// Stored key text does not decode to valid material; the store is corrupt.
    #[error("invalid key format for '{id}': {source}")]
    KeyFormat {
        id: String,
        #[source]
        source: KeyMaterialError,
    },
    #[error("key generation failed: {0}")]
    Generation(#[source] KeyMaterialError),
    /// Backing file exists but is not a valid key store document.
    #[error("failed to decode key store: {reason}")]
    Decode { reason: String },
    #[error("failed to encode key store: {reason}")]
    Encode { reason: String },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Contract shared by the persistent store and the in-memory test double.
pub trait KeyStore {
    /// Create a record with fresh random material. Fails if `id` is taken.
    fn generate(&mut self, id: &str, description: Option<String>) -> Result<(), KeyStoreError>;

    /// Decoded material for `id`.
    fn get(&self, id: &str) -> Result<KeyMaterial, KeyStoreError>;

    fn list(&self) -> Vec<KeyListing>;
}

/// Key store that never touches the filesystem.
#[derive(Debug, Default, Clone)]
pub struct InMemoryKeyStore {
    ring: KeyRing,
}

impl InMemoryKeyStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyStore for InMemoryKeyStore {
    fn generate(&mut self, id: &str, description: Option<String>) -> Result<(), KeyStoreError> {
        self.ring.insert_new(id, description)
    }

    fn get(&self, id: &str) -> Result<KeyMaterial, KeyStoreError> {
        self.ring.key_material(id)
    }

    fn list(&self) -> Vec<KeyListing> {
        self.ring.listings()
    }
}
