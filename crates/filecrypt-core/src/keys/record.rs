use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::key_material::{decode_key, encode_key, generate_key, KeyMaterial};

use super::key_store::KeyStoreError;

/// A stored key: text-encoded material plus an optional note set at creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyRecord {
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Public view of a record for listings. Never carries key material.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyListing {
    pub id: String,
    pub description: Option<String>,
}

/// The id → record mapping, serialized as `{"keys": {...}}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyRing {
    #[serde(default)]
    keys: HashMap<String, KeyRecord>,
}

impl KeyRing {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.keys.contains_key(id)
    }

    /// Create a record with freshly generated material. Existing ids are never replaced.
    pub fn insert_new(
        &mut self,
        id: &str,
        description: Option<String>,
    ) -> Result<(), KeyStoreError> {
        if self.contains(id) {
            return Err(KeyStoreError::Duplicate { id: id.to_string() });
        }

        let material = generate_key().map_err(KeyStoreError::Generation)?;
        self.keys.insert(
            id.to_string(),
            KeyRecord {
                key: encode_key(&material),
                description: description.filter(|d| !d.is_empty()),
            },
        );
        Ok(())
    }

    pub fn key_material(&self, id: &str) -> Result<KeyMaterial, KeyStoreError> {
        let record = self.keys.get(id).ok_or_else(|| KeyStoreError::NotFound {
            id: id.to_string(),
        })?;

        decode_key(&record.key).map_err(|source| KeyStoreError::KeyFormat {
            id: id.to_string(),
            source,
        })
    }

    /// Listings sorted by id.
    pub fn listings(&self) -> Vec<KeyListing> {
        let mut out: Vec<KeyListing> = self
            .keys
            .iter()
            .map(|(id, record)| KeyListing {
                id: id.clone(),
                description: record.description.clone().filter(|d| !d.is_empty()),
            })
            .collect();
        out.sort_by(|a, b| a.id.cmp(&b.id));
        out
    }
}
