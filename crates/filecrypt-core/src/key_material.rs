use std::fmt;

use base64::{engine::general_purpose, Engine as _};
use rand::{rngs::OsRng, RngCore};
use thiserror::Error;

/// Length of every generated key, in bytes.
pub const KEY_LEN: usize = 32;

/// Raw symmetric key material held by a key record.
#[derive(Clone, PartialEq, Eq)]
pub struct KeyMaterial {
    bytes: [u8; KEY_LEN],
}

impl KeyMaterial {
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.bytes
    }
}

// Never print key bytes, even in debug output.
impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("KeyMaterial(<redacted>)")
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum KeyMaterialError {
    #[error("decode error: {0}")]
    Decode(String),
    #[error("expected 32 bytes, got {0}")]
    Length(usize),
    #[error("generation error: {0}")]
    Generation(String),
}

/// Draw a fresh key from the operating system's secure random source.
pub fn generate_key() -> Result<KeyMaterial, KeyMaterialError> {
    let mut bytes = [0u8; KEY_LEN];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| KeyMaterialError::Generation(e.to_string()))?;
    Ok(KeyMaterial { bytes })
}

/// Text form used in the key store file (standard base64, padded).
pub fn encode_key(material: &KeyMaterial) -> String {
    general_purpose::STANDARD.encode(material.bytes)
}

pub fn decode_key(encoded: &str) -> Result<KeyMaterial, KeyMaterialError> {
    let bytes = general_purpose::STANDARD
        .decode(encoded)
        .map_err(|e| KeyMaterialError::Decode(e.to_string()))?;

    let bytes: [u8; KEY_LEN] = bytes
        .as_slice()
        .try_into()
        .map_err(|_| KeyMaterialError::Length(bytes.len()))?;
    Ok(KeyMaterial { bytes })
}
