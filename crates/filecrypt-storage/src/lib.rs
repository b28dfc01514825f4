//! Concrete implementations: the JSON file backed key store and the
//! AES-256-GCM file cipher.

pub mod file_cipher;
pub mod json_key_store;
