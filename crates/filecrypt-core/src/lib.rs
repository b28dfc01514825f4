//! Core abstractions for Filecrypt: key material, the key ring model and the
//! key store contract. Concrete persistence and ciphers live in `filecrypt-storage`.

pub mod key_material;
pub mod keys;
