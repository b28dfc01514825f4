use std::io::Write;

use color_eyre::{eyre::WrapErr, Result};
use filecrypt_core::keys::KeyStore;
use filecrypt_storage::file_cipher::{self, derive_cipher_key};
use tracing::info;

use crate::cli::KeyCommand;

/// Execute a key or file command against `store`, writing user output to `out`.
pub fn handle<S: KeyStore, W: Write>(cmd: KeyCommand, store: &mut S, out: &mut W) -> Result<()> {
    match cmd {
        KeyCommand::GenerateKey { description, id } => {
            store
                .generate(&id, description)
                .wrap_err("failed to generate key")?;
            info!(%id, "key generated");
            writeln!(out, "Created new key. ID: {id}")?;
        }
        KeyCommand::Encrypt { file, id } => {
            let material = store.get(&id).wrap_err("encryption failed")?;
            let key = derive_cipher_key(material.as_bytes());
            let dst = file_cipher::encrypt_file(&file, &key).wrap_err("encryption failed")?;
            writeln!(out, "File encrypted: {}", dst.display())?;
        }
        KeyCommand::Decrypt { file, id } => {
            let material = store.get(&id).wrap_err("decryption failed")?;
            let key = derive_cipher_key(material.as_bytes());
            let dst = file_cipher::decrypt_file(&file, &key).wrap_err("decryption failed")?;
            writeln!(out, "File decrypted: {}", dst.display())?;
        }
        KeyCommand::ListKey => {
            let keys = store.list();
            if keys.is_empty() {
                writeln!(out, "No stored keys")?;
                return Ok(());
            }
            writeln!(out, "Keys:")?;
            writeln!(out, "Total: {}", keys.len())?;
            for key in keys {
                writeln!(out, "- ID: {}", key.id)?;
                if let Some(desc) = key.description {
                    writeln!(out, "  Description: {desc}")?;
                }
            }
        }
    }

    Ok(())
}
