//! AES-256-GCM over whole-file buffers.
//!
//! Ciphertext layout on disk: `nonce (12 bytes) || ciphertext || tag (16 bytes)`.
//! There is no header or version field.

use std::{
    ffi::OsStr,
    fmt, fs,
    io::{self, Write},
    path::{Path, PathBuf},
};

use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng},
    Aes256Gcm, Key, Nonce,
};
use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, instrument};

pub const NONCE_LEN: usize = 12;
pub const TAG_LEN: usize = 16;
/// Appended on encryption, required and stripped on decryption.
pub const ENCRYPTED_SUFFIX: &str = ".enc";

#[derive(Debug, Error)]
pub enum CipherError {
    /// Blob is too short to even hold a nonce.
    #[error("malformed ciphertext: {len} bytes is shorter than a nonce")]
    MalformedCiphertext { len: usize },
    /// Tag verification failed: wrong key, corrupted or truncated data.
    #[error("authentication failed: wrong key or corrupted data")]
    Authentication,
    #[error("encryption failed")]
    Encryption,
    #[error("cannot derive output name for {}: expected a `.enc` suffix", .path.display())]
    InvalidFileName { path: PathBuf },
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// 256-bit AES key derived from stored key material.
#[derive(Clone, PartialEq, Eq)]
pub struct CipherKey([u8; 32]);

impl CipherKey {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Debug for CipherKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CipherKey(<redacted>)")
    }
}

/// SHA-256 of the raw key bytes. A plain normalization step, not a password KDF.
pub fn derive_cipher_key(raw: &[u8]) -> CipherKey {
    CipherKey(Sha256::digest(raw).into())
}

pub struct FileCipher {
    cipher: Aes256Gcm,
}

impl FileCipher {
    pub fn new(key: &CipherKey) -> Self {
        Self {
            cipher: Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.as_bytes())),
        }
    }

    /// Seal `plaintext` under a fresh random nonce and return `nonce || sealed`.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, CipherError> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let sealed = self
            .cipher
            .encrypt(&nonce, plaintext)
            .map_err(|_| CipherError::Encryption)?;

        let mut blob = Vec::with_capacity(NONCE_LEN + sealed.len());
        blob.extend_from_slice(nonce.as_slice());
        blob.extend_from_slice(&sealed);
        Ok(blob)
    }

    /// Verify and open a `nonce || sealed` blob. Nothing is returned unless the tag checks out.
    pub fn decrypt(&self, blob: &[u8]) -> Result<Vec<u8>, CipherError> {
        if blob.len() < NONCE_LEN {
            return Err(CipherError::MalformedCiphertext { len: blob.len() });
        }

        let (nonce, sealed) = blob.split_at(NONCE_LEN);
        self.cipher
            .decrypt(Nonce::from_slice(nonce), sealed)
            .map_err(|_| CipherError::Authentication)
    }
}

pub fn encrypt(plaintext: &[u8], key: &CipherKey) -> Result<Vec<u8>, CipherError> {
    FileCipher::new(key).encrypt(plaintext)
}

pub fn decrypt(blob: &[u8], key: &CipherKey) -> Result<Vec<u8>, CipherError> {
    FileCipher::new(key).decrypt(blob)
}

/// `<src>.enc`
pub fn encrypted_path(src: &Path) -> PathBuf {
    let mut name = src.as_os_str().to_owned();
    name.push(ENCRYPTED_SUFFIX);
    PathBuf::from(name)
}

/// `<src>` with the `.enc` suffix removed. The remaining name must be non-empty.
pub fn decrypted_path(src: &Path) -> Result<PathBuf, CipherError> {
    let stem = src
        .file_name()
        .and_then(strip_encrypted_suffix)
        .filter(|stem| !stem.is_empty())
        .ok_or_else(|| CipherError::InvalidFileName {
            path: src.to_path_buf(),
        })?;
    Ok(src.with_file_name(stem))
}

// File names are raw bytes on unix and need not be UTF-8.
#[cfg(unix)]
fn strip_encrypted_suffix(name: &OsStr) -> Option<&OsStr> {
    use std::os::unix::ffi::OsStrExt;
    name.as_bytes()
        .strip_suffix(ENCRYPTED_SUFFIX.as_bytes())
        .map(OsStr::from_bytes)
}

#[cfg(not(unix))]
fn strip_encrypted_suffix(name: &OsStr) -> Option<&OsStr> {
    name.to_str()?.strip_suffix(ENCRYPTED_SUFFIX).map(OsStr::new)
}

/// Encrypt `src` into `<src>.enc`, returning the written path. The output
/// takes the permissions of `src`.
#[instrument(skip_all, fields(src = %src.display()))]
pub fn encrypt_file(src: &Path, key: &CipherKey) -> Result<PathBuf, CipherError> {
    let dst = encrypted_path(src);
    let permissions = fs::metadata(src)?.permissions();
    let plaintext = fs::read(src)?;
    let blob = encrypt(&plaintext, key)?;
    write_output(&dst, &blob, permissions)?;
    debug!(dst = %dst.display(), bytes = blob.len(), "file encrypted");
    Ok(dst)
}

/// Decrypt `<name>.enc` into `<name>`, returning the written path. The output
/// takes the permissions of `src`. On any failure no output file is created.
#[instrument(skip_all, fields(src = %src.display()))]
pub fn decrypt_file(src: &Path, key: &CipherKey) -> Result<PathBuf, CipherError> {
    let dst = decrypted_path(src)?;
    let permissions = fs::metadata(src)?.permissions();
    let blob = fs::read(src)?;
    let plaintext = decrypt(&blob, key)?;
    write_output(&dst, &plaintext, permissions)?;
    debug!(dst = %dst.display(), bytes = plaintext.len(), "file decrypted");
    Ok(dst)
}

// Write through a temp file in the destination directory so readers never see
// a partially written output.
fn write_output(
    path: &Path,
    bytes: &[u8],
    permissions: fs::Permissions,
) -> Result<(), CipherError> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let mut tmp = NamedTempFile::new_in(parent)?;
    tmp.write_all(bytes)?;
    tmp.flush()?;
    tmp.as_file().set_permissions(permissions)?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    fn key(seed: u8) -> CipherKey {
        derive_cipher_key(&[seed; 32])
    }

    #[test]
    fn derive_is_sha256_of_raw_bytes() {
        let expected: [u8; 32] = [
            0xba, 0x78, 0x16, 0xbf, 0x8f, 0x01, 0xcf, 0xea, 0x41, 0x41, 0x40, 0xde, 0x5d, 0xae,
            0x22, 0x23, 0xb0, 0x03, 0x61, 0xa3, 0x96, 0x17, 0x7a, 0x9c, 0xb4, 0x10, 0xff, 0x61,
            0xf2, 0x00, 0x15, 0xad,
        ];
        assert_eq!(derive_cipher_key(b"abc").as_bytes(), &expected);
    }

    #[test]
    fn round_trip_restores_plaintext() {
        let key = key(1);
        for plaintext in [&b""[..], &b"hello"[..], &[0xffu8; 4096][..]] {
            let blob = encrypt(plaintext, &key).expect("encrypt");
            assert_eq!(blob.len(), NONCE_LEN + plaintext.len() + TAG_LEN);
            assert_eq!(decrypt(&blob, &key).expect("decrypt"), plaintext);
        }
    }

    #[test]
    fn every_single_bit_flip_fails_authentication() {
        let key = key(2);
        let blob = encrypt(b"hello", &key).expect("encrypt");

        for byte in 0..blob.len() {
            for bit in 0..8 {
                let mut tampered = blob.clone();
                tampered[byte] ^= 1 << bit;
                let err = decrypt(&tampered, &key).expect_err("tampered blob must fail");
                assert!(matches!(err, CipherError::Authentication));
            }
        }
    }

    #[test]
    fn nonces_do_not_repeat() {
        let cipher = FileCipher::new(&key(3));
        let mut nonces = HashSet::new();
        let mut blobs = HashSet::new();
        for _ in 0..1000 {
            let blob = cipher.encrypt(b"same plaintext").expect("encrypt");
            assert!(nonces.insert(blob[..NONCE_LEN].to_vec()), "nonce repeated");
            assert!(blobs.insert(blob), "ciphertext repeated");
        }
    }

    #[test]
    fn blobs_shorter_than_nonce_are_malformed() {
        let key = key(4);
        for len in 0..NONCE_LEN {
            let err = decrypt(&vec![0u8; len], &key).expect_err("short blob");
            assert!(matches!(err, CipherError::MalformedCiphertext { len: l } if l == len));
        }
    }

    #[test]
    fn truncated_payload_fails_authentication() {
        let key = key(5);
        let blob = encrypt(b"hello", &key).expect("encrypt");
        for len in NONCE_LEN..blob.len() {
            let err = decrypt(&blob[..len], &key).expect_err("truncated blob");
            assert!(matches!(err, CipherError::Authentication));
        }
    }

    #[test]
    fn wrong_key_fails_authentication() {
        let blob = encrypt(b"hello", &key(6)).expect("encrypt");
        let err = decrypt(&blob, &key(7)).expect_err("wrong key");
        assert!(matches!(err, CipherError::Authentication));
    }

    #[test]
    fn output_paths_follow_suffix_convention() {
        assert_eq!(
            encrypted_path(Path::new("dir/report.pdf")),
            PathBuf::from("dir/report.pdf.enc")
        );
        assert_eq!(
            decrypted_path(Path::new("dir/report.pdf.enc")).expect("strip"),
            PathBuf::from("dir/report.pdf")
        );
        for bad in ["dir/report.pdf", "dir/.enc", "report.enc.bak"] {
            let err = decrypted_path(Path::new(bad)).expect_err("no suffix");
            assert!(matches!(err, CipherError::InvalidFileName { .. }));
        }
    }

    #[cfg(unix)]
    #[test]
    fn non_utf8_names_keep_their_stem() {
        use std::os::unix::ffi::OsStrExt;

        let src = Path::new(OsStr::from_bytes(b"dir/r\xffport.enc"));
        assert_eq!(
            decrypted_path(src).expect("strip"),
            Path::new(OsStr::from_bytes(b"dir/r\xffport"))
        );

        let err = decrypted_path(Path::new(OsStr::from_bytes(b"dir/r\xffport")))
            .expect_err("no suffix");
        assert!(matches!(err, CipherError::InvalidFileName { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn outputs_keep_source_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().expect("tempdir");
        let src = dir.path().join("shared.txt");
        fs::write(&src, b"hello").expect("write plaintext");
        fs::set_permissions(&src, fs::Permissions::from_mode(0o644)).expect("chmod");
        let key = key(12);

        let enc = encrypt_file(&src, &key).expect("encrypt file");
        let mode = |p: &Path| fs::metadata(p).expect("meta").permissions().mode() & 0o777;
        assert_eq!(mode(&enc), 0o644);

        fs::remove_file(&src).expect("remove plaintext");
        fs::set_permissions(&enc, fs::Permissions::from_mode(0o640)).expect("chmod");
        let dec = decrypt_file(&enc, &key).expect("decrypt file");
        assert_eq!(mode(&dec), 0o640);
    }

    #[test]
    fn file_round_trip_writes_expected_sizes() {
        let dir = tempfile::tempdir().expect("tempdir");
        let src = dir.path().join("hello.txt");
        fs::write(&src, b"hello").expect("write plaintext");
        let key = key(8);

        let enc = encrypt_file(&src, &key).expect("encrypt file");
        assert_eq!(enc, dir.path().join("hello.txt.enc"));
        assert_eq!(fs::read(&enc).expect("read blob").len(), 33);

        fs::remove_file(&src).expect("remove plaintext");
        let dec = decrypt_file(&enc, &key).expect("decrypt file");
        assert_eq!(dec, src);
        assert_eq!(fs::read(&dec).expect("read plaintext"), b"hello");
    }

    #[test]
    fn failed_decrypt_writes_no_output() {
        let dir = tempfile::tempdir().expect("tempdir");
        let src = dir.path().join("secret.txt");
        fs::write(&src, b"hello").expect("write plaintext");
        let enc = encrypt_file(&src, &key(9)).expect("encrypt file");
        fs::remove_file(&src).expect("remove plaintext");

        let err = decrypt_file(&enc, &key(10)).expect_err("wrong key");
        assert!(matches!(err, CipherError::Authentication));
        assert!(!src.exists());
    }

    #[test]
    fn missing_source_is_an_io_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = encrypt_file(&dir.path().join("absent"), &key(11)).expect_err("missing");
        assert!(matches!(err, CipherError::Io(ref e) if e.kind() == io::ErrorKind::NotFound));
    }
}
