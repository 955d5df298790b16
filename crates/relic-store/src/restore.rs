//! Restoring stored artifacts into a workspace.
//!
//! The input-key ("fingerprint") computation is a pluggable dependency:
//! ingest and restore must use the identical function over the same inputs
//! or restore will never match a freshly built artifact. The provided
//! `KeyFiles` fingerprinter reads the `.{name}-inputs.hash` key files the
//! build system leaves next to its outputs.

use camino::{Utf8Path, Utf8PathBuf};
use relic_core::error::RelicError;
use relic_core::utils::hash::digest_bytes;
use std::fs;
use tracing::info;

use crate::blob::Materialized;
use crate::store::ArtifactStore;
use crate::StoreResult;

/// Computes the current input key for an artifact.
///
/// Implementations must be deterministic and stable across process
/// restarts. `Ok(None)` means the key cannot be computed yet (e.g. the
/// build has not produced its key files).
pub trait Fingerprinter: Send + Sync {
    fn input_key(&self) -> StoreResult<Option<String>>;
}

/// Read one key file: first whitespace-delimited token, or `None` when the
/// file is missing or blank
pub fn read_key_file(path: &Utf8Path) -> StoreResult<Option<String>> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(RelicError::io(format!("Failed to read {}", path), e)),
    };
    Ok(raw.split_whitespace().next().map(|s| s.to_string()))
}

/// Fingerprinter over one or more key files.
///
/// One file: its key verbatim. Several files: the sha256 of the
/// newline-joined keys, so composite artifacts (an ISO built from kernel,
/// rootfs, and initramfs) change key when any constituent does. All files
/// must be present; otherwise there is no key.
#[derive(Debug, Clone)]
pub struct KeyFiles {
    files: Vec<Utf8PathBuf>,
}

impl KeyFiles {
    pub fn new(files: Vec<Utf8PathBuf>) -> Self {
        Self { files }
    }
}

impl Fingerprinter for KeyFiles {
    fn input_key(&self) -> StoreResult<Option<String>> {
        if self.files.is_empty() {
            return Ok(None);
        }

        let mut keys = Vec::with_capacity(self.files.len());
        for file in &self.files {
            match read_key_file(file)? {
                Some(key) => keys.push(key),
                None => return Ok(None),
            }
        }

        if keys.len() == 1 {
            return Ok(Some(keys.remove(0)));
        }
        Ok(Some(digest_bytes(keys.join("\n").as_bytes()).to_hex()))
    }
}

impl ArtifactStore {
    /// Materialize the stored artifact for (kind, input_key) at `dest`.
    ///
    /// An existing destination file is overwritten: restore is idempotent
    /// and destructive toward stale local state.
    pub fn restore(
        &self,
        kind: &str,
        input_key: &str,
        dest: &Utf8Path,
    ) -> StoreResult<Materialized> {
        let _sweep = self.locks.sweep_shared()?;
        let kind_lock = self.locks.kind(kind);
        let _k = kind_lock.read();

        let Some(entry) = self.index.lookup(kind, input_key)? else {
            return Err(RelicError::EntryNotFound {
                kind: kind.to_string(),
                input_key: input_key.to_string(),
            });
        };

        let how = self.blobs.materialize(&entry.blob_sha256, dest)?;
        info!(kind, input_key, dest = %dest, ?how, "restored artifact");
        Ok(how)
    }

    /// Restore whatever matches the artifact's *current* input key
    pub fn restore_current(
        &self,
        kind: &str,
        fingerprint: &dyn Fingerprinter,
        dest: &Utf8Path,
    ) -> StoreResult<Materialized> {
        let Some(key) = fingerprint.input_key()? else {
            return Err(RelicError::EntryNotFound {
                kind: kind.to_string(),
                input_key: "(input key unavailable)".to_string(),
            });
        };
        self.restore(kind, &key, dest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::tests::{open_store, request, write_source};
    use relic_core::utils::hash::digest_file;
    use tempfile::tempdir;

    #[test]
    fn test_restore_round_trip() {
        let dir = tempdir().unwrap();
        let store = open_store(&dir);

        let src = write_source(&dir, "a.bin", b"round trip");
        let entry = store.ingest_file(&request("iso", "k1", src)).unwrap();

        let dest = Utf8PathBuf::from_path_buf(dir.path().join("ws/a.bin")).unwrap();
        store.restore("iso", "k1", &dest).unwrap();

        assert_eq!(digest_file(&dest).unwrap(), entry.blob_sha256);
    }

    #[test]
    fn test_restore_overwrites_stale_state() {
        let dir = tempdir().unwrap();
        let store = open_store(&dir);

        let src = write_source(&dir, "a.bin", b"wanted");
        store.ingest_file(&request("iso", "k1", src)).unwrap();

        let dest = write_source(&dir, "stale.bin", b"stale");
        store.restore("iso", "k1", &dest).unwrap();
        assert_eq!(fs::read(&dest).unwrap(), b"wanted");
    }

    #[test]
    fn test_restore_unknown_key_is_entry_not_found() {
        let dir = tempdir().unwrap();
        let store = open_store(&dir);

        let dest = Utf8PathBuf::from_path_buf(dir.path().join("x")).unwrap();
        let err = store.restore("iso", "never-ingested", &dest).unwrap_err();
        assert!(matches!(err, RelicError::EntryNotFound { .. }));
    }

    #[test]
    fn test_key_file_reading() {
        let dir = tempdir().unwrap();
        let file = write_source(&dir, ".rootfs-inputs.hash", b"abc123  trailing\n");
        assert_eq!(read_key_file(&file).unwrap().as_deref(), Some("abc123"));

        let missing = Utf8PathBuf::from_path_buf(dir.path().join("nope")).unwrap();
        assert_eq!(read_key_file(&missing).unwrap(), None);

        let blank = write_source(&dir, "blank.hash", b"   \n");
        assert_eq!(read_key_file(&blank).unwrap(), None);
    }

    #[test]
    fn test_key_files_single_passthrough() {
        let dir = tempdir().unwrap();
        let file = write_source(&dir, "k.hash", b"deadbeef\n");
        let fp = KeyFiles::new(vec![file]);
        assert_eq!(fp.input_key().unwrap().as_deref(), Some("deadbeef"));
    }

    #[test]
    fn test_key_files_combined_is_deterministic() {
        let dir = tempdir().unwrap();
        let a = write_source(&dir, "a.hash", b"k1\n");
        let b = write_source(&dir, "b.hash", b"k2\n");

        let fp = KeyFiles::new(vec![a.clone(), b.clone()]);
        let key1 = fp.input_key().unwrap().unwrap();
        let key2 = fp.input_key().unwrap().unwrap();
        assert_eq!(key1, key2);
        assert_eq!(key1, digest_bytes(b"k1\nk2").to_hex());

        // A missing constituent means no key at all.
        let missing = Utf8PathBuf::from_path_buf(dir.path().join("c.hash")).unwrap();
        let fp = KeyFiles::new(vec![a, missing]);
        assert_eq!(fp.input_key().unwrap(), None);
    }

    #[test]
    fn test_restore_current_uses_fingerprint() {
        let dir = tempdir().unwrap();
        let store = open_store(&dir);

        let key_file = write_source(&dir, ".iso-inputs.hash", b"currentkey\n");
        let src = write_source(&dir, "distro.iso", b"iso bytes");
        store
            .ingest_file(&request("iso", "currentkey", src))
            .unwrap();

        let fp = KeyFiles::new(vec![key_file]);
        let dest = Utf8PathBuf::from_path_buf(dir.path().join("out/distro.iso")).unwrap();
        store.restore_current("iso", &fp, &dest).unwrap();
        assert_eq!(fs::read(&dest).unwrap(), b"iso bytes");
    }

    #[test]
    fn test_restore_current_without_key() {
        let dir = tempdir().unwrap();
        let store = open_store(&dir);

        let missing = Utf8PathBuf::from_path_buf(dir.path().join("nope.hash")).unwrap();
        let fp = KeyFiles::new(vec![missing]);
        let dest = Utf8PathBuf::from_path_buf(dir.path().join("x")).unwrap();
        let err = store.restore_current("iso", &fp, &dest).unwrap_err();
        assert!(matches!(err, RelicError::EntryNotFound { .. }));
    }
}
