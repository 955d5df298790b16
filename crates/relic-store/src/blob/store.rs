//! Blob store implementation.
//!
//! Blobs live under `<root>/blobs/sha256/<first-2-hex>/<64-hex>`. Writes go
//! through a temp file in the destination directory and are renamed into
//! place, so a partially-written blob is never visible under its digest.

use camino::{Utf8Path, Utf8PathBuf};
use relic_core::error::RelicError;
use relic_core::utils::hash::{digest_bytes, digest_file};
use relic_core::Digest;
use serde::Serialize;
use sha2::{Digest as _, Sha256};
use std::fs::{self, File};
use std::io::{Read, Write};
use tempfile::NamedTempFile;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::StoreResult;

/// How a blob entered the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutOutcome {
    /// Content digest of the stored blob
    pub digest: Digest,
    /// Size of the blob in bytes
    pub size_bytes: u64,
    /// Whether the source file was hardlinked into the store (vs copied)
    pub hardlinked: bool,
    /// Whether a blob with this digest already existed
    pub deduped: bool,
}

/// Which strategy `materialize` succeeded with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Materialized {
    Hardlinked,
    Copied,
}

impl Materialized {
    pub fn is_hardlink(&self) -> bool {
        matches!(self, Materialized::Hardlinked)
    }
}

/// Content-addressable blob storage rooted at one store directory
#[derive(Debug)]
pub struct BlobStore {
    /// Directory holding the digest-addressed tree (`<store_root>/blobs/sha256`)
    blobs_root: Utf8PathBuf,
}

impl BlobStore {
    /// Open (and create if needed) the blob area under a store root
    pub fn new(store_root: &Utf8Path) -> StoreResult<Self> {
        let blobs_root = store_root.join("blobs").join("sha256");
        fs::create_dir_all(&blobs_root)
            .map_err(|e| RelicError::io("Failed to create blob directory", e))?;
        Ok(Self { blobs_root })
    }

    /// On-disk path for a digest
    pub fn blob_path(&self, digest: &Digest) -> Utf8PathBuf {
        let hex = digest.to_hex();
        self.blobs_root.join(&hex[0..2]).join(&hex)
    }

    /// Whether a blob with this digest is present
    pub fn exists(&self, digest: &Digest) -> bool {
        self.blob_path(digest).exists()
    }

    /// Size in bytes of a stored blob
    pub fn size(&self, digest: &Digest) -> StoreResult<u64> {
        let path = self.blob_path(digest);
        match fs::metadata(&path) {
            Ok(md) => Ok(md.len()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(RelicError::BlobNotFound {
                    digest: digest.to_hex(),
                })
            }
            Err(e) => Err(RelicError::io(format!("Failed to stat blob {}", digest), e)),
        }
    }

    /// Store a byte slice, returning its digest.
    ///
    /// Idempotent: identical content converges on one file.
    pub fn put_bytes(&self, content: &[u8]) -> StoreResult<Digest> {
        let digest = digest_bytes(content);
        let path = self.blob_path(&digest);
        if path.exists() {
            return Ok(digest);
        }

        let parent = self.ensure_parent(&path)?;
        let mut tmp = NamedTempFile::new_in(parent)
            .map_err(|e| RelicError::io("Failed to create temp blob", e))?;
        tmp.write_all(content)
            .map_err(|e| RelicError::io("Failed to write temp blob", e))?;
        tmp.persist(&path)
            .map_err(|e| RelicError::io(format!("Failed to place blob {}", digest), e.error))?;

        Ok(digest)
    }

    /// Store an existing file, preferring a hardlink over a byte copy.
    ///
    /// The file is hashed first; if the digest already exists the content is
    /// not rewritten. The copy fallback re-hashes the bytes actually written
    /// and fails with `DigestMismatch` if they no longer match.
    pub fn put_file(&self, src: &Utf8Path) -> StoreResult<PutOutcome> {
        let md = fs::metadata(src).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => RelicError::SourceNotFound {
                path: src.to_string(),
            },
            _ => RelicError::io(format!("Failed to stat {}", src), e),
        })?;
        let size_bytes = md.len();
        let digest = digest_file(src)?;
        let path = self.blob_path(&digest);

        if path.exists() {
            return Ok(PutOutcome {
                digest,
                size_bytes,
                hardlinked: false,
                deduped: true,
            });
        }

        self.ensure_parent(&path)?;

        // Hardlinking to the final path is atomic on its own: it either
        // creates the link or fails because a concurrent writer won.
        match fs::hard_link(src, &path) {
            Ok(()) => {
                return Ok(PutOutcome {
                    digest,
                    size_bytes,
                    hardlinked: true,
                    deduped: false,
                });
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                return Ok(PutOutcome {
                    digest,
                    size_bytes,
                    hardlinked: false,
                    deduped: true,
                });
            }
            Err(e) => {
                debug!(src = %src, error = %e, "hardlink into store failed, copying");
            }
        }

        self.copy_verified(src, &path, &digest)?;
        Ok(PutOutcome {
            digest,
            size_bytes,
            hardlinked: false,
            deduped: false,
        })
    }

    /// Materialize a blob at `dest`, replacing whatever is there.
    pub fn materialize(&self, digest: &Digest, dest: &Utf8Path) -> StoreResult<Materialized> {
        let path = self.blob_path(digest);
        if !path.exists() {
            return Err(RelicError::BlobNotFound {
                digest: digest.to_hex(),
            });
        }

        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| RelicError::io("Failed to create destination directory", e))?;
        }
        match fs::remove_file(dest) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(RelicError::io(
                    format!("Failed to replace {}", dest),
                    e,
                ))
            }
        }

        match fs::hard_link(&path, dest) {
            Ok(()) => Ok(Materialized::Hardlinked),
            Err(e) => {
                debug!(dest = %dest, error = %e, "hardlink failed, falling back to copy");
                fs::copy(&path, dest)
                    .map_err(|e| RelicError::io(format!("Failed to copy blob to {}", dest), e))?;
                Ok(Materialized::Copied)
            }
        }
    }

    /// Remove a blob file. Absence is not an error; returns bytes freed.
    pub fn delete(&self, digest: &Digest) -> StoreResult<u64> {
        let path = self.blob_path(digest);
        let size = match fs::metadata(&path) {
            Ok(md) => md.len(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(digest = %digest, "blob already absent");
                return Ok(0);
            }
            Err(e) => return Err(RelicError::io(format!("Failed to stat blob {}", digest), e)),
        };

        fs::remove_file(&path)
            .map_err(|e| RelicError::io(format!("Failed to remove blob {}", digest), e))?;

        // Drop the two-level prefix directory if it emptied out.
        if let Some(parent) = path.parent() {
            let _ = fs::remove_dir(parent);
        }

        Ok(size)
    }

    /// Remove temp files orphaned by interrupted puts.
    ///
    /// Only safe while no put can be in flight; `ArtifactStore::gc` calls
    /// this under the exclusive sweep lock.
    pub fn remove_stale_temp_files(&self) -> StoreResult<u64> {
        let mut removed = 0u64;
        for entry in WalkDir::new(&self.blobs_root) {
            let entry = entry.map_err(|e| {
                RelicError::io(
                    "Failed to walk blob directory",
                    std::io::Error::new(std::io::ErrorKind::Other, e.to_string()),
                )
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            if !entry.file_name().to_string_lossy().starts_with('.') {
                continue;
            }
            match fs::remove_file(entry.path()) {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    warn!(path = %entry.path().display(), error = %e, "failed to remove stale temp file");
                }
            }
        }
        Ok(removed)
    }

    /// Enumerate every blob digest currently on disk
    pub fn iter_digests(&self) -> StoreResult<Vec<Digest>> {
        let mut digests = vec![];
        for entry in WalkDir::new(&self.blobs_root) {
            let entry = entry.map_err(|e| {
                RelicError::io(
                    "Failed to walk blob directory",
                    std::io::Error::new(std::io::ErrorKind::Other, e.to_string()),
                )
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy();
            if name.starts_with('.') {
                // In-flight temp file from a concurrent put.
                continue;
            }
            match Digest::from_hex(&name) {
                Ok(d) => digests.push(d),
                Err(_) => {
                    warn!(path = %entry.path().display(), "unexpected file in blob area");
                }
            }
        }
        Ok(digests)
    }

    fn ensure_parent<'a>(&'a self, path: &'a Utf8Path) -> StoreResult<&'a Utf8Path> {
        let parent = path.parent().unwrap_or(&self.blobs_root);
        fs::create_dir_all(parent)
            .map_err(|e| RelicError::io("Failed to create blob prefix directory", e))?;
        Ok(parent)
    }

    fn copy_verified(&self, src: &Utf8Path, path: &Utf8Path, expected: &Digest) -> StoreResult<()> {
        let parent = path.parent().unwrap_or(&self.blobs_root);
        let mut tmp = NamedTempFile::new_in(parent)
            .map_err(|e| RelicError::io("Failed to create temp blob", e))?;

        let mut file = File::open(src)
            .map_err(|e| RelicError::io(format!("Failed to open {}", src), e))?;
        let mut hasher = Sha256::new();
        let mut buf = vec![0u8; 1024 * 1024];
        loop {
            let n = file
                .read(&mut buf)
                .map_err(|e| RelicError::io(format!("Failed to read {}", src), e))?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
            tmp.write_all(&buf[..n])
                .map_err(|e| RelicError::io("Failed to write temp blob", e))?;
        }

        let actual = Digest::new(hasher.finalize().into());
        if actual != *expected {
            return Err(RelicError::DigestMismatch {
                expected: expected.to_hex(),
                actual: actual.to_hex(),
            });
        }

        tmp.persist(path)
            .map_err(|e| RelicError::io(format!("Failed to place blob {}", expected), e.error))?;
        Ok(())
    }
}
