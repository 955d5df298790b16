//! The `ArtifactStore` facade.
//!
//! Owns the blob area, the entry index, and the locks; every public
//! operation routes through here so the locking discipline lives in one
//! place. Ingest, restore, GC, and prune are implemented in their own
//! modules as further `impl ArtifactStore` blocks.

use camino::{Utf8Path, Utf8PathBuf};
use relic_core::error::RelicError;
use relic_core::Digest;
use serde::Serialize;
use std::collections::HashSet;
use std::fs;

use crate::blob::BlobStore;
use crate::index::{EntryIndex, IndexEntry};
use crate::locks::StoreLocks;
use crate::StoreResult;

/// Content-addressable artifact store rooted at one directory
#[derive(Debug)]
pub struct ArtifactStore {
    root: Utf8PathBuf,
    pub(crate) blobs: BlobStore,
    pub(crate) index: EntryIndex,
    pub(crate) locks: StoreLocks,
}

/// Store-wide counters for the status surface
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreStatus {
    pub root: Utf8PathBuf,
    pub index_entries: u64,
    pub referenced_blobs: u64,
    pub referenced_bytes: u64,
}

impl ArtifactStore {
    /// Open (and create if needed) a store at `root`
    pub fn open(root: impl AsRef<Utf8Path>) -> StoreResult<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)
            .map_err(|e| RelicError::io("Failed to create store root", e))?;
        let blobs = BlobStore::new(&root)?;
        let index = EntryIndex::new(&root)?;
        let locks = StoreLocks::new(&root);
        Ok(Self {
            root,
            blobs,
            index,
            locks,
        })
    }

    /// The store root directory
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// On-disk path of a blob (for download/export surfaces)
    pub fn blob_path(&self, digest: &Digest) -> Utf8PathBuf {
        self.blobs.blob_path(digest)
    }

    /// Whether a blob with this digest is present
    pub fn blob_exists(&self, digest: &Digest) -> bool {
        self.blobs.exists(digest)
    }

    /// Look up the entry for (kind, input_key)
    pub fn get(&self, kind: &str, input_key: &str) -> StoreResult<Option<IndexEntry>> {
        let kind_lock = self.locks.kind(kind);
        let _k = kind_lock.read();
        self.index.lookup(kind, input_key)
    }

    /// Paginated entry listing for a kind, most recent first
    pub fn list_kind(
        &self,
        kind: &str,
        offset: usize,
        limit: usize,
    ) -> StoreResult<Vec<IndexEntry>> {
        let kind_lock = self.locks.kind(kind);
        let _k = kind_lock.read();
        self.index.list(kind, offset, limit)
    }

    /// All known artifact kinds
    pub fn kinds(&self) -> StoreResult<Vec<String>> {
        self.index.kinds()
    }

    /// Remove one entry from the index. The blob stays until a GC pass
    /// finds it unreferenced.
    pub fn remove_entry(&self, kind: &str, input_key: &str) -> StoreResult<bool> {
        let _sweep = self.locks.sweep_shared()?;
        let kind_lock = self.locks.kind(kind);
        let _k = kind_lock.write();
        self.index.delete(kind, input_key)
    }

    /// Store-wide counters: entries, referenced blobs, referenced bytes
    pub fn status(&self) -> StoreResult<StoreStatus> {
        let mut index_entries = 0u64;
        let mut seen: HashSet<Digest> = HashSet::new();
        let mut referenced_bytes = 0u64;

        for kind in self.index.kinds()? {
            for entry in self.index.list_kind(&kind)? {
                index_entries += 1;
                if seen.insert(entry.blob_sha256) {
                    referenced_bytes += entry.size_bytes;
                }
            }
        }

        Ok(StoreStatus {
            root: self.root.clone(),
            index_entries,
            referenced_blobs: seen.len() as u64,
            referenced_bytes,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::ingest::IngestRequest;
    use std::collections::BTreeMap;
    use tempfile::tempdir;

    pub(crate) fn open_store(dir: &tempfile::TempDir) -> ArtifactStore {
        let root = Utf8PathBuf::from_path_buf(dir.path().join("store")).unwrap();
        ArtifactStore::open(&root).unwrap()
    }

    pub(crate) fn write_source(
        dir: &tempfile::TempDir,
        name: &str,
        content: &[u8],
    ) -> Utf8PathBuf {
        let path = Utf8PathBuf::from_path_buf(dir.path().join(name)).unwrap();
        fs::write(&path, content).unwrap();
        path
    }

    pub(crate) fn request(kind: &str, key: &str, source: Utf8PathBuf) -> IngestRequest {
        IngestRequest {
            kind: kind.to_string(),
            input_key: key.to_string(),
            source,
            format: None,
            meta: BTreeMap::new(),
        }
    }

    #[test]
    fn test_open_creates_layout() {
        let dir = tempdir().unwrap();
        let store = open_store(&dir);
        assert!(store.root().join("blobs/sha256").is_dir());
        assert!(store.root().join("index").is_dir());
    }

    #[test]
    fn test_status_counts_unique_blobs() {
        let dir = tempdir().unwrap();
        let store = open_store(&dir);

        let src = write_source(&dir, "a.bin", b"same content");
        store.ingest_file(&request("iso", "k1", src.clone())).unwrap();
        store.ingest_file(&request("iso", "k2", src)).unwrap();

        let status = store.status().unwrap();
        assert_eq!(status.index_entries, 2);
        assert_eq!(status.referenced_blobs, 1); // dedup
        assert_eq!(status.referenced_bytes, 12);
    }

    #[test]
    fn test_remove_entry_leaves_blob() {
        let dir = tempdir().unwrap();
        let store = open_store(&dir);

        let src = write_source(&dir, "a.bin", b"content");
        let entry = store.ingest_file(&request("iso", "k1", src)).unwrap();

        assert!(store.remove_entry("iso", "k1").unwrap());
        assert!(store.get("iso", "k1").unwrap().is_none());
        // Blob survives until GC.
        assert!(store.blob_exists(&entry.blob_sha256));
    }
}
