//! Entry index persistence and queries.
//!
//! `EntryIndex` performs no locking of its own; `ArtifactStore` serializes
//! writers per kind and gates GC store-wide (see `locks`).

use camino::{Utf8Path, Utf8PathBuf};
use relic_core::error::RelicError;
use relic_core::utils::hash::digest_bytes;
use relic_core::utils::now_unix;
use relic_core::Digest;
use std::collections::HashSet;
use std::fs;
use std::io::Write;
use tempfile::NamedTempFile;
use tracing::warn;

use super::IndexEntry;
use crate::StoreResult;

/// Per-kind ordered index of entries, persisted as one JSON file per entry
#[derive(Debug)]
pub struct EntryIndex {
    /// `<store_root>/index`
    root: Utf8PathBuf,
}

impl EntryIndex {
    /// Open (and create if needed) the index area under a store root
    pub fn new(store_root: &Utf8Path) -> StoreResult<Self> {
        let root = store_root.join("index");
        fs::create_dir_all(&root)
            .map_err(|e| RelicError::io("Failed to create index directory", e))?;
        Ok(Self { root })
    }

    fn kind_dir(&self, kind: &str) -> StoreResult<Utf8PathBuf> {
        validate_kind(kind)?;
        Ok(self.root.join(kind))
    }

    // Input keys are opaque strings; the filename is the sha256 of the key
    // so any key is representable on disk. The full key lives in the JSON.
    fn entry_path(&self, kind: &str, input_key: &str) -> StoreResult<Utf8PathBuf> {
        let dir = self.kind_dir(kind)?;
        let name = digest_bytes(input_key.as_bytes()).to_hex();
        Ok(dir.join(format!("{}.json", name)))
    }

    /// Insert or replace the entry for (kind, input_key).
    ///
    /// `stored_at_unix` is bumped to the kind's previous maximum plus one
    /// whenever the wall clock regressed, keeping recency ordering intact.
    pub fn upsert(&self, entry: &mut IndexEntry) -> StoreResult<()> {
        let dir = self.kind_dir(&entry.kind)?;
        let path = self.entry_path(&entry.kind, &entry.input_key)?;
        fs::create_dir_all(&dir)
            .map_err(|e| RelicError::io("Failed to create kind directory", e))?;

        let prev_max = self.max_stored_at(&entry.kind)?;
        if entry.stored_at_unix <= prev_max {
            entry.stored_at_unix = prev_max + 1;
        }

        let json = serde_json::to_string_pretty(entry).map_err(|e| {
            RelicError::io(
                "Failed to serialize index entry",
                std::io::Error::new(std::io::ErrorKind::Other, e.to_string()),
            )
        })?;

        let mut tmp = NamedTempFile::new_in(&dir)
            .map_err(|e| RelicError::io("Failed to create temp index entry", e))?;
        tmp.write_all(json.as_bytes())
            .map_err(|e| RelicError::io("Failed to write temp index entry", e))?;
        tmp.persist(&path)
            .map_err(|e| RelicError::io("Failed to place index entry", e.error))?;

        Ok(())
    }

    /// Look up the entry for (kind, input_key)
    pub fn lookup(&self, kind: &str, input_key: &str) -> StoreResult<Option<IndexEntry>> {
        let path = self.entry_path(kind, input_key)?;
        match fs::read_to_string(&path) {
            Ok(json) => Ok(Some(parse_entry(&path, &json)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(RelicError::io(format!("Failed to read {}", path), e)),
        }
    }

    /// All live entries for a kind, most recent first
    pub fn list_kind(&self, kind: &str) -> StoreResult<Vec<IndexEntry>> {
        let dir = self.kind_dir(kind)?;
        let mut entries = vec![];
        let read = match fs::read_dir(&dir) {
            Ok(read) => read,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(entries),
            Err(e) => return Err(RelicError::io(format!("Failed to read {}", dir), e)),
        };

        for ent in read {
            let ent = ent.map_err(|e| RelicError::io("Failed to read kind directory", e))?;
            let path = ent.path();
            if path.extension().and_then(|s| s.to_str()) != Some("json") {
                continue;
            }
            match fs::read_to_string(&path) {
                Ok(json) => match serde_json::from_str::<IndexEntry>(&json) {
                    Ok(entry) => entries.push(entry),
                    Err(e) => {
                        // Keep listings available even when one entry rots.
                        warn!(path = %path.display(), error = %e, "skipping malformed index entry");
                    }
                },
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "skipping unreadable index entry");
                }
            }
        }

        entries.sort_by(|a, b| {
            b.stored_at_unix
                .cmp(&a.stored_at_unix)
                .then_with(|| a.input_key.cmp(&b.input_key))
        });
        Ok(entries)
    }

    /// Paginated listing, most recent first. A limit past the end returns
    /// the remainder; an offset past the end returns an empty page.
    pub fn list(&self, kind: &str, offset: usize, limit: usize) -> StoreResult<Vec<IndexEntry>> {
        let all = self.list_kind(kind)?;
        Ok(all.into_iter().skip(offset).take(limit).collect())
    }

    /// Remove the entry for (kind, input_key); absent keys are a no-op
    pub fn delete(&self, kind: &str, input_key: &str) -> StoreResult<bool> {
        let path = self.entry_path(kind, input_key)?;
        match fs::remove_file(&path) {
            Ok(()) => {
                if let Some(parent) = path.parent() {
                    let _ = fs::remove_dir(parent);
                }
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(RelicError::io(format!("Failed to remove {}", path), e)),
        }
    }

    /// All known kinds, sorted
    pub fn kinds(&self) -> StoreResult<Vec<String>> {
        let mut kinds = vec![];
        let read = match fs::read_dir(&self.root) {
            Ok(read) => read,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(kinds),
            Err(e) => return Err(RelicError::io("Failed to read index directory", e)),
        };
        for ent in read {
            let ent = ent.map_err(|e| RelicError::io("Failed to read index directory", e))?;
            if !ent.path().is_dir() {
                continue;
            }
            if let Some(name) = ent.path().file_name().and_then(|s| s.to_str()) {
                kinds.push(name.to_string());
            }
        }
        kinds.sort();
        Ok(kinds)
    }

    /// Union of blob digests across every kind's live entries
    pub fn all_referenced_digests(&self) -> StoreResult<HashSet<Digest>> {
        let mut digests = HashSet::new();
        for kind in self.kinds()? {
            for entry in self.list_kind(&kind)? {
                digests.insert(entry.blob_sha256);
            }
        }
        Ok(digests)
    }

    /// Total number of live entries across all kinds
    pub fn count(&self) -> StoreResult<u64> {
        let mut total = 0u64;
        for kind in self.kinds()? {
            total += self.list_kind(&kind)?.len() as u64;
        }
        Ok(total)
    }

    fn max_stored_at(&self, kind: &str) -> StoreResult<i64> {
        Ok(self
            .list_kind(kind)?
            .first()
            .map(|e| e.stored_at_unix)
            .unwrap_or(0))
    }
}

/// Build a fresh entry stamped with the current wall clock
pub(crate) fn new_entry(
    kind: &str,
    input_key: &str,
    blob_sha256: Digest,
    format: String,
    size_bytes: u64,
    hardlinked: bool,
    meta: std::collections::BTreeMap<String, serde_json::Value>,
) -> IndexEntry {
    IndexEntry {
        kind: kind.to_string(),
        input_key: input_key.to_string(),
        blob_sha256,
        format,
        size_bytes,
        stored_at_unix: now_unix(),
        hardlinked,
        meta,
    }
}

fn parse_entry(path: &Utf8Path, json: &str) -> StoreResult<IndexEntry> {
    serde_json::from_str(json).map_err(|e| RelicError::IndexCorrupt {
        path: path.to_string(),
        message: e.to_string(),
    })
}

fn validate_kind(kind: &str) -> StoreResult<()> {
    if kind.is_empty() {
        return Err(RelicError::invalid_argument("kind must not be empty"));
    }
    let ok = kind
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
    if !ok {
        return Err(RelicError::invalid_argument(format!(
            "kind '{}' contains unsupported characters",
            kind
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use tempfile::tempdir;

    fn open_index(dir: &tempfile::TempDir) -> EntryIndex {
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        EntryIndex::new(&root).unwrap()
    }

    fn entry(kind: &str, key: &str, content: &[u8], stored_at: i64) -> IndexEntry {
        IndexEntry {
            kind: kind.to_string(),
            input_key: key.to_string(),
            blob_sha256: digest_bytes(content),
            format: "bin".to_string(),
            size_bytes: content.len() as u64,
            stored_at_unix: stored_at,
            hardlinked: false,
            meta: BTreeMap::new(),
        }
    }

    #[test]
    fn test_upsert_and_lookup() {
        let dir = tempdir().unwrap();
        let index = open_index(&dir);

        let mut e = entry("iso", "k1", b"x", now_unix());
        index.upsert(&mut e).unwrap();

        let found = index.lookup("iso", "k1").unwrap().unwrap();
        assert_eq!(found, e);
        assert!(index.lookup("iso", "other").unwrap().is_none());
    }

    #[test]
    fn test_upsert_replaces_not_duplicates() {
        let dir = tempdir().unwrap();
        let index = open_index(&dir);

        let mut first = entry("iso", "k1", b"old", now_unix());
        index.upsert(&mut first).unwrap();
        let mut second = entry("iso", "k1", b"new", now_unix());
        index.upsert(&mut second).unwrap();

        let all = index.list_kind("iso").unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].blob_sha256, digest_bytes(b"new"));
    }

    #[test]
    fn test_stored_at_clamped_on_clock_regression() {
        let dir = tempdir().unwrap();
        let index = open_index(&dir);

        let mut first = entry("iso", "k1", b"a", 2_000_000_000);
        index.upsert(&mut first).unwrap();
        assert_eq!(first.stored_at_unix, 2_000_000_000);

        // Wall clock "regressed": the stored value still moves forward.
        let mut second = entry("iso", "k2", b"b", 1_000_000_000);
        index.upsert(&mut second).unwrap();
        assert_eq!(second.stored_at_unix, 2_000_000_001);
    }

    #[test]
    fn test_list_pagination() {
        let dir = tempdir().unwrap();
        let index = open_index(&dir);

        for i in 0..5 {
            let mut e = entry("iso", &format!("k{}", i), format!("c{}", i).as_bytes(), 100 + i);
            index.upsert(&mut e).unwrap();
        }

        let page = index.list("iso", 0, 2).unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].input_key, "k4"); // most recent first
        assert_eq!(page[1].input_key, "k3");

        // limit 0: empty page
        assert!(index.list("iso", 0, 0).unwrap().is_empty());
        // offset beyond the count: empty page, no error
        assert!(index.list("iso", 99, 10).unwrap().is_empty());
        // limit beyond the remainder: returns what is left
        assert_eq!(index.list("iso", 3, 10).unwrap().len(), 2);
    }

    #[test]
    fn test_list_unknown_kind_is_empty() {
        let dir = tempdir().unwrap();
        let index = open_index(&dir);
        assert!(index.list("nope", 0, 10).unwrap().is_empty());
    }

    #[test]
    fn test_delete_is_noop_when_absent() {
        let dir = tempdir().unwrap();
        let index = open_index(&dir);

        let mut e = entry("iso", "k1", b"x", now_unix());
        index.upsert(&mut e).unwrap();

        assert!(index.delete("iso", "k1").unwrap());
        assert!(!index.delete("iso", "k1").unwrap());
        assert!(index.lookup("iso", "k1").unwrap().is_none());
    }

    #[test]
    fn test_referenced_digests_union_across_kinds() {
        let dir = tempdir().unwrap();
        let index = open_index(&dir);

        // Two kinds, three keys, two distinct contents.
        index.upsert(&mut entry("iso", "k1", b"shared", 1)).unwrap();
        index
            .upsert(&mut entry("rootfs", "k2", b"shared", 2))
            .unwrap();
        index
            .upsert(&mut entry("rootfs", "k3", b"unique", 3))
            .unwrap();

        let refs = index.all_referenced_digests().unwrap();
        assert_eq!(refs.len(), 2);
        assert!(refs.contains(&digest_bytes(b"shared")));
        assert!(refs.contains(&digest_bytes(b"unique")));

        assert_eq!(index.count().unwrap(), 3);
        assert_eq!(index.kinds().unwrap(), vec!["iso", "rootfs"]);
    }

    #[test]
    fn test_lookup_surfaces_corruption() {
        let dir = tempdir().unwrap();
        let index = open_index(&dir);

        let mut e = entry("iso", "k1", b"x", now_unix());
        index.upsert(&mut e).unwrap();

        // Corrupt the persisted entry behind the index's back.
        let path = index.entry_path("iso", "k1").unwrap();
        fs::write(&path, b"{ not json").unwrap();

        let err = index.lookup("iso", "k1").unwrap_err();
        assert!(matches!(err, RelicError::IndexCorrupt { .. }));
    }

    #[test]
    fn test_invalid_kind_rejected() {
        let dir = tempdir().unwrap();
        let index = open_index(&dir);

        assert!(matches!(
            index.lookup("", "k").unwrap_err(),
            RelicError::InvalidArgument { .. }
        ));
        assert!(matches!(
            index.lookup("../escape", "k").unwrap_err(),
            RelicError::InvalidArgument { .. }
        ));
    }
}
