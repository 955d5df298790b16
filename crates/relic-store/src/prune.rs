//! Retention pruning.
//!
//! Index-only and cheap: pruning shrinks the referenced set, making
//! formerly-referenced blobs eligible for a later GC pass. It never
//! touches the blob filesystem itself.

use relic_core::error::RelicError;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::info;

use crate::store::ArtifactStore;
use crate::StoreResult;

/// Entries removed by one prune pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PruneReport {
    pub removed: u64,
    pub per_kind: BTreeMap<String, u64>,
}

impl ArtifactStore {
    /// For each kind, keep the `keep_last` most recent entries and delete
    /// the rest from the index.
    pub fn prune_keep_last(&self, keep_last: usize) -> StoreResult<PruneReport> {
        if keep_last < 1 {
            return Err(RelicError::invalid_argument("keep_last must be >= 1"));
        }

        let _sweep = self.locks.sweep_shared()?;
        let mut report = PruneReport::default();

        for kind in self.index.kinds()? {
            let kind_lock = self.locks.kind(&kind);
            let _k = kind_lock.write();

            let mut removed = 0u64;
            // list_kind is most-recent-first; everything past keep_last goes.
            for entry in self.index.list_kind(&kind)?.iter().skip(keep_last) {
                if self.index.delete(&kind, &entry.input_key)? {
                    removed += 1;
                }
            }
            if removed > 0 {
                report.per_kind.insert(kind.clone(), removed);
                report.removed += removed;
            }
        }

        info!(removed = report.removed, keep_last, "prune complete");
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::tests::{open_store, request, write_source};
    use tempfile::tempdir;

    #[test]
    fn test_prune_keeps_most_recent() {
        let dir = tempdir().unwrap();
        let store = open_store(&dir);

        for i in 0..5 {
            let src = write_source(&dir, &format!("f{}.bin", i), format!("c{}", i).as_bytes());
            store
                .ingest_file(&request("iso", &format!("k{}", i), src))
                .unwrap();
        }

        let report = store.prune_keep_last(2).unwrap();
        assert_eq!(report.removed, 3);
        assert_eq!(report.per_kind.get("iso"), Some(&3));

        let survivors = store.list_kind("iso", 0, 10).unwrap();
        assert_eq!(survivors.len(), 2);
        // The two most recent by stored_at survive.
        assert_eq!(survivors[0].input_key, "k4");
        assert_eq!(survivors[1].input_key, "k3");
    }

    #[test]
    fn test_prune_fewer_entries_than_keep_last() {
        let dir = tempdir().unwrap();
        let store = open_store(&dir);

        let src = write_source(&dir, "a.bin", b"only");
        store.ingest_file(&request("iso", "k1", src)).unwrap();

        let report = store.prune_keep_last(5).unwrap();
        assert_eq!(report.removed, 0);
        assert_eq!(store.list_kind("iso", 0, 10).unwrap().len(), 1);
    }

    #[test]
    fn test_prune_rejects_zero() {
        let dir = tempdir().unwrap();
        let store = open_store(&dir);

        let err = store.prune_keep_last(0).unwrap_err();
        assert!(matches!(err, RelicError::InvalidArgument { .. }));
    }

    #[test]
    fn test_prune_is_per_kind() {
        let dir = tempdir().unwrap();
        let store = open_store(&dir);

        for i in 0..3 {
            let src = write_source(&dir, &format!("i{}.bin", i), format!("i{}", i).as_bytes());
            store
                .ingest_file(&request("iso", &format!("k{}", i), src))
                .unwrap();
        }
        let src = write_source(&dir, "r.bin", b"rootfs");
        store.ingest_file(&request("rootfs", "r1", src)).unwrap();

        let report = store.prune_keep_last(1).unwrap();
        assert_eq!(report.removed, 2);
        assert_eq!(store.list_kind("iso", 0, 10).unwrap().len(), 1);
        // rootfs had only one entry; untouched.
        assert_eq!(store.list_kind("rootfs", 0, 10).unwrap().len(), 1);
    }

    #[test]
    fn test_prune_never_deletes_blobs() {
        let dir = tempdir().unwrap();
        let store = open_store(&dir);

        let a = write_source(&dir, "a.bin", b"one");
        let b = write_source(&dir, "b.bin", b"two");
        let e1 = store.ingest_file(&request("iso", "k1", a)).unwrap();
        let e2 = store.ingest_file(&request("iso", "k2", b)).unwrap();

        store.prune_keep_last(1).unwrap();
        // Both blobs still on disk until GC runs.
        assert!(store.blob_exists(&e1.blob_sha256));
        assert!(store.blob_exists(&e2.blob_sha256));
    }
}
