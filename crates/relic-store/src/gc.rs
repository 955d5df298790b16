//! Reference-counted garbage collection.
//!
//! Stop-the-world relative to mutation: the sweep holds the store-wide
//! lock exclusively, computes the referenced set once, and deletes every
//! blob outside it. Each delete is independently idempotent, so an
//! interrupted sweep leaves a valid (if incompletely collected) store.

use serde::Serialize;
use tracing::{info, warn};

use crate::store::ArtifactStore;
use crate::StoreResult;

/// Counters from one GC sweep
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GcReport {
    pub examined: u64,
    pub deleted: u64,
    pub retained: u64,
    pub errors: u64,
    pub freed_bytes: u64,
    pub temp_files_removed: u64,
}

impl GcReport {
    /// Format freed space in human-readable form
    pub fn format_freed(&self) -> String {
        const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
        let mut size = self.freed_bytes as f64;
        let mut unit = 0;
        while size >= 1024.0 && unit < UNITS.len() - 1 {
            size /= 1024.0;
            unit += 1;
        }
        if unit == 0 {
            format!("{} {}", self.freed_bytes, UNITS[unit])
        } else {
            format!("{:.1} {}", size, UNITS[unit])
        }
    }
}

impl ArtifactStore {
    /// Delete every blob unreachable from any live entry across all kinds.
    ///
    /// Per-blob delete failures are logged and counted, never fatal to the
    /// sweep.
    pub fn gc(&self) -> StoreResult<GcReport> {
        let _sweep = self.locks.sweep_exclusive()?;

        let referenced = self.index.all_referenced_digests()?;
        let mut report = GcReport::default();

        // Nothing can have a put in flight under the exclusive lock, so
        // any temp file left in the blob area is an orphan.
        report.temp_files_removed = self.blobs.remove_stale_temp_files()?;

        for digest in self.blobs.iter_digests()? {
            report.examined += 1;
            if referenced.contains(&digest) {
                report.retained += 1;
                continue;
            }
            match self.blobs.delete(&digest) {
                Ok(freed) => {
                    report.deleted += 1;
                    report.freed_bytes += freed;
                }
                Err(e) => {
                    warn!(blob = %digest, error = %e, "failed to delete unreferenced blob");
                    report.errors += 1;
                }
            }
        }

        info!(
            examined = report.examined,
            deleted = report.deleted,
            retained = report.retained,
            errors = report.errors,
            temp_files_removed = report.temp_files_removed,
            freed = %report.format_freed(),
            "gc sweep complete"
        );
        Ok(report)
    }
}
