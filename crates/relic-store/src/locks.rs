//! Locking discipline for the store.
//!
//! Two levels:
//! - a store-wide sweep lock: ingest, restore, prune, and entry removal
//!   take it shared; GC takes it exclusive, so a sweep never runs between
//!   a blob write and its index upsert. Backed by an advisory file lock
//!   under the store root in addition to the in-process lock, so the
//!   exclusion holds across store handles and across processes sharing
//!   one root.
//! - a per-kind lock: writers to a kind's index serialize; readers share

use camino::{Utf8Path, Utf8PathBuf};
use dashmap::DashMap;
use fs4::FileExt;
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use relic_core::error::RelicError;
use std::fs::{File, OpenOptions};
use std::sync::Arc;

use crate::StoreResult;

const SWEEP_LOCK_FILE: &str = ".sweep.lock";

#[derive(Debug)]
pub(crate) struct StoreLocks {
    /// Exclusive holder: GC. Shared holders: everything else that mutates.
    sweep: RwLock<()>,
    lock_path: Utf8PathBuf,
    /// One lock per kind, created lazily.
    kinds: DashMap<String, Arc<RwLock<()>>>,
}

/// Shared hold on the sweep lock; both levels release on drop
pub(crate) struct SweepShared<'a> {
    _mem: RwLockReadGuard<'a, ()>,
    _file: File,
}

/// Exclusive hold on the sweep lock; both levels release on drop
pub(crate) struct SweepExclusive<'a> {
    _mem: RwLockWriteGuard<'a, ()>,
    _file: File,
}

impl StoreLocks {
    pub(crate) fn new(store_root: &Utf8Path) -> Self {
        Self {
            sweep: RwLock::new(()),
            lock_path: store_root.join(SWEEP_LOCK_FILE),
            kinds: DashMap::new(),
        }
    }

    /// Take the sweep lock shared. Blocks while a sweep runs, whichever
    /// handle or process holds it.
    pub(crate) fn sweep_shared(&self) -> StoreResult<SweepShared<'_>> {
        let mem = self.sweep.read();
        let file = self.open_lock_file()?;
        file.lock_shared()
            .map_err(|e| RelicError::io(format!("Failed to lock {}", self.lock_path), e))?;
        Ok(SweepShared {
            _mem: mem,
            _file: file,
        })
    }

    /// Take the sweep lock exclusive, excluding every mutator on this
    /// store root.
    pub(crate) fn sweep_exclusive(&self) -> StoreResult<SweepExclusive<'_>> {
        let mem = self.sweep.write();
        let file = self.open_lock_file()?;
        file.lock_exclusive()
            .map_err(|e| RelicError::io(format!("Failed to lock {}", self.lock_path), e))?;
        Ok(SweepExclusive {
            _mem: mem,
            _file: file,
        })
    }

    pub(crate) fn kind(&self, kind: &str) -> Arc<RwLock<()>> {
        self.kinds
            .entry(kind.to_string())
            .or_insert_with(|| Arc::new(RwLock::new(())))
            .clone()
    }

    fn open_lock_file(&self) -> StoreResult<File> {
        OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(&self.lock_path)
            .map_err(|e| RelicError::io(format!("Failed to open {}", self.lock_path), e))
    }
}
