//! Index entry record.

use relic_core::Digest;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Immutable record for one (kind, input_key) pairing.
///
/// An entry may exist only while its referenced blob exists; GC enforces
/// this by never deleting a blob that any live entry references.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
    /// Artifact category, e.g. "iso" or "rootfs_erofs"
    pub kind: String,
    /// Fingerprint of the inputs that produced this artifact; opaque,
    /// stable across rebuilds with identical inputs
    pub input_key: String,
    /// Digest of the referenced blob
    pub blob_sha256: Digest,
    /// Declared format, usually the file extension
    pub format: String,
    /// Blob size in bytes
    pub size_bytes: u64,
    /// Insertion timestamp, monotonically non-decreasing per kind
    pub stored_at_unix: i64,
    /// Whether the original ingested file was hardlinked into the store
    pub hardlinked: bool,
    /// Free-form caller metadata (e.g. which distro produced this)
    #[serde(default)]
    pub meta: BTreeMap<String, serde_json::Value>,
}
