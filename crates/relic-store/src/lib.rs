//! Content-addressable artifact store for distro build outputs.
//!
//! This crate deduplicates build outputs by content hash, lets a workspace
//! ("distro") restore previously produced outputs without rebuilding, and
//! reclaims storage through reference-aware garbage collection and
//! retention pruning.
//!
//! Layout under one store root:
//! - `blobs/sha256/<aa>/<64-hex>`: immutable content blobs
//! - `index/<kind>/<hashed-input-key>.json`: one entry per (kind, input_key)
//!
//! The persisted files are the source of truth; nothing in memory is
//! authoritative across operations.

pub mod blob;
pub mod distro;
pub mod gc;
pub mod index;
pub mod ingest;
pub mod prune;
pub mod restore;
pub mod store;

mod locks;

// Re-export main types
pub use blob::{BlobStore, Materialized, PutOutcome};
pub use distro::{ArtifactRow, ArtifactSpec, DistroCatalog, DistroSpec, StorePresence};
pub use gc::GcReport;
pub use index::{EntryIndex, IndexEntry};
pub use ingest::{IngestReport, IngestRequest, IngestStatus};
pub use prune::PruneReport;
pub use restore::{read_key_file, Fingerprinter, KeyFiles};
pub use store::{ArtifactStore, StoreStatus};

/// Result type for store operations
pub type StoreResult<T> = relic_core::RelicResult<T>;
