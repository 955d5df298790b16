//! Per-kind entry index.
//!
//! Maps an input fingerprint to a blob reference plus metadata, one JSON
//! document per (kind, input_key) under `<root>/index/<kind>/`. The files
//! on disk are the source of truth; every read goes back to them.

pub mod entry;
pub mod store;

pub use entry::IndexEntry;
pub use store::EntryIndex;
