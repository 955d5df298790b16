//! Content-addressable blob storage.
//!
//! Blobs are immutable byte sequences addressed by the sha256 of their
//! content. This module is the dedup primitive: equal content converges on
//! one file on disk no matter how many entries reference it.

pub mod store;

pub use store::{BlobStore, Materialized, PutOutcome};
