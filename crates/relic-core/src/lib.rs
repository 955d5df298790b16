//! # relic-core
//!
//! Core types and utilities shared across all Relic crates.
//!
//! This crate provides:
//! - The `Digest` type used to address blobs in the store
//! - `RelicError` enum for unified error handling
//! - Hashing utilities (sha256 over bytes and files)
//!
//! ## Architecture
//!
//! The crate is organized into modules:
//! - `types`: Core data types (Digest)
//! - `error`: Error types and result aliases
//! - `utils`: Hashing and time helpers

pub mod error;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use error::{RelicError, RelicResult};
pub use types::Digest;
