//! Utility functions shared across Relic crates.

pub mod hash;
pub mod time;

pub use hash::{digest_bytes, digest_file, digest_files_parallel};
pub use time::now_unix;
