//! Core data types shared across Relic crates.

pub mod digest;

pub use digest::Digest;
