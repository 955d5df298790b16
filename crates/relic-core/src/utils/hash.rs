//! Content hashing utilities using sha256.

use crate::error::{RelicError, RelicResult};
use crate::types::Digest;
use camino::{Utf8Path, Utf8PathBuf};
use rayon::prelude::*;
use sha2::{Digest as _, Sha256};
use std::fs::File;
use std::io::Read;

/// Compute the sha256 digest of a byte slice
pub fn digest_bytes(content: &[u8]) -> Digest {
    let mut hasher = Sha256::new();
    hasher.update(content);
    Digest::new(hasher.finalize().into())
}

/// Compute the sha256 digest of a file, streaming its contents
pub fn digest_file(path: &Utf8Path) -> RelicResult<Digest> {
    let mut file = File::open(path)
        .map_err(|e| RelicError::io(format!("Failed to open {} for hashing", path), e))?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; 1024 * 1024];
    loop {
        let n = file
            .read(&mut buf)
            .map_err(|e| RelicError::io(format!("Failed to read {} for hashing", path), e))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(Digest::new(hasher.finalize().into()))
}

/// Hash multiple files in parallel, one result per file.
///
/// A single unreadable file does not poison the batch; its error comes
/// back alongside the successes.
pub fn digest_files_parallel(paths: &[Utf8PathBuf]) -> Vec<(Utf8PathBuf, RelicResult<Digest>)> {
    paths
        .par_iter()
        .map(|path| (path.clone(), digest_file(path)))
        .collect()
}
