//! Store browsing: paginated entries, entry detail, blob export.

use camino::Utf8PathBuf;
use relic_core::error::{RelicError, RelicResult};
use relic_core::Digest;
use relic_store::IndexEntry;
use serde::Serialize;
use std::fs;

use super::CommandContext;

// The dashboard pages in small chunks; anything larger is a scripting
// mistake.
const MAX_PAGE: usize = 200;

#[derive(Serialize)]
struct EntriesResp {
    kind: String,
    offset: usize,
    limit: usize,
    entries: Vec<IndexEntry>,
}

pub fn entries(ctx: &CommandContext, kind: &str, offset: i64, limit: i64) -> RelicResult<()> {
    if offset < 0 || limit < 0 {
        return Err(RelicError::invalid_argument(
            "offset and limit must be non-negative",
        ));
    }
    let offset = offset as usize;
    let limit = (limit as usize).min(MAX_PAGE);

    let entries = ctx.store.list_kind(kind, offset, limit)?;
    ctx.print_json(&EntriesResp {
        kind: kind.to_string(),
        offset,
        limit,
        entries,
    })
}

pub fn entry(ctx: &CommandContext, kind: &str, input_key: &str) -> RelicResult<()> {
    let Some(entry) = ctx.store.get(kind, input_key)? else {
        return Err(RelicError::EntryNotFound {
            kind: kind.to_string(),
            input_key: input_key.to_string(),
        });
    };
    ctx.print_json(&entry)
}

#[derive(Serialize)]
struct BlobResp {
    sha256: String,
    out: Utf8PathBuf,
    size_bytes: u64,
}

pub fn blob(ctx: &CommandContext, sha256: &str, out: Option<Utf8PathBuf>) -> RelicResult<()> {
    let digest = Digest::from_hex(sha256)?;
    if !ctx.store.blob_exists(&digest) {
        return Err(RelicError::BlobNotFound {
            digest: digest.to_hex(),
        });
    }

    let out = out.unwrap_or_else(|| Utf8PathBuf::from(digest.to_hex()));
    let size_bytes = fs::copy(ctx.store.blob_path(&digest), &out)
        .map_err(|e| RelicError::io(format!("Failed to export blob to {}", out), e))?;

    ctx.print_json(&BlobResp {
        sha256: digest.to_hex(),
        out,
        size_bytes,
    })
}
