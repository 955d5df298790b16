//! Workspace file helpers: directory listing and hash-on-demand.
//!
//! Both operate strictly under a distro's output root; relative paths are
//! validated against traversal before any filesystem access.

use camino::{Utf8Component, Utf8Path, Utf8PathBuf};
use relic_core::error::{RelicError, RelicResult};
use relic_core::utils::hash::digest_files_parallel;
use serde::Serialize;
use std::fs;
use std::time::UNIX_EPOCH;

use super::CommandContext;

#[derive(Serialize)]
struct LsEntry {
    name: String,
    rel_path: String,
    kind: String,
    size_bytes: Option<u64>,
    mtime_unix: Option<u64>,
}

#[derive(Serialize)]
struct LsResp {
    root: Utf8PathBuf,
    entries: Vec<LsEntry>,
    truncated: bool,
}

pub fn ls(ctx: &CommandContext, distro: &str, path: &str, limit: usize) -> RelicResult<()> {
    let out_root = ctx.distro(distro)?.out_root(&ctx.config.repo_root);
    let target = sanitize_under_root(&out_root, path)?;

    let md = fs::metadata(&target)
        .map_err(|e| RelicError::io(format!("Path not found: {}", target), e))?;
    if !md.is_dir() {
        return Err(RelicError::invalid_argument(format!(
            "not a directory: {}",
            path
        )));
    }

    let mut entries = vec![];
    let read = fs::read_dir(&target)
        .map_err(|e| RelicError::io(format!("Failed to read {}", target), e))?;
    for ent in read {
        let ent = ent.map_err(|e| RelicError::io("Failed to read directory entry", e))?;
        let name = ent.file_name().to_string_lossy().to_string();
        let entry_path = target.join(&name);
        let md = fs::symlink_metadata(&entry_path)
            .map_err(|e| RelicError::io(format!("Failed to stat {}", entry_path), e))?;

        let ft = md.file_type();
        let kind = if ft.is_dir() {
            "dir"
        } else if ft.is_file() {
            "file"
        } else if ft.is_symlink() {
            "symlink"
        } else {
            "other"
        };
        let rel_path = entry_path
            .strip_prefix(&out_root)
            .map(|p| p.to_string())
            .unwrap_or_else(|_| name.clone());
        let mtime_unix = md
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_secs());

        entries.push(LsEntry {
            name,
            rel_path,
            kind: kind.to_string(),
            size_bytes: ft.is_file().then(|| md.len()),
            mtime_unix,
        });
    }

    // Stable order: dirs first, then by name.
    entries.sort_by(|a, b| match (a.kind.as_str(), b.kind.as_str()) {
        ("dir", "dir") => a.name.cmp(&b.name),
        ("dir", _) => std::cmp::Ordering::Less,
        (_, "dir") => std::cmp::Ordering::Greater,
        _ => a.name.cmp(&b.name),
    });

    let truncated = entries.len() > limit;
    if truncated {
        entries.truncate(limit);
    }

    ctx.print_json(&LsResp {
        root: out_root,
        entries,
        truncated,
    })
}

#[derive(Debug, Serialize)]
struct HashRow {
    path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha256: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

pub fn hash(ctx: &CommandContext, distro: &str, paths: &[String]) -> RelicResult<()> {
    if paths.is_empty() {
        return Err(RelicError::invalid_argument("no paths given"));
    }
    let out_root = ctx.distro(distro)?.out_root(&ctx.config.repo_root);
    ctx.print_json(&hash_rows(&out_root, paths))
}

// One row per requested path; a bad path fails its row, not the batch.
fn hash_rows(out_root: &Utf8Path, paths: &[String]) -> Vec<HashRow> {
    let mut rows: Vec<HashRow> = paths
        .iter()
        .map(|rel| HashRow {
            path: rel.clone(),
            sha256: None,
            error: None,
        })
        .collect();

    let mut resolved: Vec<(usize, Utf8PathBuf)> = vec![];
    for (i, rel) in paths.iter().enumerate() {
        match sanitize_under_root(out_root, rel) {
            Ok(target) => resolved.push((i, target)),
            Err(e) => rows[i].error = Some(e.to_string()),
        }
    }

    let targets: Vec<Utf8PathBuf> = resolved.iter().map(|(_, t)| t.clone()).collect();
    for ((i, _), (_, result)) in resolved.iter().zip(digest_files_parallel(&targets)) {
        match result {
            Ok(digest) => rows[*i].sha256 = Some(digest.to_hex()),
            Err(e) => rows[*i].error = Some(e.to_string()),
        }
    }
    rows
}

/// Resolve `rel` under `root`, rejecting traversal and symlink escapes
pub fn sanitize_under_root(root: &Utf8Path, rel: &str) -> RelicResult<Utf8PathBuf> {
    let rel_path = Utf8Path::new(rel);
    for component in rel_path.components() {
        match component {
            Utf8Component::Normal(_) | Utf8Component::CurDir => {}
            Utf8Component::ParentDir => {
                return Err(RelicError::invalid_argument(
                    "path traversal (..) is not allowed",
                ))
            }
            _ => {
                return Err(RelicError::invalid_argument(
                    "absolute paths are not allowed",
                ))
            }
        }
    }

    let root_canon = canonicalize(root)?;
    let candidate = canonicalize(&root.join(rel_path))?;
    if !candidate.starts_with(&root_canon) {
        return Err(RelicError::permission_denied(
            "path escapes the output root",
        ));
    }
    Ok(candidate)
}

fn canonicalize(path: &Utf8Path) -> RelicResult<Utf8PathBuf> {
    let canon = fs::canonicalize(path)
        .map_err(|e| RelicError::io(format!("Path not found: {}", path), e))?;
    Utf8PathBuf::from_path_buf(canon)
        .map_err(|p| RelicError::invalid_argument(format!("non-UTF-8 path: {}", p.display())))
}
