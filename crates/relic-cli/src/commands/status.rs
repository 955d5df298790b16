//! Store status and enumeration commands.

use camino::Utf8PathBuf;
use relic_core::error::RelicResult;
use serde::Serialize;

use super::CommandContext;

#[derive(Serialize)]
struct StatusResp {
    repo_root: Utf8PathBuf,
    store_root: Utf8PathBuf,
    mutations_enabled: bool,
    index_entries: u64,
    referenced_blobs: u64,
    referenced_bytes: u64,
}

pub fn status(ctx: &CommandContext) -> RelicResult<()> {
    let s = ctx.store.status()?;
    ctx.print_json(&StatusResp {
        repo_root: ctx.config.repo_root.clone(),
        store_root: s.root,
        mutations_enabled: ctx.gate.enabled(),
        index_entries: s.index_entries,
        referenced_blobs: s.referenced_blobs,
        referenced_bytes: s.referenced_bytes,
    })
}

pub fn kinds(ctx: &CommandContext) -> RelicResult<()> {
    ctx.print_json(&ctx.store.kinds()?)
}

#[derive(Serialize)]
struct DistroInfo {
    dir: String,
    label: String,
}

pub fn distros(ctx: &CommandContext) -> RelicResult<()> {
    let list: Vec<DistroInfo> = ctx
        .config
        .catalog
        .distros
        .iter()
        .map(|d| DistroInfo {
            dir: d.dir.clone(),
            label: d.label.clone(),
        })
        .collect();
    ctx.print_json(&list)
}
