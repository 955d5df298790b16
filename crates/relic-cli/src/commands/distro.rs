//! Per-distro operations: summary, ingest, restore.

use relic_core::error::RelicResult;
use relic_core::utils::time::now_unix;
use relic_store::{ArtifactRow, IngestReport, Materialized};
use serde::Serialize;

use super::CommandContext;

#[derive(Serialize)]
struct SummaryResp {
    distro: String,
    out_root: String,
    generated_at_unix: i64,
    artifacts: Vec<ArtifactRow>,
}

pub fn summary(ctx: &CommandContext, distro: &str) -> RelicResult<()> {
    let spec = ctx.distro(distro)?;
    let artifacts = spec.summary(&ctx.store, &ctx.config.repo_root)?;
    ctx.print_json(&SummaryResp {
        distro: spec.dir.clone(),
        out_root: spec.out_root(&ctx.config.repo_root).to_string(),
        generated_at_unix: now_unix(),
        artifacts,
    })
}

#[derive(Serialize)]
struct IngestResp {
    distro: String,
    results: Vec<IngestReport>,
}

pub fn ingest(
    ctx: &CommandContext,
    distro: &str,
    kinds: &[String],
    token: Option<&str>,
) -> RelicResult<()> {
    ctx.gate.authorize(token)?;
    let spec = ctx.distro(distro)?;

    let selection = if kinds.is_empty() { None } else { Some(kinds) };
    let results = spec.ingest_existing(&ctx.store, &ctx.config.repo_root, selection)?;
    ctx.print_json(&IngestResp {
        distro: spec.dir.clone(),
        results,
    })
}

#[derive(Serialize)]
struct RestoreResp {
    distro: String,
    kind: String,
    restored: Materialized,
}

pub fn restore(
    ctx: &CommandContext,
    distro: &str,
    kind: &str,
    token: Option<&str>,
) -> RelicResult<()> {
    ctx.gate.authorize(token)?;
    let spec = ctx.distro(distro)?;

    let restored = spec.restore_kind(&ctx.store, &ctx.config.repo_root, kind)?;
    ctx.print_json(&RestoreResp {
        distro: spec.dir.clone(),
        kind: kind.to_string(),
        restored,
    })
}
