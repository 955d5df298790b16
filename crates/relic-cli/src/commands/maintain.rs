//! Store maintenance: garbage collection and retention pruning.
//!
//! The two are deliberately separate commands. Prune only shrinks the
//! index; unreferenced blobs stay on disk until an operator runs gc.

use relic_core::error::{RelicError, RelicResult};

use super::CommandContext;

pub fn gc(ctx: &CommandContext, token: Option<&str>) -> RelicResult<()> {
    ctx.gate.authorize(token)?;
    let report = ctx.store.gc()?;
    ctx.print_json(&report)
}

pub fn prune(ctx: &CommandContext, keep_last: i64, token: Option<&str>) -> RelicResult<()> {
    ctx.gate.authorize(token)?;
    if keep_last < 1 {
        return Err(RelicError::invalid_argument("--keep-last must be >= 1"));
    }
    let report = ctx.store.prune_keep_last(keep_last as usize)?;
    ctx.print_json(&report)
}
