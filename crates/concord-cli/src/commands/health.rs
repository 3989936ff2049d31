use anyhow::bail;

use crate::cli::GlobalFlags;
use crate::context::AppContext;
use crate::output::output;

/// Handle `concord health`.
pub async fn handle(ctx: &AppContext, flags: &GlobalFlags) -> anyhow::Result<()> {
    let report = ctx.probe.check(&ctx.adapters()).await;
    output(&report, flags.format)?;

    let down: Vec<&str> = report
        .iter()
        .filter(|h| !h.reachable)
        .map(|h| h.backend.as_str())
        .collect();
    if !down.is_empty() {
        bail!("unreachable backends: {}", down.join(", "));
    }
    Ok(())
}
