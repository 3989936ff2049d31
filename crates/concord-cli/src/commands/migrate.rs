use std::sync::Arc;

use anyhow::Context;
use concord_reconcile::Migrator;
use concord_store::JsonlSource;

use crate::cli::GlobalFlags;
use crate::cli::root_commands::MigrateArgs;
use crate::context::AppContext;
use crate::output::output;

/// Handle `concord migrate`.
pub async fn handle(args: &MigrateArgs, ctx: &AppContext, flags: &GlobalFlags) -> anyhow::Result<()> {
    let legacy = JsonlSource::load(&args.file)
        .with_context(|| format!("failed to read legacy export {}", args.file.display()))?;
    let summary = Migrator::new(Arc::clone(&ctx.writer)).migrate(&legacy).await?;
    output(&summary, flags.format)
}
