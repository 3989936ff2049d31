use anyhow::bail;
use concord_core::enums::TransactionState;

use crate::cli::GlobalFlags;
use crate::cli::root_commands::DeleteArgs;
use crate::context::AppContext;
use crate::output::output;

/// Handle `concord delete`.
pub async fn handle(args: &DeleteArgs, ctx: &AppContext, flags: &GlobalFlags) -> anyhow::Result<()> {
    let outcome = ctx.writer.delete(&args.id).await?.outcome();
    output(&outcome, flags.format)?;

    if outcome.state != TransactionState::Committed {
        bail!("transaction {} ended {}", outcome.transaction_id, outcome.state);
    }
    Ok(())
}
