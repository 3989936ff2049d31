use anyhow::Context;

use crate::cli::GlobalFlags;
use crate::cli::root_commands::TxCommands;
use crate::context::AppContext;
use crate::output::output;

/// Handle `concord tx`.
pub fn handle(action: &TxCommands, ctx: &AppContext, flags: &GlobalFlags) -> anyhow::Result<()> {
    match action {
        TxCommands::List { state } => output(&ctx.registry.list(*state), flags.format),
        TxCommands::Get { id } => {
            let tx = ctx
                .registry
                .get(id)
                .with_context(|| format!("transaction {id} not found"))?;
            output(&tx, flags.format)
        }
    }
}
