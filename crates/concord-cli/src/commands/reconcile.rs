use crate::cli::GlobalFlags;
use crate::cli::root_commands::ReconcileArgs;
use crate::context::AppContext;
use crate::output::output;

/// Handle `concord reconcile`.
///
/// `--yes` confirms every planned action up front; without it the
/// configured `require_confirmation` decides whether unconfirmed
/// strategies are held back.
pub async fn handle(
    args: &ReconcileArgs,
    ctx: &AppContext,
    flags: &GlobalFlags,
) -> anyhow::Result<()> {
    let settings = &ctx.config.reconcile;
    let dry_run = args.dry_run || settings.dry_run;

    let mut actions = ctx.engine.plan().await?;
    if args.yes {
        for action in &mut actions {
            action.confirm();
        }
    }

    let report = ctx
        .engine
        .execute(actions, dry_run, settings.require_confirmation)
        .await?;
    output(&report, flags.format)
}
