use crate::cli::GlobalFlags;
use crate::cli::root_commands::Commands;
use crate::commands;
use crate::context::AppContext;

/// Dispatch a parsed command to the corresponding handler module.
pub async fn dispatch(command: Commands, ctx: &AppContext, flags: &GlobalFlags) -> anyhow::Result<()> {
    match command {
        Commands::Sync(args) => commands::sync::handle(&args, ctx, flags).await,
        Commands::Delete(args) => commands::delete::handle(&args, ctx, flags).await,
        Commands::Detect(args) => commands::detect::handle(&args, ctx, flags).await,
        Commands::Reconcile(args) => commands::reconcile::handle(&args, ctx, flags).await,
        Commands::Tx { action } => commands::tx::handle(&action, ctx, flags),
        Commands::Health => commands::health::handle(ctx, flags).await,
        Commands::Migrate(args) => commands::migrate::handle(&args, ctx, flags).await,
        Commands::Schema(args) => commands::schema::handle(&args, flags),
    }
}
