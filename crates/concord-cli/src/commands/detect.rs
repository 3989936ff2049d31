use crate::cli::GlobalFlags;
use crate::cli::root_commands::DetectArgs;
use crate::context::AppContext;
use crate::output::output;

/// Handle `concord detect`.
pub async fn handle(args: &DetectArgs, ctx: &AppContext, flags: &GlobalFlags) -> anyhow::Result<()> {
    let detector = ctx.engine.detector();
    let gaps = match (&args.backend, &args.record) {
        (Some(backend), _) => detector.detect_backend(backend).await?,
        (None, Some(record)) => detector.detect_record(record).await?,
        (None, None) => detector.detect_all().await?,
    };
    output(&gaps, flags.format)
}
