use std::path::Path;

use anyhow::{Context, bail};
use concord_core::entities::ProcessEntity;
use concord_core::enums::TransactionState;
use concord_schema::SchemaRegistry;

use crate::cli::GlobalFlags;
use crate::cli::root_commands::SyncArgs;
use crate::context::AppContext;
use crate::output::output;

/// Handle `concord sync`.
pub async fn handle(args: &SyncArgs, ctx: &AppContext, flags: &GlobalFlags) -> anyhow::Result<()> {
    let raw = std::fs::read_to_string(&args.file)
        .with_context(|| format!("failed to read {}", args.file.display()))?;
    let value: serde_json::Value = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not valid JSON", args.file.display()))?;

    let schemas = SchemaRegistry::new()?;
    schemas
        .validate("process_entity", &value)
        .with_context(|| format!("{} is not a process entity", args.file.display()))?;
    let entity: ProcessEntity = serde_json::from_value(value)?;

    let embedding = args.embedding.as_deref().map(read_embedding).transpose()?;

    let tx = ctx.writer.save(&entity, embedding).await?;
    let outcome = tx.outcome();
    output(&outcome, flags.format)?;

    if outcome.state != TransactionState::Committed {
        bail!("transaction {} ended {}", outcome.transaction_id, outcome.state);
    }
    Ok(())
}

fn read_embedding(path: &Path) -> anyhow::Result<Vec<f32>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let embedding: Vec<f32> = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not a JSON array of numbers", path.display()))?;
    if embedding.is_empty() {
        bail!("{} holds an empty embedding", path.display());
    }
    Ok(embedding)
}
