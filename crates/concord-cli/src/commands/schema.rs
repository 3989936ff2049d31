use anyhow::Context;
use concord_schema::SchemaRegistry;

use crate::cli::GlobalFlags;
use crate::cli::root_commands::SchemaArgs;
use crate::output::output;

/// Handle `concord schema`.
pub fn handle(args: &SchemaArgs, flags: &GlobalFlags) -> anyhow::Result<()> {
    let schemas = SchemaRegistry::new()?;
    let schema = schemas.get(&args.name).with_context(|| {
        format!(
            "unknown schema '{}' (available: {})",
            args.name,
            schemas.list().join(", ")
        )
    })?;
    output(schema, flags.format)
}
