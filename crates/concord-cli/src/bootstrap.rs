use anyhow::Context;
use concord_config::ConcordConfig;

use crate::cli::GlobalFlags;

/// Load `.env`, the config layers, and apply flag overrides.
pub fn load_config(flags: &GlobalFlags) -> anyhow::Result<ConcordConfig> {
    let mut config =
        ConcordConfig::load_with_dotenv().context("failed to load concord configuration")?;

    if let Some(data_dir) = &flags.data_dir {
        config.storage.data_dir.clone_from(data_dir);
        config
            .validate()
            .context("invalid --data-dir")?;
    }

    tracing::debug!(data_dir = %config.storage.data_dir, "configuration loaded");
    Ok(config)
}
