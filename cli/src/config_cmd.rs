//! `config`: write the merged settings back to the config file.

use anyhow::Context;

use crate::config::RunConfig;

/// Persist the merged settings so later runs need no flags.
pub(crate) fn run(config: &RunConfig) -> anyhow::Result<()> {
    config
        .settings
        .save_to_path(&config.config_path)
        .with_context(|| format!("saving {}", config.config_path.display()))?;
    println!("wrote {}", config.config_path.display());
    Ok(())
}
