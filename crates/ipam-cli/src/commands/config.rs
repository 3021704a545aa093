//! Config commands

use std::path::Path;

use anyhow::{Context, Result};
use ipam_alloc_core::AllocatorConfig;

pub struct ConfigCommand;

impl ConfigCommand {
    /// Effective configuration as TOML
    pub fn show(config: &AllocatorConfig) -> Result<String> {
        Ok(toml::to_string_pretty(config)?)
    }

    /// Default configuration, written to `output` when given
    pub fn generate(output: Option<&Path>) -> Result<String> {
        let config_toml = toml::to_string_pretty(&AllocatorConfig::default())?;

        match output {
            Some(path) => {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    std::fs::create_dir_all(parent)
                        .with_context(|| format!("creating {}", parent.display()))?;
                }
                std::fs::write(path, &config_toml)
                    .with_context(|| format!("writing {}", path.display()))?;
                Ok(format!("Example configuration written to: {}", path.display()))
            }
            None => Ok(config_toml),
        }
    }
}
