//! Allocator configuration
//!
//! Loaded from a TOML file with `IPAM_ALLOC_*` environment overrides.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AllocatorConfig {
    /// How long an allocation waits for a busy parent before giving up
    pub guard_timeout_ms: u64,
    /// Units listed when no limit is given
    pub default_list_limit: usize,
    /// Upper bound on any listing, 0 for none
    pub max_list_limit: usize,
}

impl Default for AllocatorConfig {
    fn default() -> Self {
        Self {
            guard_timeout_ms: 5000,
            default_list_limit: 50,
            max_list_limit: 1000,
        }
    }
}

impl AllocatorConfig {
    pub const ENV_PREFIX: &'static str = "IPAM_ALLOC";

    const SEARCH_PATHS: [&'static str; 2] = ["/etc/ipam/allocator.toml", "./allocator.toml"];

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(config::Environment::with_prefix(Self::ENV_PREFIX).try_parsing(true))
            .build()?;

        let config: AllocatorConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// First readable file of the standard locations, else defaults
    pub fn load_with_defaults() -> Result<Self, ConfigError> {
        for path in Self::SEARCH_PATHS {
            if Path::new(path).exists() {
                match Self::load_from_file(path) {
                    Ok(config) => {
                        log::info!("Loaded allocator configuration from {}", path);
                        return Ok(config);
                    }
                    Err(e) => log::warn!("Failed to load config from {}: {}", path, e),
                }
            }
        }

        let mut config = Self::default();
        if let Ok(timeout) = std::env::var("IPAM_ALLOC_GUARD_TIMEOUT_MS") {
            match timeout.parse() {
                Ok(ms) => config.guard_timeout_ms = ms,
                Err(_) => log::warn!("Ignoring invalid IPAM_ALLOC_GUARD_TIMEOUT_MS '{}'", timeout),
            }
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.guard_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "guard_timeout_ms must be greater than zero".to_string(),
            ));
        }
        if self.max_list_limit != 0 && self.default_list_limit > self.max_list_limit {
            return Err(ConfigError::Invalid(format!(
                "default_list_limit {} exceeds max_list_limit {}",
                self.default_list_limit, self.max_list_limit
            )));
        }
        Ok(())
    }

    pub fn guard_timeout(&self) -> Duration {
        Duration::from_millis(self.guard_timeout_ms)
    }

    /// Effective listing size; a requested 0 means "as many as allowed"
    pub fn resolve_limit(&self, requested: Option<usize>) -> usize {
        let cap = match self.max_list_limit {
            0 => usize::MAX,
            max => max,
        };
        match requested.unwrap_or(self.default_list_limit) {
            0 => cap,
            limit => limit.min(cap),
        }
    }
}
