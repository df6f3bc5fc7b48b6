//! Engine configuration loaded from `encounter-flow.toml`.
//!
//! [`EngineConfig`] holds every tunable. Values missing from the file fall back
//! to defaults. `ENCOUNTER_FLOW_MAX_RETRIES` takes precedence over the file.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::machines::{DEFAULT_MAX_RETRIES, RetryPolicy};

pub const CONFIG_FILE: &str = "encounter-flow.toml";
pub const MAX_RETRIES_ENV: &str = "ENCOUNTER_FLOW_MAX_RETRIES";

#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Maximum `RETRY` events per export job.
    #[serde(default = "default_max_export_retries")]
    pub max_export_retries: u32,

    /// `tracing` filter used when `RUST_LOG` is unset.
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

fn default_max_export_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

fn default_log_filter() -> String {
    "info".to_string()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_export_retries: default_max_export_retries(),
            log_filter: default_log_filter(),
        }
    }
}

impl EngineConfig {
    /// Load `encounter-flow.toml` from the current directory.
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new(CONFIG_FILE))
    }

    /// Load from `path`, using defaults when the file does not exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            toml::from_str::<EngineConfig>(&contents)
                .with_context(|| format!("failed to parse {}", path.display()))?
        } else {
            Self::default()
        };

        if let Ok(raw) = std::env::var(MAX_RETRIES_ENV) {
            config.apply_max_retries_override(&raw)?;
        }

        Ok(config)
    }

    fn apply_max_retries_override(&mut self, raw: &str) -> Result<()> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Ok(());
        }
        self.max_export_retries = raw
            .parse()
            .with_context(|| format!("{MAX_RETRIES_ENV} must be a non-negative integer, got {raw:?}"))?;
        Ok(())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_export_retries,
        }
    }
}
