//! CLI configuration loading and validation

use anyhow::{Context, Result};
use keyward_authz::StoreConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Complete CLI configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CliConfig {
    #[serde(default)]
    pub log: LogSection,

    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub manifest: ManifestSection,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LogSection {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_true")]
    pub with_target: bool,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ManifestSection {
    /// Manifest files, relative paths resolve against the config file
    #[serde(default)]
    pub paths: Vec<PathBuf>,
}

impl Default for LogSection {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            with_target: true,
        }
    }
}

// Default value functions
fn default_true() -> bool { true }
fn default_log_level() -> String { "info".to_string() }

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

impl CliConfig {
    /// Load configuration from TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file {}", path.display()))?;

        let mut config: CliConfig = toml::from_str(&contents)
            .context("Failed to parse configuration file")?;

        if let Some(base) = path.parent() {
            for manifest in &mut config.manifest.paths {
                if manifest.is_relative() {
                    *manifest = base.join(&*manifest);
                }
            }
        }

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if !LOG_LEVELS.contains(&self.log.level.as_str()) {
            anyhow::bail!(
                "Log level must be one of {}, got '{}'",
                LOG_LEVELS.join(", "),
                self.log.level
            );
        }

        if self.store.event_buffer == 0 {
            anyhow::bail!("store.event_buffer must be greater than zero");
        }

        if self.manifest.paths.is_empty() {
            anyhow::bail!("At least one manifest path is required");
        }

        Ok(())
    }
}
