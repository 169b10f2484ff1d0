//! Configuration management for Topograph services.
//!
//! Configuration is loaded from (in priority order):
//! 1. Environment variables (`TOPOGRAPH__SECTION__KEY`)
//! 2. Config file (`topograph.toml`, prefix selectable)
//! 3. Defaults

use std::path::PathBuf;

use chrono::TimeDelta;
use serde::Deserialize;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TopographConfig {
    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub pruner: PrunerConfig,

    #[serde(default)]
    pub ingest: IngestConfig,
}

/// Graph store settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StoreConfig {
    /// JSON snapshot loaded on open and written on close. In-memory only if unset.
    #[serde(default)]
    pub snapshot_path: Option<PathBuf>,
}

/// Stale pruner settings.
#[derive(Debug, Clone, Deserialize)]
pub struct PrunerConfig {
    /// Nodes not seen for this many hours are removed.
    #[serde(default = "default_ttl_hours")]
    pub ttl_hours: u64,

    /// Seconds between prune passes in daemon mode.
    #[serde(default = "default_interval")]
    pub interval_secs: u64,

    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl PrunerConfig {
    /// Retention window as a duration; saturates for absurd values.
    pub fn ttl(&self) -> TimeDelta {
        i64::try_from(self.ttl_hours)
            .ok()
            .and_then(TimeDelta::try_hours)
            .unwrap_or(TimeDelta::MAX)
    }
}

impl Default for PrunerConfig {
    fn default() -> Self {
        Self {
            ttl_hours: default_ttl_hours(),
            interval_secs: default_interval(),
            enabled: default_true(),
        }
    }
}

/// Ingest pipeline settings.
#[derive(Debug, Clone, Deserialize)]
pub struct IngestConfig {
    /// Source attribution used when a batch does not name its agent.
    #[serde(default = "default_source")]
    pub default_source: String,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            default_source: default_source(),
        }
    }
}

fn default_ttl_hours() -> u64 {
    24
}

fn default_interval() -> u64 {
    3600
}

fn default_true() -> bool {
    true
}

fn default_source() -> String {
    "cli".to_string()
}

impl TopographConfig {
    /// Load from an optional config file plus `TOPOGRAPH__` environment overrides.
    pub fn load(file_prefix: &str) -> Result<Self, config::ConfigError> {
        let cfg = config::Config::builder()
            .add_source(config::File::with_name(file_prefix).required(false))
            .add_source(
                config::Environment::with_prefix("TOPOGRAPH")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let loaded: Self = cfg.try_deserialize()?;
        tracing::debug!(
            snapshot = ?loaded.store.snapshot_path,
            ttl_hours = loaded.pruner.ttl_hours,
            "Configuration loaded"
        );
        Ok(loaded)
    }
}
