//! Layered application configuration
//!
//! Sources are merged in order: 1) defaults -> 2) YAML -> 3) env (`GPU_INFO__*`)
//! -> 4) CLI overrides applied by the caller.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Yaml};
use pbs_inventory::{CollectOptions, CommandStatusSource, FieldPolicy};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

/// Prefix of environment overrides, `__` separates nested keys
pub const ENV_PREFIX: &str = "GPU_INFO__";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    #[serde(default)]
    pub status_command: StatusCommandConfig,
    #[serde(default)]
    pub collector: CollectorConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StatusCommandConfig {
    #[serde(default = "default_program")]
    pub program: String,
    /// Arguments placed before the hostname
    #[serde(default)]
    pub args: Vec<String>,
    /// Kill a status command still running after this many seconds
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

fn default_program() -> String {
    pbs_inventory::source::DEFAULT_STATUS_PROGRAM.to_owned()
}

impl Default for StatusCommandConfig {
    fn default() -> Self {
        Self {
            program: default_program(),
            args: Vec::new(),
            timeout_secs: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CollectorConfig {
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Reject unknown CPU and GPU keys instead of keeping them in `extra`
    #[serde(default)]
    pub strict_fields: bool,
}

fn default_concurrency() -> usize {
    1
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            strict_fields: false,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Filter directive used when neither `GPU_INFO_LOG` nor `-v` is given
    #[serde(default = "default_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

fn default_level() -> String {
    "warn".to_owned()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: LogFormat::default(),
        }
    }
}

impl AppConfig {
    /// Merge defaults, the optional YAML file and `GPU_INFO__*` variables.
    ///
    /// # Errors
    ///
    /// Fails if `path` is given but does not exist, or if any layer holds an
    /// invalid or unknown key.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(path) = path {
            if !path.is_file() {
                bail!("config file does not exist: {}", path.display());
            }
            figment = figment.merge(Yaml::file(path));
        }

        figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .context("invalid configuration")
    }

    #[must_use]
    pub fn status_source(&self) -> CommandStatusSource {
        CommandStatusSource::new(&self.status_command.program)
            .with_args(self.status_command.args.iter().cloned())
            .with_timeout(self.status_command.timeout_secs.map(Duration::from_secs))
    }

    #[must_use]
    pub fn collect_options(&self, cancel: Option<CancellationToken>) -> CollectOptions {
        CollectOptions {
            concurrency: self.collector.concurrency,
            field_policy: FieldPolicy::from_strict(self.collector.strict_fields),
            cancel,
        }
    }
}
