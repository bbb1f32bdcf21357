//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.crag-rollup.toml` files.

use anyhow::{Context, Result};
use crag_rollup::geo::DensityModel;
use crag_rollup::rollup::{RollupOptions, Strategy, DEFAULT_CONCURRENCY};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Name of the configuration file looked up in the working directory.
pub const CONFIG_FILE: &str = ".crag-rollup.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Area store settings.
    #[serde(default)]
    pub store: StoreConfig,

    /// Traversal settings.
    #[serde(default)]
    pub rollup: RollupConfig,

    /// Density settings.
    #[serde(default)]
    pub density: DensityModel,

    /// Report settings.
    #[serde(default)]
    pub report: ReportConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,

    /// Maximum store operations in flight at once.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            verbose: false,
            concurrency: default_concurrency(),
        }
    }
}

fn default_concurrency() -> usize {
    DEFAULT_CONCURRENCY
}

/// Area store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Directory holding one JSON document per area.
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

fn default_store_path() -> PathBuf {
    PathBuf::from("areas")
}

/// Traversal settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RollupConfig {
    /// Traversal strategy.
    #[serde(default)]
    pub strategy: Strategy,

    /// Abort when a child aggregate is malformed (otherwise warn).
    #[serde(default = "default_true")]
    pub strict_aggregates: bool,

    /// Show a progress spinner.
    #[serde(default = "default_true")]
    pub progress: bool,
}

impl Default for RollupConfig {
    fn default() -> Self {
        Self {
            strategy: Strategy::default(),
            strict_aggregates: true,
            progress: true,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Report output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

/// Report settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Report format.
    #[serde(default)]
    pub format: OutputFormat,

    /// Where to write the report; no report when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings, but only
    /// when they were given.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref store) = args.store {
            self.store.path = store.clone();
        }
        if let Some(concurrency) = args.concurrency {
            self.general.concurrency = concurrency;
        }
        if let Some(strategy) = args.strategy {
            self.rollup.strategy = strategy;
        }
        if let Some(min_area) = args.min_area_km2 {
            self.density.min_area_km2 = min_area;
        }
        if let Some(ref output) = args.report {
            self.report.output = Some(output.clone());
        }
        if let Some(format) = args.format {
            self.report.format = format;
        }

        // Flags always override
        if args.lenient {
            self.rollup.strict_aggregates = false;
        }
        if args.verbose {
            self.general.verbose = true;
        }
        if args.quiet {
            self.rollup.progress = false;
        }
    }

    /// Engine options derived from this configuration.
    pub fn rollup_options(&self) -> RollupOptions {
        RollupOptions {
            concurrency: self.general.concurrency,
            density: self.density,
            strict_aggregates: self.rollup.strict_aggregates,
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.general.concurrency, 1000);
        assert_eq!(config.store.path, PathBuf::from("areas"));
        assert_eq!(config.rollup.strategy, Strategy::TwoPhase);
        assert!(config.rollup.strict_aggregates);
        assert_eq!(config.density.min_area_km2, 5.0);
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[general]
verbose = true
concurrency = 16

[store]
path = "/data/areas"

[rollup]
strategy = "level-order"
strict_aggregates = false

[density]
min_area_km2 = 1.0

[report]
format = "json"
output = "rollup.json"
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert!(config.general.verbose);
        assert_eq!(config.general.concurrency, 16);
        assert_eq!(config.store.path, PathBuf::from("/data/areas"));
        assert_eq!(config.rollup.strategy, Strategy::LevelOrder);
        assert!(!config.rollup.strict_aggregates);
        assert!(config.rollup.progress);
        assert_eq!(config.density.min_area_km2, 1.0);
        assert_eq!(config.report.format, OutputFormat::Json);
        assert_eq!(config.report.output, Some(PathBuf::from("rollup.json")));
    }

    #[test]
    fn test_rollup_options_from_config() {
        let mut config = Config::default();
        config.general.concurrency = 8;
        config.rollup.strict_aggregates = false;

        let options = config.rollup_options();
        assert_eq!(options.concurrency, 8);
        assert!(!options.strict_aggregates);
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(!toml_str.is_empty());
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[rollup]"));
        assert!(toml_str.contains("[density]"));

        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.general.concurrency, 1000);
    }

    #[test]
    fn test_verbose_setting_raises_log_level() {
        use clap::Parser;

        let mut config: Config = toml::from_str("[general]\nverbose = true\n").unwrap();
        let args = crate::cli::Args::try_parse_from(["crag-rollup"]).unwrap();
        config.merge_with_args(&args);

        assert!(config.general.verbose);
        assert_eq!(args.log_level(config.general.verbose), tracing::Level::DEBUG);
    }
}
