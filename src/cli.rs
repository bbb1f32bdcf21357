//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::config::OutputFormat;
use clap::Parser;
use crag_rollup::rollup::Strategy;
use std::path::PathBuf;

/// crag-rollup - recompute area statistics from the crags up
///
/// Walks the area tree and refreshes climb totals, bounding boxes,
/// centroids, densities and grade breakdowns on every interior area.
///
/// Examples:
///   crag-rollup --store ./areas
///   crag-rollup --store ./areas --strategy level-order --concurrency 64
///   crag-rollup --store ./areas --area some-crag-id
///   crag-rollup --store ./areas --report rollup.md
///   crag-rollup --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Directory of area documents (one `<id>.json` per area)
    ///
    /// Defaults to the `[store] path` setting, or `./areas`.
    #[arg(short, long, value_name = "DIR", env = "CRAG_ROLLUP_STORE")]
    pub store: Option<PathBuf>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .crag-rollup.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Maximum store operations in flight at once
    #[arg(long, value_name = "NUM", env = "CRAG_ROLLUP_CONCURRENCY")]
    pub concurrency: Option<usize>,

    /// Traversal strategy
    #[arg(long, value_name = "STRATEGY")]
    pub strategy: Option<Strategy>,

    /// Only refresh this area and its ancestors
    #[arg(long, value_name = "ID")]
    pub area: Option<String>,

    /// Floor for box areas in the density calculation, in km²
    #[arg(long, value_name = "KM2")]
    pub min_area_km2: Option<f64>,

    /// Merge malformed aggregates with a warning instead of failing
    #[arg(long)]
    pub lenient: bool,

    /// Write a run report to this file
    #[arg(long, value_name = "FILE")]
    pub report: Option<PathBuf>,

    /// Report format (markdown, json)
    #[arg(long, value_name = "FORMAT")]
    pub format: Option<OutputFormat>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (errors only, no progress)
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate a default .crag-rollup.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        if self.init_config {
            return Ok(());
        }

        if self.concurrency == Some(0) {
            return Err("Concurrency must be at least 1".to_string());
        }

        if let Some(min_area) = self.min_area_km2 {
            if !min_area.is_finite() || min_area < 0.0 {
                return Err("Minimum area must be a non-negative number".to_string());
            }
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(ref area) = self.area {
            if area.trim().is_empty() {
                return Err("Area id must not be empty".to_string());
            }
        }

        if let Some(ref store) = self.store {
            if !store.exists() {
                return Err(format!("Store directory does not exist: {}", store.display()));
            }
            if !store.is_dir() {
                return Err(format!("Store path is not a directory: {}", store.display()));
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    ///
    /// `config_verbose` is the `[general] verbose` setting; `--quiet` wins
    /// over both.
    pub fn log_level(&self, config_verbose: bool) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose || config_verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
