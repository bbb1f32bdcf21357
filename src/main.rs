//! crag-rollup - area statistics rollup
//!
//! Recomputes the rolled-up statistics of every interior area in a
//! directory-backed area store.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (configuration, store access, aborted phase)

mod cli;
mod config;

use anyhow::{Context, Result};
use chrono::Utc;
use cli::Args;
use config::{Config, OutputFormat, CONFIG_FILE};
use crag_rollup::models::{ReportMetadata, RunReport, RunStats};
use crag_rollup::report;
use crag_rollup::rollup::Rollup;
use crag_rollup::store::FsAreaStore;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

/// Number of top-level areas listed in a report.
const REPORT_TOP_AREAS: usize = 20;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Load configuration before logging so `[general] verbose` applies
    let (mut config, source) = match load_config(&args) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    };
    config.merge_with_args(&args);

    // Initialize logging
    init_logging(args.log_level(config.general.verbose));

    info!("crag-rollup v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);
    log_config_source(&source);

    match run_rollup(args, config).await {
        Ok(()) => Ok(()),
        Err(e) => {
            error!("Rollup failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .crag-rollup.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(CONFIG_FILE);

    if path.exists() {
        eprintln!("⚠️  {} already exists. Remove it first or edit it manually.", CONFIG_FILE);
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).with_context(|| format!("Failed to write {}", CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE);
    Ok(())
}

/// Initialize logging at `level`.
fn init_logging(level: tracing::Level) {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

/// Where the configuration came from.
enum ConfigSource {
    Explicit(PathBuf),
    DefaultFile,
    Defaults,
    /// The default file exists but could not be loaded.
    Fallback(anyhow::Error),
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<(Config, ConfigSource)> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        let config = Config::load(config_path)?;
        return Ok((config, ConfigSource::Explicit(config_path.clone())));
    }

    // Try default location
    Ok(match Config::load_default() {
        Ok(Some(config)) => (config, ConfigSource::DefaultFile),
        Ok(None) => (Config::default(), ConfigSource::Defaults),
        Err(e) => (Config::default(), ConfigSource::Fallback(e)),
    })
}

fn log_config_source(source: &ConfigSource) {
    match source {
        ConfigSource::Explicit(path) => info!("Loaded config from: {}", path.display()),
        ConfigSource::DefaultFile => info!("Loaded default config from {}", CONFIG_FILE),
        ConfigSource::Defaults => debug!("No config file found, using defaults"),
        ConfigSource::Fallback(e) => warn!("Failed to load config: {:#}", e),
    }
}

/// Spinner counting written areas, or a hidden bar when disabled.
fn make_progress(enabled: bool) -> Result<ProgressBar> {
    if !enabled {
        return Ok(ProgressBar::hidden());
    }

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}: {pos} areas written")
            .context("Invalid progress template")?,
    );
    pb.enable_steady_tick(Duration::from_millis(120));
    Ok(pb)
}

/// Run the rollup and write the optional report.
async fn run_rollup(args: Args, config: Config) -> Result<()> {
    let store = FsAreaStore::open(&config.store.path)
        .with_context(|| format!("Failed to open area store {}", config.store.path.display()))?;
    info!("Using area store: {}", store.root().display());

    let options = config.rollup_options();
    let progress = make_progress(config.rollup.progress)?;
    let rollup = Rollup::new(&store, options).with_progress(progress.clone());

    println!("🧗 Rolling up area statistics...");
    println!("   Store: {}", store.root().display());
    println!("   Strategy: {}", config.rollup.strategy);
    println!("   Concurrency: {}", rollup.limiter().capacity());

    let started_at = Utc::now();
    let outcome = match args.area {
        Some(ref id) => rollup.refresh_lineage(id).await,
        None => rollup.run(config.rollup.strategy).await,
    };
    progress.finish_and_clear();
    let stats = outcome.context("Rollup aborted")?;
    let finished_at = Utc::now();

    print_summary(&stats);

    if let Some(ref output) = config.report.output {
        let metadata = ReportMetadata {
            store: store.root().display().to_string(),
            strategy: stats.strategy.clone(),
            concurrency: rollup.limiter().capacity(),
            started_at,
            finished_at,
            lineage_of: args.area.clone(),
        };
        let top_areas = report::top_level_summaries(&store, REPORT_TOP_AREAS)
            .await
            .context("Failed to read top-level areas for the report")?;
        let run_report = RunReport {
            metadata,
            stats,
            top_areas,
        };

        let content = match config.report.format {
            OutputFormat::Json => report::generate_json_report(&run_report)?,
            OutputFormat::Markdown => report::generate_markdown_report(&run_report),
        };
        std::fs::write(output, &content)
            .with_context(|| format!("Failed to write report to {}", output.display()))?;
        println!("\n📝 Report saved to: {}", output.display());
    }

    Ok(())
}

/// Print the run summary to stdout.
fn print_summary(stats: &RunStats) {
    println!("\n📊 Rollup Summary:");
    for phase in &stats.phases {
        println!(
            "   - {}: {} visited, {} written ({:.1}s)",
            phase.name, phase.areas_visited, phase.areas_written, phase.duration_seconds
        );
    }
    println!("   Areas written: {}", stats.areas_written);
    println!("   Leaves read: {}", stats.leaves_read);
    println!("   Duration: {:.1}s", stats.duration_seconds);
    println!("\n✅ Rollup complete!");
}
