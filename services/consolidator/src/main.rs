//! Consolidator Service - Builds the consolidated AI use case inventory
//!
//! Responsibilities:
//! - Read every agency's downloaded inventory file
//! - Map agency-specific columns onto the canonical schema
//! - Normalize stages of development
//! - Write one CSV artifact and append a run log
//!
//! Usage:
//!   # Discover agencies from folders under data/raw:
//!   cargo run --bin consolidator
//!
//!   # From a manifest, without writing anything:
//!   cargo run --bin consolidator -- --manifest config/agencies.json --dry-run
//!
//! CRITICAL: output is DETERMINISTIC
//! Same input files + same schema version = byte-identical artifact

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use consolidator::config::{DEFAULT_DATA_DIR, DEFAULT_LOG_FILE, DEFAULT_OUTPUT};
use consolidator::header::{HeaderPolicy, DEFAULT_MIN_MATCHES, DEFAULT_SCAN_ROWS};
use consolidator::{Config, ConsolidationRun, SCHEMA_VERSION};

#[derive(Parser, Debug)]
#[command(name = "consolidator", about = "Consolidates agency AI use case inventories")]
struct Args {
    /// Agency manifest (JSON). Without it, agency folders are discovered
    #[arg(long, env = "INVENTORY_MANIFEST")]
    manifest: Option<PathBuf>,

    /// Directory holding one folder per agency
    #[arg(long, env = "INVENTORY_DATA_DIR", default_value = DEFAULT_DATA_DIR)]
    data_dir: PathBuf,

    /// Consolidated CSV output
    #[arg(long, env = "INVENTORY_OUTPUT", default_value = DEFAULT_OUTPUT)]
    output: PathBuf,

    /// Run log, appended on every run
    #[arg(long, env = "INVENTORY_LOG_FILE", default_value = DEFAULT_LOG_FILE)]
    log_file: PathBuf,

    /// Rows scanned for the header
    #[arg(long, env = "HEADER_SCAN_ROWS", default_value_t = DEFAULT_SCAN_ROWS)]
    header_scan_rows: usize,

    /// Keyword cells a row needs to count as the header
    #[arg(long, env = "HEADER_MIN_MATCHES", default_value_t = DEFAULT_MIN_MATCHES)]
    header_min_matches: usize,

    /// Dry run - don't write the artifact or the log
    #[arg(long, default_value = "false")]
    dry_run: bool,
}

impl From<Args> for Config {
    fn from(args: Args) -> Self {
        Config {
            manifest: args.manifest,
            data_dir: args.data_dir,
            output: args.output,
            log_file: args.log_file,
            header: HeaderPolicy {
                scan_rows: args.header_scan_rows,
                min_matches: args.header_min_matches,
            },
            dry_run: args.dry_run,
        }
    }
}

fn print_summary(run: &ConsolidationRun, config: &Config) {
    let counts = run.log.counts();
    println!("\n=== Summary ===");
    println!(
        "Sources: {} ({} ok, {} partial, {} failed, {} skipped)",
        counts.total(), counts.ok, counts.partial, counts.failed, counts.skipped
    );
    println!("Total use cases: {}", run.inventory.len());
    for (stage, count) in run.inventory.stage_breakdown() {
        println!("  {}: {}", stage, count);
    }

    let issues = run.log.issues();
    if !issues.is_empty() {
        println!("\nIssues ({}):", issues.len());
        for issue in issues.iter().take(10) {
            println!("  ⚠ {}", issue);
        }
        if issues.len() > 10 {
            println!("  ... and {} more (see log file)", issues.len() - 10);
        }
    }

    if config.dry_run {
        println!("\nDry run - nothing written");
    } else {
        println!("\n✓ Inventory: {}", config.output.display());
        println!("✓ Log: {}", config.log_file.display());
    }
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let config = Config::from(args);

    println!("=== AI Use Case Inventory Consolidator ===");
    println!("Schema version: {}", SCHEMA_VERSION);
    match &config.manifest {
        Some(path) => println!("Manifest: {}", path.display()),
        None => println!("Manifest: discovered from {}", config.data_dir.display()),
    }
    println!("Mode: {}", if config.dry_run { "dry-run" } else { "live" });

    let run = consolidator::run(config.clone())?;
    print_summary(&run, &config);
    Ok(())
}
