use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use leadminer::cli::Cli;
use leadminer::config::{AppConfig, ConfigError};
use leadminer::enrich::EnrichPolicy;
use leadminer::pool::SessionPool;
use leadminer::scheduler::Scheduler;
use leadminer::store::Dataset;

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("leadminer={}", default_level)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

// Page fetches run on blocking threads but all pipeline state is
// single-threaded, so the current-thread runtime is enough.
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    if cli.init {
        match AppConfig::create_default_config() {
            Ok(path) => {
                println!("Created default configuration file at: {}", path.display());
                println!("Edit this file to customize settings, then run leadminer again.");
                return Ok(());
            }
            Err(e) => {
                eprintln!("Failed to create configuration file: {}", e);
                std::process::exit(1);
            }
        }
    }

    let input = match cli.validate() {
        Ok(path) => path.to_path_buf(),
        Err(msg) => {
            eprintln!("Error: {}", msg);
            std::process::exit(1);
        }
    };

    let mut config = match AppConfig::load() {
        Ok(cfg) => cfg,
        Err(ConfigError::FileNotFound(path)) => {
            eprintln!("Configuration file not found at: {}", path.display());
            eprintln!("Run with --init to create a default configuration file.");
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };
    cli.apply_overrides(&mut config);
    if let Err(e) = config.validate() {
        eprintln!("Invalid configuration: {}", e);
        std::process::exit(1);
    }

    let dataset = match Dataset::load(&input) {
        Ok(dataset) => dataset,
        Err(e) => {
            eprintln!("Failed to load dataset: {}", e);
            std::process::exit(1);
        }
    };
    info!(
        "loaded {} records from {}",
        dataset.records.len(),
        input.display()
    );

    let pool = SessionPool::launch(&config.fetch)?;
    let policy = EnrichPolicy::from_config(&config);
    let started = std::time::Instant::now();
    let stats = Scheduler::new(dataset, policy).run(pool.into_sessions()).await;

    println!();
    println!("=== ENRICHMENT SUMMARY ===");
    println!("Records eligible:  {}", stats.queued);
    println!("Contacts found:    {}", stats.enriched);
    println!("Nothing found:     {}", stats.empty);
    println!("Elapsed:           {:.1}s", started.elapsed().as_secs_f64());

    Ok(())
}
