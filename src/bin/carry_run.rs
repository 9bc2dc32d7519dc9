//! Carry Signal Runner
//!
//! Fetches front/further rows for one symbol, runs the carry pipeline and
//! prints a summary (optionally the last rows, optionally the full series
//! as JSON).
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin carry_run -- --db ./carry.db --symbol RB --tail 5
//! cargo run --bin carry_run -- --json rows.json --symbol CL --output cl_carry.json
//! ```
//!
//! # Exit Codes
//!
//! - 0: Success
//! - 2: Configuration or input error
//! - 3: Runtime error (database, I/O, degenerate signal)

use anyhow::{Context, Result};
use clap::Parser;
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use tracing::{error, info, Level};
use tracing_subscriber::EnvFilter;

use carry_signal::report::CarrySummary;
use carry_signal::source;
use carry_signal::{AppConfig, CarryError, CarryPipeline, CarrySeries};

#[derive(Parser, Debug)]
#[command(name = "carry_run")]
#[command(about = "Compute the risk-adjusted multi-horizon carry forecast for a futures symbol")]
struct Args {
    /// Futures symbol (table prefix in the database)
    #[arg(short, long, env = "CARRY_SYMBOL")]
    symbol: String,

    /// TOML config file (default: $CARRY_CONFIG_PATH or carry_config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// SQLite database, overrides source.db_path
    #[arg(long, env = "CARRY_DB_PATH")]
    db: Option<PathBuf>,

    /// JSON rows file, overrides source.json_path
    #[arg(long)]
    json: Option<PathBuf>,

    /// Write the full series as JSON
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Print the last N rows
    #[arg(short, long, default_value = "0")]
    tail: usize,

    /// Compute horizons in parallel
    #[arg(long)]
    parallel: bool,
}

fn main() {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .init();

    let args = Args::parse();

    let config = match load_config(&args) {
        Ok(c) => c,
        Err(e) => {
            error!("Configuration error: {:#}", e);
            std::process::exit(2);
        }
    };

    let source = match source::from_config(&config.source) {
        Ok(s) => s,
        Err(e) => {
            error!("Source configuration error: {:#}", e);
            std::process::exit(2);
        }
    };

    let batch = match source.fetch(&args.symbol) {
        Ok(b) => b,
        Err(e) => {
            error!(source = source.name(), "Failed to fetch rows: {:#}", e);
            std::process::exit(3);
        }
    };
    batch.report.log();

    let pipeline = CarryPipeline::new(config.signal);
    let series = match pipeline.run(&args.symbol, &batch.rows) {
        Ok(s) => s,
        Err(e) => {
            error!(stage = e.stage(), "Carry pipeline failed: {}", e);
            std::process::exit(exit_code(&e));
        }
    };

    if let Err(e) = emit(&args, &series) {
        error!("Failed to write output: {:#}", e);
        std::process::exit(3);
    }
}

fn load_config(args: &Args) -> Result<AppConfig> {
    let mut config = match &args.config {
        Some(path) => AppConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => AppConfig::from_env(),
    };
    if let Some(db) = &args.db {
        config.source.db_path = Some(db.clone());
    }
    if let Some(json) = &args.json {
        config.source.json_path = Some(json.clone());
    }
    if args.parallel {
        config.signal.parallel_horizons = true;
    }
    config.signal.validate()?;
    Ok(config)
}

fn exit_code(err: &CarryError) -> i32 {
    match err.stage() {
        "input" | "config" | "expiry_diff" => 2,
        _ => 3,
    }
}

fn emit(args: &Args, series: &CarrySeries) -> Result<()> {
    let summary = CarrySummary::from_series(series);
    println!("{}", summary);

    if args.tail > 0 {
        print_tail(series, args.tail);
    }

    if let Some(path) = &args.output {
        let file = File::create(path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        serde_json::to_writer_pretty(BufWriter::new(file), series)?;
        info!(path = %path.display(), "Wrote carry series");
    }

    Ok(())
}

fn print_tail(series: &CarrySeries, n: usize) {
    let horizons: Vec<String> = series
        .calibrations()
        .iter()
        .map(|c| format!("{:>8}", format!("f{}", c.horizon)))
        .collect();
    println!(
        "{:<10} {:>10} {:>10} {:>10} {} {:>8}",
        "date",
        "raw_carry",
        "daily_std",
        "risk_adj",
        horizons.join(" "),
        "final"
    );

    let start = series.len().saturating_sub(n);
    for row in &series.rows()[start..] {
        let forecasts: Vec<String> = row
            .horizons
            .iter()
            .map(|h| format!("{:>8.3}", h.capped_forecast))
            .collect();
        println!(
            "{:<10} {:>10.4} {:>10.6} {:>10.4} {} {:>8.3}",
            row.date,
            row.raw_carry,
            row.daily_std_returns,
            row.risk_adj_annualized_raw_carry,
            forecasts.join(" "),
            row.capped_combined_forecast
        );
    }
}
