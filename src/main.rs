//! Grid trading engine - main entry point
//!
//! Two subcommands:
//! - run: drive the engine against the in-memory paper exchange
//! - check-config: validate a configuration file and print it

use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use grid_trader::config::Config;
use grid_trader::engine::GridEngine;
use grid_trader::paper::PaperExchange;

#[derive(Parser, Debug)]
#[command(name = "grid-trader")]
#[command(about = "Sliding-window grid trading engine with regime gating", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the engine against the paper exchange
    Run {
        /// Path to configuration file (defaults used when omitted)
        #[arg(short, long)]
        config: Option<String>,

        /// Cycle interval in milliseconds (overrides config)
        #[arg(long)]
        interval_ms: Option<u64>,

        /// Stop after this many cycles (runs until Ctrl+C when omitted)
        #[arg(long)]
        cycles: Option<u64>,

        /// Starting price for the simulated market
        #[arg(long, default_value = "80000")]
        start_price: f64,

        /// Per-order size for the simulated position
        #[arg(long, default_value = "1.0")]
        order_size: f64,

        /// Seed for the simulated price walk
        #[arg(long, default_value = "1")]
        seed: u64,
    },

    /// Validate a configuration file
    CheckConfig {
        /// Path to configuration file
        #[arg(short, long)]
        config: String,
    },
}

fn setup_logging(verbose: bool) -> Result<()> {
    std::fs::create_dir_all("logs")?;
    let log_filename = format!(
        "grid-trader_{}.log",
        chrono::Local::now().format("%Y-%m-%d_%H-%M-%S")
    );

    let level = if verbose { "debug" } else { "info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let file_appender = tracing_appender::rolling::never("logs", &log_filename);

    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_line_number(true)
        .with_file(true)
        .with_ansi(true);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(file_appender)
        .with_target(true)
        .with_line_number(true)
        .with_file(true)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    info!("Logging initialized (logs/{})", log_filename);
    Ok(())
}

fn load_config(path: &Option<String>) -> Result<Config> {
    match path {
        Some(p) => Config::from_file(p),
        None => {
            let config = Config::default();
            config.validate()?;
            Ok(config)
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose)?;

    match cli.command {
        Commands::Run {
            config,
            interval_ms,
            cycles,
            start_price,
            order_size,
            seed,
        } => {
            let config = load_config(&config)?;
            let interval = Duration::from_millis(
                interval_ms.unwrap_or(config.timing.monitor_interval_ms),
            );

            let adapter = PaperExchange::new(start_price, order_size, seed);
            let mut engine = GridEngine::new(config, adapter)?;
            let stop = engine.stop_handle();

            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("Ctrl+C received - finishing the in-flight cycle");
                    stop.stop();
                }
            });

            info!(
                "paper run: start price {}, order size {}, seed {}",
                start_price, order_size, seed
            );
            engine.run(interval, cycles).await;

            let status = engine.status();
            info!(
                "final status: {} cycles, {} orders tracked, last order at {:?}",
                status.cycle_count, status.processed_count, status.last_order_time
            );
            let paper = engine.into_adapter();
            info!(
                "simulation: {} fills, position {:.4}, {} orders still resting",
                paper.fills(),
                paper.quantity(),
                paper.resting_orders()
            );
            Ok(())
        }

        Commands::CheckConfig { config } => {
            let config = Config::from_file(&config)?;
            info!("configuration is valid");
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
    }
}
