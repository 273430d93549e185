//! CLI entry point for the rebalancer.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

use rebalancer::allocation::AllocationPolicy;
use rebalancer::broker;
use rebalancer::config::{Config, TradingMode};
use rebalancer::error::Result;
use rebalancer::execution::{self, RunOptions};
use rebalancer::notify;

#[derive(Parser)]
#[command(name = "rebalancer")]
#[command(about = "Threshold portfolio rebalancer for Alpaca accounts")]
#[command(version)]
struct Cli {
    /// Path to config.toml
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Measure drift and rebalance if any holding is outside its band
    Run {
        /// Path to allocation.json
        allocation: PathBuf,

        /// Trade against the live account instead of paper
        #[arg(long)]
        live: bool,

        /// Show plan without executing
        #[arg(long)]
        dry_run: bool,

        /// Skip confirmation prompt in live mode (for automation/cron)
        #[arg(long)]
        force: bool,
    },

    /// Show current Alpaca positions
    Positions {
        #[arg(long)]
        live: bool,
    },

    /// Check that Alpaca accepts the configured credentials
    Status {
        #[arg(long)]
        live: bool,
    },

    /// Show per-holding drift against the allocation without trading
    Drift {
        /// Path to allocation.json
        allocation: PathBuf,

        #[arg(long)]
        live: bool,
    },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .init();

    let cli = Cli::parse();

    let config = match Config::load(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading config: {e}");
            process::exit(2);
        }
    };

    if let Err(e) = dispatch(&config, cli.command) {
        eprintln!("Error: {e}");
        process::exit(e.exit_code());
    }
}

fn dispatch(config: &Config, command: Command) -> Result<()> {
    match command {
        Command::Run {
            allocation,
            live,
            dry_run,
            force,
        } => {
            let mode = TradingMode::from_live_flag(live);
            let policy = AllocationPolicy::load(&allocation)?;
            let broker = broker::connect(config, mode)?;
            let notifier = notify::from_config(&config.notify, config.request_timeout())?;
            let opts = RunOptions {
                mode,
                dry_run,
                force,
                allocation_file: allocation.display().to_string(),
            };
            let summary = execution::run(config, &policy, &broker, notifier.as_ref(), &opts)?;
            println!("{}", summary.message());
            Ok(())
        }
        Command::Positions { live } => {
            let mode = TradingMode::from_live_flag(live);
            execution::show_positions(&broker::connect(config, mode)?, mode)
        }
        Command::Status { live } => {
            let mode = TradingMode::from_live_flag(live);
            let broker = broker::connect(config, mode)?;
            execution::check_status(&broker, mode, broker.endpoint())
        }
        Command::Drift { allocation, live } => {
            let mode = TradingMode::from_live_flag(live);
            let policy = AllocationPolicy::load(&allocation)?;
            execution::show_drift(&broker::connect(config, mode)?, &policy).map(|_| ())
        }
    }
}
