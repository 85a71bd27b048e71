//! CLI entry point for the pairbalance rebalancer.

use std::path::PathBuf;
use std::process;

use anyhow::Context;
use clap::{Parser, Subcommand};

use pairbalance_rebalancer::config::Config;
use pairbalance_rebalancer::error::Error;
use pairbalance_rebalancer::execution::{self, RunOptions};

#[derive(Parser)]
#[command(name = "rebalancer")]
#[command(about = "Two-token 50/50 rebalancer: Solana wallet → Jupiter")]
#[command(version)]
struct Cli {
    /// Path to the TOML settings file (optional; defaults apply when missing)
    #[arg(long, default_value = "rebalancer.toml")]
    config: PathBuf,

    /// Load environment variables from this file instead of ./.env
    #[arg(long)]
    env_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Evaluate now and then every poll interval, swapping when drift exceeds the threshold
    Run {
        /// Evaluate and record the baseline, but never submit swaps
        #[arg(long)]
        dry_run: bool,

        /// Stop after this many ticks
        #[arg(long)]
        ticks: Option<u64>,
    },

    /// Evaluate once without persisting or swapping
    Status,

    /// Show the recorded baseline
    Baseline {
        /// Delete the baseline files so the next tick records a new one
        #[arg(long)]
        reset: bool,

        /// Skip confirmation prompt
        #[arg(long)]
        force: bool,
    },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        match e.downcast_ref::<Error>() {
            Some(Error::Aborted(msg)) => {
                eprintln!("Aborted: {msg}");
                process::exit(0);
            }
            _ => {
                eprintln!("Error: {e:#}");
                process::exit(1);
            }
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::load(&cli.config, cli.env_file.as_deref())
        .context("loading configuration")?;

    match cli.command {
        Command::Run { dry_run, ticks } => {
            let opts = RunOptions { dry_run, ticks };
            execution::run(&config, &opts).context("starting rebalancer")?;
        }
        Command::Status => execution::check_status(&config).context("checking status")?,
        Command::Baseline { reset, force } => execution::show_baseline(&config, reset, force)?,
    }
    Ok(())
}
