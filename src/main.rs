// Strata Miner - Free and Open Source Software Statement
//
// File: src/main.rs
// Version: 3.0.0
// Developer: OIEIEIO <oieieio@protonmail.com>
//
// Command-line entry point: parse arguments, set up logging and run one
// Stratum V1 mining session.

use anyhow::Context;
use clap::Parser;
use log::{LevelFilter, error, info};
use log4rs::append::console::ConsoleAppender;
use log4rs::config::{Appender, Config, Logger, Root};
use log4rs::encode::pattern::PatternEncoder;
use std::process::ExitCode;
use std::str::FromStr;
use strata_miner::core::types::Args;
use strata_miner::miner::CpuMiner;

const LOG_TARGET: &str = "strata::miner::main";
const LOG_PATTERN: &str = "{d(%Y-%m-%d %H:%M:%S)} {h({l:5})} [{T}] {t} - {m}{n}";

/// Console logging; our own targets follow --log-level, dependencies stay at warn
fn init_logging(level: &str) -> anyhow::Result<()> {
    let level = LevelFilter::from_str(level).map_err(|_| anyhow::anyhow!("invalid log level {:?}", level))?;

    let stdout = ConsoleAppender::builder()
        .encoder(Box::new(PatternEncoder::new(LOG_PATTERN)))
        .build();
    let config = Config::builder()
        .appender(Appender::builder().build("stdout", Box::new(stdout)))
        .logger(Logger::builder().build("strata", level))
        .build(Root::builder().appender("stdout").build(LevelFilter::Warn))
        .context("invalid logging configuration")?;

    log4rs::init_config(config).context("failed to initialize logging")?;
    Ok(())
}

async fn run(args: Args) -> anyhow::Result<()> {
    init_logging(&args.log_level)?;
    let config = args.into_config()?;

    info!(target: LOG_TARGET, "⛏️  Strata Miner v{}", env!("CARGO_PKG_VERSION"));
    info!(target: LOG_TARGET, "📍 Pool: {}", config.pool_address());
    info!(target: LOG_TARGET, "💳 Wallet: {}", config.wallet);
    info!(target: LOG_TARGET, "🧵 Threads: {}", config.threads);

    let miner = CpuMiner::new(config);
    miner.run().await.context("mining session failed")?;
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    // Argument errors are reported before logging exists
    if let Err(err) = args.validate() {
        eprintln!("❌ Error: {}", err);
        eprintln!("💡 Run with --help for usage");
        return ExitCode::from(2);
    }

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(target: LOG_TARGET, "{:#}", err);
            eprintln!("❌ Error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}

// Changelog:
// - v3.0.0 (2025-07-02): Single Stratum V1 CPU mining mode.
//   - Logging through log4rs configured from --log-level.
//   - Arguments resolve into MinerConfig; errors surface through anyhow.
//   - Removed feature-selected CPU/GPU/hybrid modes, benchmark, SV2 test and
//     web dashboard.
// - v2.0.0-feature-based: Feature-based mining modes.
