//! Forked-network arbitrage harness
//!
//! Usage:
//!   dexarb-harness manipulate            # dump tokens, report before/after price
//!   dexarb-harness verify                # manipulate + executeTrade + profit check
//!
//! Reads addresses from the environment, plus `.env` when present (or the
//! file named by `--env-file`). `--scenario` points at an optional TOML file
//! overriding individual scenario knobs.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dexarb_harness::config::{load_config_from, ScenarioOverrides};
use dexarb_harness::harness::{ArbitrageVerificationHarness, ManipulationReport};
use dexarb_harness::node::RpcDevNode;
use dexarb_harness::types::Exchange;
use dexarb_harness::units::from_smallest_unit;
use alloy::providers::{Provider, ProviderBuilder};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

/// Price manipulation + arbitrage verification on a local fork
#[derive(Parser)]
#[command(name = "dexarb-harness")]
struct Args {
    /// Env file with RPC and contract addresses (default: `.env` if present)
    #[arg(long, env = "ENV_FILE")]
    env_file: Option<String>,

    /// TOML file overriding scenario parameters
    #[arg(long)]
    scenario: Option<PathBuf>,

    /// Emit JSON logs and a JSON report
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Dump the whale's tokens and report the price move
    Manipulate {
        /// Whole tokens to dump (overrides DUMP_AMOUNT)
        #[arg(long)]
        amount: Option<String>,
        /// Exchange to manipulate (uniswap, sushiswap)
        #[arg(long)]
        exchange: Option<Exchange>,
    },
    /// Manipulate, then require the arbitrage contract to profit
    Verify,
}

fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if json {
        fmt().json().with_env_filter(filter).init();
    } else {
        fmt().with_env_filter(filter).with_target(false).init();
    }
}

fn print_manipulation(report: &ManipulationReport) {
    println!();
    println!("┌──────────────────┬──────────────────────────────────────────┐");
    for (label, value) in report.rows() {
        println!("│ {:<16} │ {:<40} │", label, value);
    }
    println!("└──────────────────┴──────────────────────────────────────────┘");
    println!(
        "\nBalance in receiver account [{:?}]: {} {}\n",
        report.recipient,
        from_smallest_unit(report.recipient_quote_balance, report.quote.decimals),
        report.quote.symbol
    );
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.json);

    let mut config = load_config_from(args.env_file.as_deref())?;
    info!(
        "Configuration loaded from {}",
        args.env_file.as_deref().unwrap_or("environment")
    );

    if let Some(path) = &args.scenario {
        ScenarioOverrides::load(path)?.apply_to(&mut config.scenario)?;
        info!("Scenario overrides loaded from {}", path.display());
    }
    if let Command::Manipulate { amount, exchange } = &args.command {
        if let Some(amount) = amount {
            config.scenario.dump_amount = amount.clone();
        }
        if let Some(exchange) = exchange {
            config.scenario.manipulate_on = *exchange;
        }
    }

    let provider = ProviderBuilder::new()
        .connect(&config.rpc_url)
        .await
        .with_context(|| format!("Failed to connect to {}", config.rpc_url))?;
    let block = provider.get_block_number().await?;
    info!("Connected! Current block: {}", block);

    let node = RpcDevNode::connect(provider.clone(), config.node_flavor).await?;
    info!("Node flavor: {}", node.flavor());

    let harness = ArbitrageVerificationHarness::new(provider, node, config);

    match args.command {
        Command::Manipulate { .. } => {
            let report = harness.manipulate().await?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_manipulation(&report);
            }
        }
        Command::Verify => {
            let report = harness.verify().await?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_manipulation(&report.manipulation);
                println!(
                    "Arbitrage profit: {} {} (flash amount {})",
                    from_smallest_unit(report.profit, report.manipulation.quote.decimals),
                    report.manipulation.quote.symbol,
                    report.flash_amount
                );
            }
        }
    }

    Ok(())
}
