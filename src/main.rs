mod bracket;
mod engine;
mod gas;
mod ledger;
mod reader;
mod resolver;
mod settings;
mod ticker;

use crate::engine::Reconciler;
use crate::gas::GasOracle;
use crate::ledger::rpc::RpcLedger;
use crate::settings::Settings;
use crate::ticker::Ticker;
use anyhow::Context;
use log::info;
use ncaa_api::client::NcaaApi;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Once,
    Watch,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let Some(mode) = handle_cli_args() else {
        return Ok(());
    };

    better_panic::install();

    let settings = Settings::load().context("loading settings")?;
    init_logging(settings.log_filter.as_deref())?;
    info!("bracket-keeper {} for season {}", env!("CARGO_PKG_VERSION"), settings.season);

    let ledger = RpcLedger::connect(&settings).await.context("connecting to the ledger")?;
    let feed = NcaaApi::new(settings.results_url.clone());
    let oracle = GasOracle::new(settings.gas_oracle_url.clone(), settings.gas_oracle_key.clone());
    let reconciler = Reconciler::new(Arc::new(ledger), Arc::new(feed), Arc::new(oracle), settings.season);
    let ticker = Ticker::new(Arc::new(reconciler), settings.tick_interval);

    match mode {
        Mode::Once => {
            ticker.run_once().await;
        }
        Mode::Watch => {
            info!("watching, one tick every {}s", settings.tick_interval.as_secs());
            tokio::select! {
                _ = ticker.run() => {}
                _ = tokio::signal::ctrl_c() => info!("interrupted, stopping"),
            }
        }
    }

    Ok(())
}

fn init_logging(filter: Option<&str>) -> anyhow::Result<()> {
    let filter = filter
        .map(EnvFilter::new)
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .map_err(|e| anyhow::anyhow!("installing logger: {e}"))
}

fn handle_cli_args() -> Option<Mode> {
    let mut args = std::env::args().skip(1);
    let Some(arg) = args.next() else {
        return Some(Mode::Once);
    };

    match arg.as_str() {
        "--once" => Some(Mode::Once),
        "--watch" => Some(Mode::Watch),
        "-h" | "--help" => {
            println!("{}", usage_text());
            None
        }
        "-V" | "--version" => {
            println!("bracket-keeper {}", env!("CARGO_PKG_VERSION"));
            None
        }
        _ => {
            eprintln!("Unknown argument: {arg}\n\n{}", usage_text());
            std::process::exit(2);
        }
    }
}

fn usage_text() -> &'static str {
    "bracket-keeper - keeps an on-chain NCAA tournament bracket in step with real results

Usage:
  bracket-keeper [--once]     run one reconciliation tick and exit
  bracket-keeper --watch      tick every KEEPER_TICK_SECS until interrupted
  bracket-keeper --help
  bracket-keeper --version

Environment:
  KEEPER_RPC_URL               JSON-RPC endpoint of the chain
  KEEPER_PRIVATE_KEY           hex signing key for ledger writes
  KEEPER_CONTRACT              bracket contract address
  KEEPER_RESULTS_URL           season schedule document URL
  KEEPER_GAS_ORACLE_URL        gas price oracle endpoint
  KEEPER_GAS_ORACLE_KEY        gas price oracle API key
  KEEPER_SEASON                tournament year (default: current season)
  KEEPER_CHAIN_ID              chain id (default: asked from the node)
  KEEPER_TICK_SECS             watch period in seconds (default 300)
  KEEPER_CONFIRM_TIMEOUT_SECS  wait for inclusion (default 120)
  KEEPER_LOG                   log filter, e.g. info or bracket_keeper=debug"
}
