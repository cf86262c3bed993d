//! revshare-replay: replay a stake/revenue scenario against the ledgers.
//!
//! Reads the scenario named by `REVSHARE_SCENARIO` (default
//! `./scenario.toml`), applies it to the naive and/or scalable ledger, and
//! prints the final balances as JSON on stdout.

mod config;
mod replay;

use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::ReplayConfig;

fn main() -> anyhow::Result<()> {
    let config = ReplayConfig::load()?;

    let filter = EnvFilter::try_from_default_env().or_else(|_| {
        EnvFilter::try_new(format!("revshare={}", config.logging.level))
    })?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    info!(
        variant = ?config.ledger.variant,
        holders = config.stakes.len(),
        ops = config.ops.len(),
        "replaying scenario"
    );

    let outcome = replay::replay(&config)?;
    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}
