//! Scenario file loading.
//!
//! A scenario is a TOML document naming the ledger variant to replay
//! against, the genesis stakes, and an ordered list of operations.
//!
//! ```toml
//! [ledger]
//! variant = "both"
//!
//! [logging]
//! level = "debug"
//!
//! [[stakes]]
//! address = "alice"
//! stake = 40.0
//!
//! [[ops]]
//! kind = "add_revenue"
//! amount = 100.0
//!
//! [[ops]]
//! kind = "change_stake"
//! address = "alice"
//! delta = -10.0
//! ```

use std::path::PathBuf;

use anyhow::Context;
use revshare_ledger::LedgerConfig;
use serde::{Deserialize, Serialize};

/// Environment variable pointing at the scenario file.
pub const SCENARIO_ENV: &str = "REVSHARE_SCENARIO";

/// Scenario path used when [`SCENARIO_ENV`] is unset.
pub const DEFAULT_SCENARIO_PATH: &str = "scenario.toml";

/// Complete replay scenario.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReplayConfig {
    /// Ledger settings.
    #[serde(default)]
    pub ledger: LedgerSection,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Genesis holders.
    #[serde(default)]
    pub stakes: Vec<GenesisStake>,
    /// Operations, applied in order.
    #[serde(default)]
    pub ops: Vec<Operation>,
}

/// Which ledger implementation(s) to drive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    Naive,
    Scalable,
    #[default]
    Both,
}

/// Ledger configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LedgerSection {
    /// Implementation(s) to replay against.
    #[serde(default)]
    pub variant: Variant,
    /// Accumulator constants for the scalable ledger.
    #[serde(flatten)]
    pub accumulator: LedgerConfig,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: "trace" | "debug" | "info" | "warn" | "error".
    /// `RUST_LOG` takes precedence when set.
    #[serde(default = "default_log_level")]
    pub level: String,
}

/// A holder present before the first operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenesisStake {
    pub address: String,
    pub stake: f64,
}

/// One ledger operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Operation {
    ChangeStake { address: String, delta: f64 },
    AddRevenue { amount: f64 },
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl ReplayConfig {
    /// Load the scenario from [`SCENARIO_ENV`] or [`DEFAULT_SCENARIO_PATH`].
    ///
    /// Unlike daemon-style configs there is no fallback: a missing scenario
    /// is an error.
    pub fn load() -> anyhow::Result<Self> {
        let path = Self::scenario_path();
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("reading scenario {}", path.display()))?;
        Self::from_toml_str(&content).with_context(|| format!("parsing {}", path.display()))
    }

    /// Parse and validate a scenario document.
    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let config: ReplayConfig = toml::from_str(content)?;
        config.ledger.accumulator.validate()?;
        Ok(config)
    }

    /// Genesis stakes as `(address, stake)` pairs.
    pub fn genesis(&self) -> impl Iterator<Item = (&str, f64)> {
        self.stakes.iter().map(|s| (s.address.as_str(), s.stake))
    }

    fn scenario_path() -> PathBuf {
        std::env::var(SCENARIO_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_SCENARIO_PATH))
    }
}
