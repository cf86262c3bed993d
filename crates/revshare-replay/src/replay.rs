//! Drive a ledger through a scenario and summarize the outcome.

use std::collections::BTreeMap;

use revshare_ledger::{
    LedgerConfig, LedgerSnapshot, NaiveLedger, Result, RevenueLedger, ScalableLedger,
};
use serde::Serialize;

use crate::config::{Operation, ReplayConfig, Variant};

/// Relative tolerance when comparing the two ledgers.
pub const DIVERGENCE_TOLERANCE: f64 = 1e-6;

/// Outcome of replaying a scenario against one ledger.
#[derive(Debug, Clone, Serialize)]
pub struct ReplayReport {
    /// Ledger implementation name.
    pub variant: &'static str,
    /// Operations that committed.
    pub applied: usize,
    /// Rejected operations, keyed by error category.
    pub rejected: BTreeMap<String, usize>,
    /// Final ledger state.
    pub snapshot: LedgerSnapshot,
    /// Settled plus pending revenue per holder.
    pub projected: BTreeMap<String, f64>,
    /// Holder records read or written over the whole replay.
    pub record_touches: u64,
}

/// Reports for every requested variant, plus the worst disagreement
/// between them when both ran.
#[derive(Debug, Clone, Serialize)]
pub struct ReplayOutcome {
    pub reports: Vec<ReplayReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_divergence: Option<f64>,
}

/// Apply `ops` to `ledger` in order. Rejections are counted, not fatal.
pub fn run<L: RevenueLedger>(
    variant: &'static str,
    mut ledger: L,
    ops: &[Operation],
) -> ReplayReport {
    let mut applied = 0;
    let mut rejected: BTreeMap<String, usize> = BTreeMap::new();

    for (step, op) in ops.iter().enumerate() {
        let result = match op {
            Operation::ChangeStake { address, delta } => ledger.change_stake(address, *delta),
            Operation::AddRevenue { amount } => ledger.add_revenue(*amount),
        };
        match result {
            Ok(()) => applied += 1,
            Err(err) => {
                tracing::info!(variant, step, ?op, %err, "operation rejected");
                *rejected.entry(format!("{:?}", err.kind())).or_default() += 1;
            }
        }
    }

    let snapshot = ledger.snapshot();
    let projected = snapshot
        .holders
        .iter()
        .map(|h| (h.address.clone(), ledger.projected_accrued(&h.address)))
        .collect();

    tracing::info!(
        variant,
        applied,
        rejected = ops.len() - applied,
        holders = ledger.holder_count(),
        total_stake = ledger.total_stake(),
        "replay finished"
    );

    ReplayReport {
        variant,
        applied,
        rejected,
        snapshot,
        projected,
        record_touches: ledger.record_touches(),
    }
}

/// Replay the scenario against the configured variant(s).
pub fn replay(config: &ReplayConfig) -> Result<ReplayOutcome> {
    let accumulator: LedgerConfig = config.ledger.accumulator;
    let mut reports = Vec::new();

    if matches!(config.ledger.variant, Variant::Naive | Variant::Both) {
        let ledger = NaiveLedger::from_stakes(config.genesis())?;
        reports.push(run("naive", ledger, &config.ops));
    }
    if matches!(config.ledger.variant, Variant::Scalable | Variant::Both) {
        let ledger = ScalableLedger::from_stakes_with_config(config.genesis(), accumulator)?;
        reports.push(run("scalable", ledger, &config.ops));
    }

    let max_divergence = match reports.as_slice() {
        [naive, scalable] => {
            let divergence = max_divergence(naive, scalable);
            if divergence > DIVERGENCE_TOLERANCE {
                tracing::warn!(divergence, "naive and scalable ledgers disagree");
            }
            Some(divergence)
        }
        _ => None,
    };

    Ok(ReplayOutcome {
        reports,
        max_divergence,
    })
}

/// Largest relative difference in projected revenue over all holders.
fn max_divergence(a: &ReplayReport, b: &ReplayReport) -> f64 {
    a.projected
        .iter()
        .map(|(address, &x)| {
            let y = b.projected.get(address).copied().unwrap_or(0.0);
            (x - y).abs() / x.abs().max(y.abs()).max(1.0)
        })
        .fold(0.0, f64::max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GenesisStake;

    fn scenario(variant: Variant) -> ReplayConfig {
        ReplayConfig {
            ledger: crate::config::LedgerSection {
                variant,
                accumulator: LedgerConfig::default(),
            },
            stakes: vec![
                GenesisStake {
                    address: "A".to_string(),
                    stake: 40.0,
                },
                GenesisStake {
                    address: "B".to_string(),
                    stake: 60.0,
                },
            ],
            ops: vec![
                Operation::AddRevenue { amount: 100.0 },
                Operation::ChangeStake {
                    address: "A".to_string(),
                    delta: 1.0,
                },
                Operation::ChangeStake {
                    address: "B".to_string(),
                    delta: -61.0,
                },
                Operation::AddRevenue { amount: 0.0 },
            ],
            ..ReplayConfig::default()
        }
    }

    #[test]
    fn test_replay_both_agree() {
        let outcome = replay(&scenario(Variant::Both)).expect("replay");
        assert_eq!(outcome.reports.len(), 2);
        let divergence = outcome.max_divergence.expect("both variants ran");
        assert!(divergence < DIVERGENCE_TOLERANCE);

        for report in &outcome.reports {
            assert_eq!(report.applied, 2);
            assert_eq!(report.rejected.get("Underflow"), Some(&1));
            assert_eq!(report.rejected.get("InvalidArgument"), Some(&1));
            let a = report.projected.get("A").copied().unwrap_or_default();
            assert!((a - 40.0).abs() < 1e-6, "{}: {a}", report.variant);
        }
    }

    #[test]
    fn test_replay_single_variant() {
        let outcome = replay(&scenario(Variant::Scalable)).expect("replay");
        assert_eq!(outcome.reports.len(), 1);
        assert_eq!(outcome.reports[0].variant, "scalable");
        assert!(outcome.max_divergence.is_none());
    }

    #[test]
    fn test_example_scenario() {
        let config =
            ReplayConfig::from_toml_str(include_str!("../scenario.example.toml")).expect("parse");
        let outcome = replay(&config).expect("replay");
        assert!(outcome.max_divergence.expect("both variants ran") < DIVERGENCE_TOLERANCE);

        for report in &outcome.reports {
            assert_eq!(report.applied, 5);
            assert_eq!(report.rejected.get("Underflow"), Some(&1));
            assert_eq!(report.snapshot.total_stake, 25.0);
            // alice: 40, bob: 60 + 85 * 60/85, carol: 85 * 25/85
            let expect = [("alice", 40.0), ("bob", 120.0), ("carol", 25.0)];
            for (address, value) in expect {
                let got = report.projected.get(address).copied().unwrap_or_default();
                assert!((got - value).abs() < 1e-6, "{}: {address} {got}", report.variant);
            }
        }
    }

    #[test]
    fn test_replay_bad_genesis() {
        let mut config = scenario(Variant::Naive);
        config.stakes[0].stake = -1.0;
        assert!(replay(&config).is_err());
    }
}
