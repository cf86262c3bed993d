//! Integration test fixtures for the revshare ledgers.
//!
//! The tests in `tests/` drive [`NaiveLedger`](revshare_ledger::NaiveLedger)
//! and [`ScalableLedger`](revshare_ledger::ScalableLedger) through the same
//! operation streams and compare them.
//!
//! Run all integration tests:
//! ```sh
//! cargo test -p revshare-integration-tests
//! ```

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use revshare_ledger::RevenueLedger;

/// One generated ledger operation.
#[derive(Clone, Debug, PartialEq)]
pub enum Step {
    Stake { address: String, delta: f64 },
    Revenue { amount: f64 },
}

/// Seeded generator of interleaved stake changes and revenue injections.
///
/// Stakes move in tenths of a unit, which are not exact in `f64`, so the
/// streams exercise rounding in the total stake. Withdrawals are either
/// partial or the holder's whole stake, and a small share of them overdraw
/// on purpose.
pub struct StepGenerator {
    rng: StdRng,
    addresses: Vec<String>,
    revenue_probability: f64,
}

impl StepGenerator {
    /// Create a generator over `holders` addresses named `h0..hN`.
    pub fn new(seed: u64, holders: usize) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            addresses: (0..holders).map(|i| format!("h{i}")).collect(),
            revenue_probability: 0.4,
        }
    }

    /// Set the chance that a step is a revenue injection.
    pub fn with_revenue_probability(mut self, probability: f64) -> Self {
        self.revenue_probability = probability;
        self
    }

    /// Addresses the generator draws from.
    pub fn addresses(&self) -> &[String] {
        &self.addresses
    }

    /// Produce the next step given the current state of a reference ledger.
    pub fn next_step(&mut self, reference: &impl RevenueLedger) -> Step {
        if self.rng.gen_bool(self.revenue_probability) {
            let amount = f64::from(self.rng.gen_range(1..=1_000u32)) / 4.0;
            return Step::Revenue { amount };
        }

        let address = self.addresses[self.rng.gen_range(0..self.addresses.len())].clone();
        let stake = reference.stake_of(&address);
        let roll: f64 = self.rng.gen();
        let tenths = (stake * 10.0) as u32;
        let delta = if stake > 0.0 && roll < 0.15 {
            -stake
        } else if tenths >= 1 && roll < 0.4 {
            -f64::from(self.rng.gen_range(1..=tenths)) / 10.0
        } else if roll < 0.45 {
            -(stake + 1.0)
        } else {
            f64::from(self.rng.gen_range(1..=400u32)) / 10.0
        };
        Step::Stake { address, delta }
    }
}

/// Apply a step to any ledger.
pub fn apply(ledger: &mut impl RevenueLedger, step: &Step) -> revshare_ledger::Result<()> {
    match step {
        Step::Stake { address, delta } => ledger.change_stake(address, *delta),
        Step::Revenue { amount } => ledger.add_revenue(*amount),
    }
}

/// Relative closeness with an absolute floor of `tolerance` near zero.
pub fn approx_eq(a: f64, b: f64, tolerance: f64) -> bool {
    (a - b).abs() <= tolerance * a.abs().max(b.abs()).max(1.0)
}
