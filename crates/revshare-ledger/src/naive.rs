//! Eager revenue distribution.
//!
//! Every injection walks the whole holder store and credits each holder
//! its proportional share immediately, so balances are always current at
//! a cost of O(holders) per injection.
//!
//! ## Formula
//!
//! ```text
//! holder.accrued += (holder.stake / total_stake) * amount
//! ```

use serde::{Deserialize, Serialize};

use crate::contract::RevenueLedger;
use crate::snapshot::{HolderBalance, LedgerSnapshot};
use crate::store::HolderStore;
use crate::tally::StakeTally;
use crate::{check_genesis_stake, check_revenue, LedgerError, Result};

/// Per-holder state of the eager ledger.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NaiveRecord {
    /// Current stake.
    pub stake: f64,
    /// Realized revenue, never decreasing.
    pub accrued_revenue: f64,
}

/// Ledger that settles every holder on every injection.
#[derive(Debug, Clone, Default)]
pub struct NaiveLedger {
    stakes: StakeTally,
    holders: HolderStore<NaiveRecord>,
}

impl NaiveLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a ledger whose holders start with the given stakes.
    ///
    /// Repeated addresses accumulate.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::InvalidArgument`] if any address is empty or any
    ///   stake is not strictly positive and finite
    /// - [`LedgerError::Overflow`] if the total stake is not finite
    pub fn from_stakes<I, A>(stakes: I) -> Result<Self>
    where
        I: IntoIterator<Item = (A, f64)>,
        A: AsRef<str>,
    {
        let mut ledger = Self::new();
        for (address, stake) in stakes {
            let address = address.as_ref();
            check_genesis_stake(address, stake)?;
            ledger.apply_stake_change(address, stake)?;
        }
        tracing::debug!(
            holders = ledger.holders.len(),
            total_stake = ledger.stakes.total(),
            "naive ledger: genesis loaded"
        );
        Ok(ledger)
    }

    /// Borrow the holder store.
    pub fn holders(&self) -> &HolderStore<NaiveRecord> {
        &self.holders
    }

    fn apply_stake_change(&mut self, address: &str, delta: f64) -> Result<()> {
        let mut holder = self.holders.get_or_default(address);
        let change = self.stakes.plan(address, holder.stake, delta)?;

        self.stakes = change.tally;
        holder.stake = change.new_stake;
        self.holders.upsert(address, holder);

        tracing::trace!(
            address,
            delta,
            stake = change.new_stake,
            total_stake = self.stakes.total(),
            "naive ledger: stake changed"
        );
        Ok(())
    }

    fn distribute(&mut self, amount: f64) -> Result<()> {
        check_revenue(amount)?;
        if self.stakes.staked_holders() == 0 {
            return Err(LedgerError::DegenerateDistribution { amount });
        }

        let total = self.stakes.total();
        self.holders.for_each_mut(|_, holder| {
            holder.accrued_revenue += (holder.stake / total) * amount;
        });

        tracing::trace!(
            amount,
            holders = self.holders.len(),
            "naive ledger: revenue distributed"
        );
        Ok(())
    }
}

impl RevenueLedger for NaiveLedger {
    fn change_stake(&mut self, address: &str, delta: f64) -> Result<()> {
        self.apply_stake_change(address, delta).map_err(|err| {
            tracing::warn!(address, delta, %err, "naive ledger: stake change rejected");
            err
        })
    }

    fn add_revenue(&mut self, amount: f64) -> Result<()> {
        self.distribute(amount).map_err(|err| {
            tracing::warn!(amount, %err, "naive ledger: revenue rejected");
            err
        })
    }

    fn query_accrued(&self, address: &str) -> f64 {
        self.holders
            .get(address)
            .map_or(0.0, |holder| holder.accrued_revenue)
    }

    fn stake_of(&self, address: &str) -> f64 {
        self.holders.get(address).map_or(0.0, |holder| holder.stake)
    }

    fn total_stake(&self) -> f64 {
        self.stakes.total()
    }

    fn holder_count(&self) -> usize {
        self.holders.len()
    }

    fn record_touches(&self) -> u64 {
        self.holders.touches()
    }

    fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot {
            total_stake: self.stakes.total(),
            holders: self
                .holders
                .iter()
                .map(|(address, holder)| HolderBalance {
                    address: address.to_string(),
                    stake: holder.stake,
                    accrued: holder.accrued_revenue,
                })
                .collect(),
        }
    }
}
