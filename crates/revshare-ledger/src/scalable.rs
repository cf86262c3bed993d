//! Accumulator ledger with deferred settlement.
//!
//! Revenue injection never visits a holder. Instead a global accumulator
//! `index` grows by `scale_factor * amount`, and each holder remembers the
//! global state at its last settlement. The next time the holder's stake
//! changes, the revenue it earned in between is realized in one step.
//!
//! ## Formula
//!
//! ```text
//! add_revenue:  index += scale_factor * amount
//! settlement:   accrued += (index - snap.index) * stake
//!                          / (snap.scale_factor * snap.total_stake)
//! ```
//!
//! ## Scale factor
//!
//! While total stake is positive the ledger keeps
//! `scale_factor * total_stake == scale_init`, i.e. every stake change
//! multiplies the scale factor by `old_total / new_total`. Each increment of
//! `index` is then `scale_init * amount / total_stake`, and every snapshot
//! taken by a staked holder carries the same divisor `scale_init`, so the
//! settlement above is exact no matter how many other holders changed their
//! stake in between. When total stake drops to zero the factor resets to
//! `scale_init`.

use serde::{Deserialize, Serialize};

use crate::config::LedgerConfig;
use crate::contract::RevenueLedger;
use crate::snapshot::{HolderBalance, LedgerSnapshot};
use crate::store::HolderStore;
use crate::tally::StakeTally;
use crate::{check_genesis_stake, check_revenue, Result};

/// Per-holder state of the accumulator ledger.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ScalableRecord {
    /// Current stake.
    pub stake: f64,
    /// Revenue realized as of the last settlement.
    pub accrued_revenue: f64,
    /// Global `index` at the last settlement.
    pub snapshot_index: f64,
    /// Global `scale_factor` at the last settlement.
    pub snapshot_scale_factor: f64,
    /// Global `total_stake` at the last settlement.
    pub snapshot_total_stake: f64,
}

impl ScalableRecord {
    /// Revenue earned since the last settlement at the given accumulator
    /// value.
    fn pending(&self, index: f64) -> f64 {
        if self.stake == 0.0 {
            return 0.0;
        }
        let divisor = self.snapshot_scale_factor * self.snapshot_total_stake;
        if divisor <= 0.0 {
            return 0.0;
        }
        ((index - self.snapshot_index) * self.stake / divisor).max(0.0)
    }
}

/// Ledger with O(1) revenue injection.
#[derive(Debug, Clone)]
pub struct ScalableLedger {
    config: LedgerConfig,
    stakes: StakeTally,
    index: f64,
    scale_factor: f64,
    holders: HolderStore<ScalableRecord>,
}

impl Default for ScalableLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl ScalableLedger {
    /// Create an empty ledger with the default accumulator constants.
    pub fn new() -> Self {
        Self::from_valid_config(LedgerConfig::default())
    }

    /// Create an empty ledger with custom accumulator constants.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::InvalidArgument`](crate::LedgerError::InvalidArgument)
    ///   if the config fails validation
    pub fn with_config(config: LedgerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::from_valid_config(config))
    }

    fn from_valid_config(config: LedgerConfig) -> Self {
        Self {
            config,
            stakes: StakeTally::default(),
            index: config.index_init,
            scale_factor: config.scale_init,
            holders: HolderStore::new(),
        }
    }

    /// Create a ledger whose holders start with the given stakes.
    ///
    /// Repeated addresses accumulate. All genesis holders share the
    /// post-genesis snapshot, so the first injection is split over all of
    /// them.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::InvalidArgument`](crate::LedgerError::InvalidArgument)
    ///   if any address is empty or any stake is not strictly positive and
    ///   finite
    /// - [`LedgerError::Overflow`](crate::LedgerError::Overflow) if the total
    ///   stake is not finite
    pub fn from_stakes<I, A>(stakes: I) -> Result<Self>
    where
        I: IntoIterator<Item = (A, f64)>,
        A: AsRef<str>,
    {
        Self::from_stakes_with_config(stakes, LedgerConfig::default())
    }

    /// [`ScalableLedger::from_stakes`] with custom accumulator constants.
    pub fn from_stakes_with_config<I, A>(stakes: I, config: LedgerConfig) -> Result<Self>
    where
        I: IntoIterator<Item = (A, f64)>,
        A: AsRef<str>,
    {
        let mut ledger = Self::with_config(config)?;
        for (address, stake) in stakes {
            let address = address.as_ref();
            check_genesis_stake(address, stake)?;
            ledger.apply_stake_change(address, stake)?;
        }
        tracing::debug!(
            holders = ledger.holders.len(),
            total_stake = ledger.stakes.total(),
            scale_factor = ledger.scale_factor,
            "scalable ledger: genesis loaded"
        );
        Ok(ledger)
    }

    /// Current accumulator value.
    pub fn index(&self) -> f64 {
        self.index
    }

    /// Current scale factor.
    pub fn scale_factor(&self) -> f64 {
        self.scale_factor
    }

    /// Accumulator constants in use.
    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Borrow the holder store.
    pub fn holders(&self) -> &HolderStore<ScalableRecord> {
        &self.holders
    }

    /// Scale factor for a ledger whose stake is described by `stakes`.
    fn calibrated_scale(&self, stakes: &StakeTally) -> f64 {
        if stakes.staked_holders() == 0 {
            self.config.scale_init
        } else {
            self.config.scale_init / stakes.total()
        }
    }

    fn apply_stake_change(&mut self, address: &str, delta: f64) -> Result<()> {
        let mut holder = self.holders.get_or(address, || ScalableRecord {
            snapshot_index: self.index,
            snapshot_scale_factor: self.scale_factor,
            snapshot_total_stake: self.stakes.total(),
            ..ScalableRecord::default()
        });
        let change = self.stakes.plan(address, holder.stake, delta)?;
        let new_stake = change.new_stake;
        let new_total = change.tally.total();

        // Settle under the old stake weight.
        let fresh = holder.pending(self.index);
        holder.accrued_revenue += fresh;
        if fresh > 0.0 {
            tracing::debug!(
                address,
                settled = fresh,
                accrued = holder.accrued_revenue,
                "scalable ledger: holder settled"
            );
        }

        let new_scale = self.calibrated_scale(&change.tally);
        if new_scale != self.scale_factor {
            tracing::debug!(
                old = self.scale_factor,
                new = new_scale,
                total_stake = new_total,
                "scalable ledger: scale factor recalibrated"
            );
        }
        self.scale_factor = new_scale;
        self.stakes = change.tally;

        holder.stake = new_stake;
        holder.snapshot_index = self.index;
        holder.snapshot_scale_factor = self.scale_factor;
        holder.snapshot_total_stake = new_total;
        self.holders.upsert(address, holder);

        tracing::trace!(
            address,
            delta,
            stake = new_stake,
            total_stake = new_total,
            "scalable ledger: stake changed"
        );
        Ok(())
    }

    fn accumulate(&mut self, amount: f64) -> Result<()> {
        check_revenue(amount)?;
        self.index += self.scale_factor * amount;
        tracing::trace!(amount, index = self.index, "scalable ledger: revenue accumulated");
        Ok(())
    }
}

impl RevenueLedger for ScalableLedger {
    fn change_stake(&mut self, address: &str, delta: f64) -> Result<()> {
        self.apply_stake_change(address, delta).map_err(|err| {
            tracing::warn!(address, delta, %err, "scalable ledger: stake change rejected");
            err
        })
    }

    /// Fold `amount` into the accumulator without visiting any holder.
    ///
    /// Revenue injected while the total stake is zero is accepted and owed
    /// to nobody.
    fn add_revenue(&mut self, amount: f64) -> Result<()> {
        self.accumulate(amount).map_err(|err| {
            tracing::warn!(amount, %err, "scalable ledger: revenue rejected");
            err
        })
    }

    /// Revenue realized at the holder's last settlement. Revenue injected
    /// since then is only visible through
    /// [`projected_accrued`](RevenueLedger::projected_accrued).
    fn query_accrued(&self, address: &str) -> f64 {
        self.holders
            .get(address)
            .map_or(0.0, |holder| holder.accrued_revenue)
    }

    fn projected_accrued(&self, address: &str) -> f64 {
        self.holders
            .get(address)
            .map_or(0.0, |holder| holder.accrued_revenue + holder.pending(self.index))
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
