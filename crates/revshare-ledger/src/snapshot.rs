//! Serializable read-only view of a ledger.

use serde::{Deserialize, Serialize};

/// One holder's position at snapshot time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HolderBalance {
    /// Holder address.
    pub address: String,
    /// Current stake.
    pub stake: f64,
    /// Realized revenue as reported by `query_accrued`.
    pub accrued: f64,
}

/// Aggregate state plus every holder, in creation order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    /// Sum of all holder stakes.
    pub total_stake: f64,
    /// Holders in creation order.
    pub holders: Vec<HolderBalance>,
}

impl LedgerSnapshot {
    /// Sum of every holder's stake, recomputed from the holder list.
    pub fn stake_sum(&self) -> f64 {
        self.holders.iter().map(|h| h.stake).sum()
    }

    /// Sum of every holder's realized revenue.
    pub fn accrued_sum(&self) -> f64 {
        self.holders.iter().map(|h| h.accrued).sum()
    }

    /// Look up a holder by address.
    pub fn holder(&self, address: &str) -> Option<&HolderBalance> {
        self.holders.iter().find(|h| h.address == address)
    }
}
