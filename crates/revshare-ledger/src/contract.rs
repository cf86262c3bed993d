//! The contract shared by both ledger implementations.

use crate::snapshot::LedgerSnapshot;
use crate::Result;

/// A single-writer revenue ledger.
///
/// Operations are synchronous and all-or-nothing: an `Err` return means no
/// state changed. Callers needing shared access wrap the ledger in a mutex.
pub trait RevenueLedger {
    /// Add `delta` (positive or negative) to the stake of `address`,
    /// creating the holder on first reference.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::InvalidArgument`](crate::LedgerError::InvalidArgument)
    ///   if `delta` is zero or `address` is empty
    /// - [`LedgerError::Overflow`](crate::LedgerError::Overflow) if the total
    ///   stake would become negative or non-finite
    /// - [`LedgerError::Underflow`](crate::LedgerError::Underflow) if the
    ///   holder's stake would become negative
    fn change_stake(&mut self, address: &str, delta: f64) -> Result<()>;

    /// Distribute `amount` over all holders in proportion to their stake.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::InvalidArgument`](crate::LedgerError::InvalidArgument)
    ///   if `amount` is not strictly positive and finite
    fn add_revenue(&mut self, amount: f64) -> Result<()>;

    /// Realized revenue of `address`, or `0.0` for an unknown address.
    fn query_accrued(&self, address: &str) -> f64;

    /// Realized revenue plus anything the next settlement of `address` would
    /// add, computed without mutating the ledger.
    ///
    /// Ledgers that settle eagerly have nothing pending.
    fn projected_accrued(&self, address: &str) -> f64 {
        self.query_accrued(address)
    }

    /// Current stake of `address`, or `0.0` for an unknown address.
    fn stake_of(&self, address: &str) -> f64;

    /// Sum of all holder stakes.
    fn total_stake(&self) -> f64;

    /// Number of holders ever created.
    fn holder_count(&self) -> usize;

    /// Holder records read or written by operations so far.
    fn record_touches(&self) -> u64;

    /// Copy out the aggregate state and every holder.
    fn snapshot(&self) -> LedgerSnapshot;
}
