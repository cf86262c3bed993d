//! Total stake bookkeeping shared by both ledgers.
//!
//! The total is kept as a compensated (Neumaier) sum of the holders' stored
//! stakes, so it tracks `Σ holder.stake` to within a few ulps instead of
//! drifting with every fractional change. The tally also counts holders with
//! positive stake; when that count reaches zero the total is exactly `0.0`.
//!
//! A holder's remaining stake within [`ZERO_TOLERANCE_ULPS`] ulps of the
//! operands is treated as zero, so withdrawing "everything" leaves nothing.

use crate::{LedgerError, Result};

/// Remainders within this many ulps of `max(|stake|, |delta|)` snap to zero.
pub const ZERO_TOLERANCE_ULPS: f64 = 4.0;

/// Running total of holder stakes.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub(crate) struct StakeTally {
    sum: f64,
    compensation: f64,
    staked_holders: usize,
}

/// Validated outcome of a stake change, not yet committed.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct StakeChange {
    /// The holder's stake after the change.
    pub new_stake: f64,
    /// The tally after the change.
    pub tally: StakeTally,
}

fn snap_to_zero(value: f64, magnitude: f64) -> f64 {
    if value.abs() <= ZERO_TOLERANCE_ULPS * f64::EPSILON * magnitude {
        0.0
    } else {
        value
    }
}

impl StakeTally {
    /// Current total stake.
    pub fn total(&self) -> f64 {
        self.sum + self.compensation
    }

    /// Number of holders whose stake is positive.
    pub fn staked_holders(&self) -> usize {
        self.staked_holders
    }

    fn add(&mut self, x: f64) {
        let t = self.sum + x;
        if self.sum.abs() >= x.abs() {
            self.compensation += (self.sum - t) + x;
        } else {
            self.compensation += (x - t) + self.sum;
        }
        self.sum = t;
    }

    /// Validate moving one holder from `old_stake` by `delta`.
    ///
    /// Checks run in a fixed order: empty address and zero delta, then the
    /// total stake, then the holder's stake.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::InvalidArgument`] if `address` is empty or `delta`
    ///   is zero
    /// - [`LedgerError::Overflow`] if the total would become negative or
    ///   non-finite
    /// - [`LedgerError::Underflow`] if the holder's stake would become
    ///   negative
    pub fn plan(&self, address: &str, old_stake: f64, delta: f64) -> Result<StakeChange> {
        if address.is_empty() {
            return Err(LedgerError::InvalidArgument("address is empty".to_string()));
        }
        if delta == 0.0 {
            return Err(LedgerError::InvalidArgument(
                "stake delta must be non-zero".to_string(),
            ));
        }
        let total = self.total();
        let overflow = LedgerError::Overflow { total, delta };
        if !(total + delta).is_finite() {
            return Err(overflow);
        }

        let new_stake = snap_to_zero(old_stake + delta, old_stake.abs().max(delta.abs()));

        let mut tally = *self;
        if old_stake > 0.0 {
            tally.staked_holders -= 1;
        }
        if new_stake > 0.0 {
            tally.staked_holders += 1;
        }
        if new_stake >= 0.0 && tally.staked_holders == 0 {
            tally = StakeTally::default();
        } else {
            tally.add(-old_stake);
            tally.add(new_stake);
            let new_total = snap_to_zero(tally.total(), total.abs().max(delta.abs()));
            if !new_total.is_finite() || new_total < 0.0 {
                return Err(overflow);
            }
        }

        if new_stake < 0.0 {
            return Err(LedgerError::Underflow {
                stake: old_stake,
                delta,
            });
        }
        Ok(StakeChange { new_stake, tally })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    fn apply(tally: &mut StakeTally, old_stake: f64, delta: f64) -> f64 {
        let change = tally.plan("a", old_stake, delta).expect("plan");
        *tally = change.tally;
        change.new_stake
    }

    #[test]
    fn test_plan_validation_order() {
        let mut tally = StakeTally::default();
        apply(&mut tally, 0.0, 10.0);

        let kind = |r: Result<StakeChange>| r.map(|_| ()).map_err(|e| e.kind());
        assert_eq!(kind(tally.plan("", 1.0, 5.0)), Err(ErrorKind::InvalidArgument));
        assert_eq!(kind(tally.plan("a", 10.0, 0.0)), Err(ErrorKind::InvalidArgument));
        assert_eq!(kind(tally.plan("a", 10.0, -11.0)), Err(ErrorKind::Overflow));
        assert_eq!(kind(tally.plan("a", 10.0, f64::INFINITY)), Err(ErrorKind::Overflow));
        assert_eq!(kind(tally.plan("a", 10.0, f64::NAN)), Err(ErrorKind::Overflow));
        assert_eq!(kind(tally.plan("b", 0.0, -1.0)), Err(ErrorKind::Underflow));
        assert_eq!(kind(tally.plan("a", 10.0, 5.0)), Ok(()));
    }

    #[test]
    fn test_empty_pool_with_negative_delta_is_overflow() {
        let tally = StakeTally::default();
        let err = tally.plan("a", 0.0, -1.0).expect_err("negative total");
        assert_eq!(err.kind(), ErrorKind::Overflow);
    }

    #[test]
    fn test_fractional_drain_resets_total_exactly() {
        let mut tally = StakeTally::default();
        let a = apply(&mut tally, 0.0, 0.1);
        let b = apply(&mut tally, 0.0, 0.2);
        let a = apply(&mut tally, a, -0.1);
        assert_eq!(a, 0.0);
        assert_eq!(tally.staked_holders(), 1);
        let b = apply(&mut tally, b, -0.2);
        assert_eq!(b, 0.0);
        assert_eq!(tally.staked_holders(), 0);
        assert_eq!(tally.total(), 0.0);
    }

    #[test]
    fn test_last_holder_can_withdraw_full_stake() {
        let mut tally = StakeTally::default();
        let a = apply(&mut tally, 0.0, 0.3);
        let b = apply(&mut tally, 0.0, 0.6);
        apply(&mut tally, b, -0.6);
        assert!((tally.total() - 0.3).abs() < 1e-15);
        assert_eq!(apply(&mut tally, a, -0.3), 0.0);
        assert_eq!(tally.total(), 0.0);
    }

    #[test]
    fn test_rounding_remainder_snaps_to_zero() {
        let mut tally = StakeTally::default();
        let a = apply(&mut tally, 0.0, 0.1);
        let a = apply(&mut tally, a, 0.2);
        assert_eq!(a, 0.1 + 0.2);
        assert_eq!(apply(&mut tally, a, -0.3), 0.0);
        assert_eq!(tally.total(), 0.0);
    }

    #[test]
    fn test_compensated_total_tracks_stakes() {
        let mut tally = StakeTally::default();
        let mut stakes = [0.0f64; 3];
        for i in 0..3_000 {
            let slot = i % 3;
            let delta = if i % 7 == 0 && stakes[slot] > 0.0 {
                -stakes[slot] / 3.0
            } else {
                0.1 * (1 + i % 5) as f64
            };
            stakes[slot] = apply(&mut tally, stakes[slot], delta);
        }
        let sum: f64 = stakes.iter().sum();
        assert!((tally.total() - sum).abs() <= 1e-12 * sum);
        assert_eq!(tally.staked_holders(), 3);
    }
}
