//! # revshare-ledger
//!
//! Proportional revenue distribution over a dynamic set of stake-holders.
//!
//! Every holder is identified by an address and carries a mutable stake.
//! Revenue injected into a ledger is owed to the holders in proportion to
//! their stake at the moment of injection. Two ledgers implement the same
//! [`RevenueLedger`] contract:
//!
//! - [`NaiveLedger`] walks every holder on each injection, O(n).
//! - [`ScalableLedger`] keeps a single reward-per-unit-stake accumulator and
//!   settles a holder only when its stake changes, so injection is O(1).
//!
//! ## Modules
//!
//! - [`store`] - Arena-backed address to holder record map
//! - [`naive`] - Eager distribution ledger
//! - [`scalable`] - Accumulator ledger with deferred settlement
//! - [`contract`] - The shared ledger contract
//! - [`config`] - Accumulator calibration constants
//! - [`snapshot`] - Serializable read-only ledger state

pub mod config;
pub mod contract;
pub mod naive;
pub mod scalable;
pub mod snapshot;
pub mod store;
mod tally;

pub use config::LedgerConfig;
pub use contract::RevenueLedger;
pub use naive::NaiveLedger;
pub use scalable::ScalableLedger;
pub use snapshot::{HolderBalance, LedgerSnapshot};
pub use store::{HolderId, HolderStore};

/// Category of a rejected ledger operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Zero or negative amount, empty address, bad configuration.
    InvalidArgument,
    /// A stake decrease would take a holder below zero.
    Underflow,
    /// Total stake would become negative or non-finite.
    Overflow,
    /// Revenue injected while nobody holds stake.
    DegenerateDistribution,
}

/// Error types for ledger operations.
///
/// A ledger that returns any of these has not been mutated and remains
/// usable.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LedgerError {
    /// An argument is outside its accepted domain.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The holder does not have enough stake to remove `delta`.
    #[error("stake underflow: holder stake {stake}, delta {delta}")]
    Underflow {
        /// The holder's stake before the change.
        stake: f64,
        /// The requested change.
        delta: f64,
    },

    /// The total stake would leave the range `[0, +inf)`.
    #[error("total stake overflow: total {total}, delta {delta}")]
    Overflow {
        /// The total stake before the change.
        total: f64,
        /// The requested change.
        delta: f64,
    },

    /// Revenue cannot be split while the total stake is zero.
    #[error("cannot distribute {amount} over zero total stake")]
    DegenerateDistribution {
        /// The rejected revenue amount.
        amount: f64,
    },
}

impl LedgerError {
    /// Return the category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Self::Underflow { .. } => ErrorKind::Underflow,
            Self::Overflow { .. } => ErrorKind::Overflow,
            Self::DegenerateDistribution { .. } => ErrorKind::DegenerateDistribution,
        }
    }
}

/// Convenience result type for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;

/// Reject revenue amounts that are not strictly positive and finite.
pub(crate) fn check_revenue(amount: f64) -> Result<()> {
    if !(amount > 0.0 && amount.is_finite()) {
        return Err(LedgerError::InvalidArgument(format!(
            "revenue amount must be positive and finite, got {amount}"
        )));
    }
    Ok(())
}

/// Validate a genesis stake entry.
pub(crate) fn check_genesis_stake(address: &str, stake: f64) -> Result<()> {
    if address.is_empty() {
        return Err(LedgerError::InvalidArgument(
            "genesis address is empty".to_string(),
        ));
    }
    if !(stake > 0.0 && stake.is_finite()) {
        return Err(LedgerError::InvalidArgument(format!(
            "genesis stake for {address} must be positive and finite, got {stake}"
        )));
    }
    Ok(())
}
