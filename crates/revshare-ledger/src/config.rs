//! Accumulator calibration for [`ScalableLedger`](crate::ScalableLedger).
//!
//! The accumulator starts at [`INDEX_INIT`] and revenue is folded into it
//! scaled so that `scale_factor * total_stake == scale_init` while anyone
//! holds stake. Both constants only shift and scale the accumulator; they do
//! not change settled balances beyond floating-point rounding.

use serde::{Deserialize, Serialize};

use crate::{LedgerError, Result};

/// Initial value of the global accumulator.
pub const INDEX_INIT: f64 = 1_000_000.0;

/// Scale factor used while total stake is zero, and the invariant product
/// `scale_factor * total_stake` while it is positive.
pub const SCALE_INIT: f64 = 10_000.0;

/// Accumulator constants for a scalable ledger.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Starting value of the accumulator.
    #[serde(default = "default_index_init")]
    pub index_init: f64,
    /// Scale factor calibration constant.
    #[serde(default = "default_scale_init")]
    pub scale_init: f64,
}

fn default_index_init() -> f64 {
    INDEX_INIT
}

fn default_scale_init() -> f64 {
    SCALE_INIT
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            index_init: INDEX_INIT,
            scale_init: SCALE_INIT,
        }
    }
}

impl LedgerConfig {
    /// Check that both constants are usable.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::InvalidArgument`] if `index_init` is negative or
    ///   non-finite, or `scale_init` is not strictly positive and finite
    pub fn validate(&self) -> Result<()> {
        if !(self.index_init.is_finite() && self.index_init >= 0.0) {
            return Err(LedgerError::InvalidArgument(format!(
                "index_init must be finite and non-negative, got {}",
                self.index_init
            )));
        }
        if !(self.scale_init.is_finite() && self.scale_init > 0.0) {
            return Err(LedgerError::InvalidArgument(format!(
                "scale_init must be finite and positive, got {}",
                self.scale_init
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LedgerConfig::default();
        assert_eq!(config.index_init, 1_000_000.0);
        assert_eq!(config.scale_init, 10_000.0);
        config.validate().expect("defaults are valid");
    }

    #[test]
    fn test_validate_rejects_bad_scale() {
        for scale_init in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let config = LedgerConfig {
                scale_init,
                ..LedgerConfig::default()
            };
            assert!(config.validate().is_err(), "scale_init {scale_init}");
        }
    }

    #[test]
    fn test_validate_rejects_bad_index() {
        let config = LedgerConfig {
            index_init: f64::NAN,
            ..LedgerConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_accepts_zero_index() {
        let zero = LedgerConfig {
            index_init: 0.0,
            ..LedgerConfig::default()
        };
        assert!(zero.validate().is_ok());
        let negative = LedgerConfig {
            index_init: -1.0,
            ..LedgerConfig::default()
        };
        assert!(negative.validate().is_err());
    }

    #[test]
    fn test_deserialize_partial() {
        let config: LedgerConfig =
            serde_json::from_str(r#"{"scale_init": 1.0}"#).expect("parse");
        assert_eq!(config.index_init, INDEX_INIT);
        assert_eq!(config.scale_init, 1.0);
    }
}
