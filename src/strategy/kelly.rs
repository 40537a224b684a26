//! Kelly criterion stake sizing.
//!
//! Fractional Kelly on a fixed bankroll-unit basis, clamped to a unit band
//! whenever there is any stake at all.

use anyhow::{ensure, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Bankroll and sizing settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BankrollConfig {
    /// Bankroll expressed in betting units.
    pub units: f64,
    /// Fractional Kelly multiplier (0.5 = half-Kelly).
    pub kelly_multiplier: f64,
    /// Smallest stake recommended when Kelly is positive.
    pub min_units: f64,
    /// Largest stake ever recommended.
    pub max_units: f64,
}

impl Default for BankrollConfig {
    fn default() -> Self {
        Self {
            units: 100.0,
            kelly_multiplier: 0.5,
            min_units: 0.2,
            max_units: 1.5,
        }
    }
}

impl BankrollConfig {
    /// Reject settings the sizer cannot apply.
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.units.is_finite() && self.units > 0.0,
            "bankroll.units must be a positive number, got {}",
            self.units
        );
        ensure!(
            self.kelly_multiplier > 0.0 && self.kelly_multiplier <= 1.0,
            "bankroll.kelly_multiplier must be in (0, 1], got {}",
            self.kelly_multiplier
        );
        ensure!(
            self.min_units.is_finite() && self.max_units.is_finite(),
            "bankroll.min_units and bankroll.max_units must be finite"
        );
        ensure!(
            0.0 <= self.min_units && self.min_units <= self.max_units,
            "bankroll unit band must satisfy 0 <= min_units <= max_units, got [{}, {}]",
            self.min_units,
            self.max_units
        );
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Kelly calculator
// ---------------------------------------------------------------------------

/// Sizing result for one quote.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stake {
    /// Full-Kelly fraction, floored at zero.
    pub kelly_raw: f64,
    /// After the fractional multiplier.
    pub kelly_fraction: f64,
    /// Recommended units after the band clamp.
    pub units: f64,
}

impl Stake {
    /// Scale the fraction and units together (injury caution).
    pub fn scaled(self, factor: f64) -> Self {
        Self {
            kelly_fraction: self.kelly_fraction * factor,
            units: self.units * factor,
            ..self
        }
    }
}

#[derive(Debug, Clone)]
pub struct KellyCalculator {
    config: BankrollConfig,
}

impl KellyCalculator {
    pub fn new(config: BankrollConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BankrollConfig {
        &self.config
    }

    /// Size a bet.
    ///
    /// Kelly formula: f* = (bp - q) / b
    /// where b is the payout multiple, p the win probability, q = 1 - p.
    pub fn size(&self, win_prob: f64, payout: f64) -> Stake {
        let kelly_raw = if payout > 0.0 {
            ((payout * win_prob - (1.0 - win_prob)) / payout).max(0.0)
        } else {
            0.0
        };
        let kelly_fraction = kelly_raw * self.config.kelly_multiplier;

        let units = if kelly_fraction > 0.0 {
            // max/min rather than clamp: an unvalidated band must not panic.
            (kelly_fraction * self.config.units)
                .max(self.config.min_units)
                .min(self.config.max_units)
        } else {
            debug!(win_prob, payout, "Non-positive Kelly, no stake");
            0.0
        };

        Stake {
            kelly_raw,
            kelly_fraction,
            units,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::odds::{expected_value, implied_probability, payout_multiple};

    fn make_calc() -> KellyCalculator {
        KellyCalculator::new(BankrollConfig::default())
    }

    #[test]
    fn test_positive_edge_clamps_to_max() {
        let payout = payout_multiple(-110).unwrap();
        let stake = make_calc().size(0.8865, payout);
        assert!((stake.kelly_raw - 0.7617).abs() < 1e-3, "raw {}", stake.kelly_raw);
        assert!((stake.kelly_fraction - stake.kelly_raw * 0.5).abs() < 1e-12);
        assert_eq!(stake.units, 1.5);
    }

    #[test]
    fn test_small_edge_clamps_to_min() {
        // Half-Kelly of ~0.2% of bankroll is below the 0.2 unit floor.
        let payout = payout_multiple(100).unwrap();
        let stake = make_calc().size(0.501, payout);
        assert!(stake.kelly_fraction > 0.0);
        assert_eq!(stake.units, 0.2);
    }

    #[test]
    fn test_mid_band_is_unclamped() {
        let payout = payout_multiple(100).unwrap();
        let stake = make_calc().size(0.51, payout);
        // raw = 0.02, half = 0.01, units = 1.0
        assert!((stake.units - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_kelly_zero_when_ev_not_positive() {
        let calc = make_calc();
        for price in [-300, -110, 100, 150, 400] {
            let payout = payout_multiple(price).unwrap();
            let fair = implied_probability(price).unwrap();
            for prob in [fair - 1e-6, fair - 0.05, 0.0] {
                assert!(expected_value(prob, payout) < 0.0);
                let stake = calc.size(prob, payout);
                assert_eq!(stake.kelly_raw, 0.0, "price {price} prob {prob}");
                assert_eq!(stake.units, 0.0);
            }
        }
    }

    #[test]
    fn test_kelly_never_negative() {
        let calc = make_calc();
        for prob in [0.0, 0.1, 0.3, 0.5, 0.7, 1.0] {
            for payout in [0.0, 0.25, 0.9091, 1.0, 3.0] {
                let stake = calc.size(prob, payout);
                assert!(stake.kelly_raw >= 0.0);
                assert!(stake.kelly_fraction >= 0.0);
                assert!(stake.units >= 0.0);
            }
        }
    }

    #[test]
    fn test_validate_accepts_defaults_and_rejects_bad_bands() {
        assert!(BankrollConfig::default().validate().is_ok());

        let inverted = BankrollConfig {
            min_units: 2.0,
            max_units: 1.0,
            ..BankrollConfig::default()
        };
        assert!(inverted.validate().is_err());

        for bad in [
            BankrollConfig { min_units: f64::NAN, ..BankrollConfig::default() },
            BankrollConfig { max_units: f64::INFINITY, ..BankrollConfig::default() },
            BankrollConfig { min_units: -0.1, ..BankrollConfig::default() },
            BankrollConfig { kelly_multiplier: 0.0, ..BankrollConfig::default() },
            BankrollConfig { kelly_multiplier: 1.5, ..BankrollConfig::default() },
            BankrollConfig { units: 0.0, ..BankrollConfig::default() },
        ] {
            assert!(bad.validate().is_err(), "{bad:?}");
        }
    }

    #[test]
    fn test_inverted_band_does_not_panic() {
        let calc = KellyCalculator::new(BankrollConfig {
            min_units: 2.0,
            max_units: 1.0,
            ..BankrollConfig::default()
        });
        let stake = calc.size(0.6, 1.0);
        assert_eq!(stake.units, 1.0);
    }

    #[test]
    fn test_scaled_halves_fraction_and_units() {
        let stake = make_calc().size(0.8865, payout_multiple(-110).unwrap());
        let half = stake.scaled(0.5);
        assert_eq!(half.kelly_raw, stake.kelly_raw);
        assert_eq!(half.kelly_fraction, stake.kelly_fraction * 0.5);
        assert_eq!(half.units, 0.75);
    }
}
