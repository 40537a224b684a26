//! Recommendation tiers from expected value and z-score.

use serde::{Deserialize, Serialize};

use crate::types::{Market, Tier};

/// EV and z-score cut points. Yardage markets use their own z pair; every
/// other market uses the reception pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TierThresholds {
    pub shortlist_ev: f64,
    pub recommend_ev: f64,
    pub z_yards: f64,
    pub z_yards_strong: f64,
    pub z_rec: f64,
    pub z_rec_strong: f64,
}

impl Default for TierThresholds {
    fn default() -> Self {
        Self {
            shortlist_ev: 0.03,
            recommend_ev: 0.05,
            z_yards: 0.40,
            z_yards_strong: 0.65,
            z_rec: 0.55,
            z_rec_strong: 0.80,
        }
    }
}

impl TierThresholds {
    /// (moderate, strong) z thresholds for a market.
    pub fn z_thresholds(&self, market: Market) -> (f64, f64) {
        if market.is_yardage() {
            (self.z_yards, self.z_yards_strong)
        } else {
            (self.z_rec, self.z_rec_strong)
        }
    }

    pub fn classify(&self, expected_value: f64, z_score: f64, market: Market) -> Tier {
        let (moderate, strong) = self.z_thresholds(market);
        let z = z_score.abs();
        if expected_value >= self.recommend_ev && z >= strong {
            Tier::Recommend
        } else if expected_value >= self.shortlist_ev && z >= moderate {
            Tier::Shortlist
        } else {
            Tier::Pass
        }
    }
}
