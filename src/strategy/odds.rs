//! American odds conversions.
//!
//! Positive prices quote the profit on a 100 stake; negative prices quote
//! the stake needed to profit 100. A price of zero is meaningless.

/// Break-even probability embedded in an American price.
pub fn implied_probability(price: i32) -> Option<f64> {
    let p = f64::from(price);
    match price {
        0 => None,
        x if x > 0 => Some(100.0 / (p + 100.0)),
        _ => Some(-p / (-p + 100.0)),
    }
}

/// Net profit per unit staked when the bet wins.
pub fn payout_multiple(price: i32) -> Option<f64> {
    let p = f64::from(price);
    match price {
        0 => None,
        x if x > 0 => Some(p / 100.0),
        _ => Some(100.0 / p.abs()),
    }
}

/// Fair American price for a probability, rounded to the nearest integer.
/// Even money is quoted as -100.
pub fn american_from_probability(prob: f64) -> Option<i32> {
    if !(prob > 0.0 && prob < 1.0) {
        return None;
    }
    let price = if prob >= 0.5 {
        -100.0 * prob / (1.0 - prob)
    } else {
        100.0 * (1.0 - prob) / prob
    };
    Some(price.round() as i32)
}

/// Expected profit per unit staked.
pub fn expected_value(prob: f64, payout: f64) -> f64 {
    prob * payout - (1.0 - prob)
}
