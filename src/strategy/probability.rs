//! Outcome model: the projected stat is treated as normally distributed
//! around the projection mean with the projection spread.

use statrs::distribution::{ContinuousCDF, Normal};

use crate::types::Side;

/// Probability that the wagered side lands.
///
/// With a positive spread this is `1 - Φ((line - mean) / sd)` for the over
/// and `Φ((line - mean) / sd)` for the under. A zero, negative or NaN spread
/// falls back to a straight comparison: 1.0 if the mean clears the line,
/// 0.0 if it falls short, 0.5 on a tie. Returns `None` when the mean or
/// line is not a number.
pub fn side_probability(side: Side, mean: f64, sd: f64, line: f64) -> Option<f64> {
    if mean.is_nan() || line.is_nan() {
        return None;
    }

    if sd.is_nan() || sd <= 0.0 {
        let clears = match side {
            Side::Over => mean.partial_cmp(&line)?,
            Side::Under => line.partial_cmp(&mean)?,
        };
        return Some(match clears {
            std::cmp::Ordering::Greater => 1.0,
            std::cmp::Ordering::Less => 0.0,
            std::cmp::Ordering::Equal => 0.5,
        });
    }

    let below = Normal::standard().cdf((line - mean) / sd);
    let prob = match side {
        Side::Over => 1.0 - below,
        Side::Under => below,
    };
    Some(prob.clamp(0.0, 1.0))
}

/// Standardised distance from the line to the mean, signed so that a
/// positive value favours the wagered side. Zero when the spread is not
/// positive.
pub fn z_score(side: Side, mean: f64, sd: f64, line: f64) -> f64 {
    if sd.is_nan() || sd <= 0.0 {
        return 0.0;
    }
    let z = (mean - line) / sd;
    match side {
        Side::Over => z,
        Side::Under => -z,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_over_under_sum_to_one() {
        let cases = [
            (300.0, 12.0, 285.5),
            (4.5, 1.3, 5.5),
            (0.4, 0.6, 0.5),
            (60.0, 25.0, 59.5),
            (1.0, 1e-6, 1.0),
        ];
        for (mean, sd, line) in cases {
            let over = side_probability(Side::Over, mean, sd, line).unwrap();
            let under = side_probability(Side::Under, mean, sd, line).unwrap();
            assert!((over + under - 1.0).abs() < 1e-9, "{mean} {sd} {line}");
        }
    }

    #[test]
    fn test_normal_model_value() {
        // z = (285.5 - 300) / 12 = -1.2083, 1 - Φ(z) ≈ 0.8865
        let p = side_probability(Side::Over, 300.0, 12.0, 285.5).unwrap();
        assert!((p - 0.8865).abs() < 1e-3, "p = {p}");
    }

    #[test]
    fn test_line_at_mean_is_even() {
        let p = side_probability(Side::Over, 50.5, 10.0, 50.5).unwrap();
        assert!((p - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_degenerate_spread_is_deterministic() {
        for sd in [0.0, -3.0, f64::NAN] {
            assert_eq!(side_probability(Side::Over, 10.0, sd, 9.5), Some(1.0));
            assert_eq!(side_probability(Side::Under, 10.0, sd, 9.5), Some(0.0));
            assert_eq!(side_probability(Side::Over, 9.0, sd, 9.5), Some(0.0));
            assert_eq!(side_probability(Side::Under, 9.0, sd, 9.5), Some(1.0));
            assert_eq!(side_probability(Side::Over, 9.5, sd, 9.5), Some(0.5));
            assert_eq!(side_probability(Side::Under, 9.5, sd, 9.5), Some(0.5));
        }
    }

    #[test]
    fn test_undefined_inputs() {
        assert_eq!(side_probability(Side::Over, f64::NAN, 1.0, 9.5), None);
        assert_eq!(side_probability(Side::Over, 10.0, 1.0, f64::NAN), None);
        assert_eq!(side_probability(Side::Under, f64::NAN, 0.0, 9.5), None);
    }

    #[test]
    fn test_z_score_sign_favours_side() {
        assert!((z_score(Side::Over, 300.0, 12.0, 285.5) - 1.208_333).abs() < 1e-5);
        assert!((z_score(Side::Under, 300.0, 12.0, 285.5) + 1.208_333).abs() < 1e-5);
        assert_eq!(z_score(Side::Over, 300.0, 0.0, 285.5), 0.0);
        assert_eq!(z_score(Side::Over, 300.0, f64::NAN, 285.5), 0.0);
    }
}
