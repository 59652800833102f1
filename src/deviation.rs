//! Chi-square-like score of a bin histogram against a fixed normal shape.
//!
//! The reference curve is centred on the middle bin with `sigma = n / 4`,
//! whatever the row count. It is a display metric, not a calibrated test:
//! there are no degrees of freedom or p-values here.

use galton_common::StatisticError;
use std::f64::consts::PI;
use std::fmt;

/// `sigma = bin_count / SIGMA_DIVISOR`.
pub const SIGMA_DIVISOR: f64 = 4.0;

/// Normal density evaluated at each bin index `0..n`, before normalisation.
///
/// With `sigma = n / 4` the outermost bins sit two sigma from the mean, so no
/// weight underflows to zero.
pub fn normal_weights(n: usize) -> Vec<f64> {
    let mean = (n as f64 - 1.0) / 2.0;
    let sigma = n as f64 / SIGMA_DIVISOR;
    let norm = 1.0 / (sigma * (2.0 * PI).sqrt());
    (0..n)
        .map(|i| {
            let d = i as f64 - mean;
            norm * (-(d * d) / (2.0 * sigma * sigma)).exp()
        })
        .collect()
}

/// Expected per-bin counts for `total` particles; sums to `total` up to
/// rounding.
pub fn expected_counts(n: usize, total: u64) -> Vec<f64> {
    let weights = normal_weights(n);
    let sum: f64 = weights.iter().sum();
    weights.into_iter().map(|w| total as f64 * w / sum).collect()
}

/// Deviation score, kept at full precision and reported to 2 decimals.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Deviation {
    raw: f64,
}

impl Deviation {
    /// Unrounded score.
    pub fn raw(&self) -> f64 {
        self.raw
    }

    /// Score rounded to 2 decimal digits.
    pub fn value(&self) -> f64 {
        (self.raw * 100.0).round() / 100.0
    }
}

impl fmt::Display for Deviation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.raw)
    }
}

/// Scores `counts` as `sum((observed - expected)^2 / expected)`.
///
/// An empty board (no particles collected yet) scores 0.
pub fn deviation(counts: &[u32]) -> Result<Deviation, StatisticError> {
    if counts.is_empty() {
        return Err(StatisticError::EmptyHistogram);
    }
    let total: u64 = counts.iter().map(|&c| u64::from(c)).sum();
    if total == 0 {
        return Ok(Deviation { raw: 0.0 });
    }

    let expected = expected_counts(counts.len(), total);
    let raw = counts
        .iter()
        .zip(&expected)
        .map(|(&observed, &e)| {
            debug_assert!(e > 0.0, "expected count must be positive");
            let diff = f64::from(observed) - e;
            diff * diff / e
        })
        .sum();
    Ok(Deviation { raw })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64, tol: f64) -> bool {
        (a - b).abs() <= tol
    }

    #[test]
    fn empty_board_scores_zero() {
        let d = deviation(&[0; 9]).unwrap();
        assert_eq!(d.value(), 0.0);
        assert_eq!(d.to_string(), "0.00");
    }

    #[test]
    fn no_bins_is_an_error() {
        assert_eq!(deviation(&[]), Err(StatisticError::EmptyHistogram));
    }

    #[test]
    fn weights_peak_in_the_middle_and_are_symmetric() {
        let w = normal_weights(9);
        assert_eq!(w.len(), 9);
        let peak = w.iter().cloned().fold(f64::MIN, f64::max);
        assert_eq!(w[4], peak);
        for i in 0..9 {
            assert!(approx_eq(w[i], w[8 - i], 1e-15));
            assert!(w[i] > 0.0);
        }
    }

    #[test]
    fn expected_counts_sum_to_total() {
        for n in 1..=30 {
            let expected = expected_counts(n, 200);
            let sum: f64 = expected.iter().sum();
            assert!(approx_eq(sum, 200.0, 1e-9), "n={n}: {sum}");
        }
    }

    #[test]
    fn three_bin_scenario_is_small_and_positive() {
        let counts = [50, 100, 50];
        let d = deviation(&counts).unwrap();

        // sigma = 0.75: outer weight ratio exp(-1 / (2 * 0.5625))
        let ratio = (-1.0f64 / 1.125).exp();
        let outer = 200.0 * ratio / (1.0 + 2.0 * ratio);
        let middle = 200.0 / (1.0 + 2.0 * ratio);
        let by_hand = 2.0 * (50.0 - outer).powi(2) / outer + (100.0 - middle).powi(2) / middle;

        assert!(approx_eq(d.raw(), by_hand, 1e-9));
        assert!(d.value() > 0.0);
        assert!(d.value() < 5.0);
        assert_eq!(d.to_string(), format!("{:.2}", by_hand));
    }

    #[test]
    fn exact_shape_scores_zero_at_any_total() {
        // A single bin always matches its own expectation.
        for total in [1u32, 7, 200, 10_000] {
            assert_eq!(deviation(&[total]).unwrap().value(), 0.0);
        }
        // Scaling a symmetric histogram keeps it symmetric but not exact.
        let d = deviation(&[1, 0, 1]).unwrap();
        assert!(d.raw() > 0.0);
    }

    #[test]
    fn expected_counts_scale_with_total() {
        let unit = expected_counts(9, 1);
        for total in [9u64, 200, 10_000] {
            let expected = expected_counts(9, total);
            let sum: f64 = expected.iter().sum();
            assert!((sum - total as f64).abs() < 1e-9 * total as f64);
            for (e, u) in expected.iter().zip(&unit) {
                assert!((e - u * total as f64).abs() < 1e-9 * total as f64);
            }
            // Symmetric about the middle bin.
            for i in 0..4 {
                assert!((expected[i] - expected[8 - i]).abs() < 1e-9 * total as f64);
            }
        }
    }

    #[test]
    fn skew_scores_worse_than_balance() {
        let balanced = deviation(&[2, 8, 16, 24, 28, 24, 16, 8, 2]).unwrap();
        let skewed = deviation(&[28, 24, 16, 8, 2, 2, 8, 16, 24]).unwrap();
        assert!(skewed.raw() > balanced.raw());
    }

    #[test]
    fn rounding_is_two_decimals() {
        let d = Deviation { raw: 1.23456 };
        assert_eq!(d.value(), 1.23);
        assert_eq!(d.to_string(), "1.23");
        let d = Deviation { raw: 0.005001 };
        assert_eq!(d.value(), 0.01);
    }
}
